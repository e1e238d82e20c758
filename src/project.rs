//! Project folders: `project.json` plus a copy of the plan image.
//!
//! ```text
//! <projects root>/<name>/project.json
//! <projects root>/<name>/<image file>
//! ```
//!
//! Loading is lenient: unknown or malformed objects are dropped one by one
//! and a missing image only loses the background.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::scene::Scene;

pub const PROJECT_FILE: &str = "project.json";
pub const QUICKSAVE_DIR: &str = "quicksave";
const APP_DIR: &str = "Flaner";

#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid project file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No image is loaded")]
    NoImage,

    #[error("Invalid project name: {0:?}")]
    InvalidName(String),
}

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(Debug, Serialize, Deserialize)]
struct ProjectFile {
    #[serde(default)]
    image: String,
    #[serde(default)]
    objects: Vec<serde_json::Value>,
}

/// Outcome of a save. The metadata is written even if the image copy fails.
#[derive(Debug)]
pub struct SaveReport {
    pub project_file: PathBuf,
    pub image_path: PathBuf,
    pub image_error: Option<io::Error>,
}

#[derive(Debug)]
pub struct LoadedProject {
    pub scene: Scene,
    /// Co-located image, if it exists on disk.
    pub image_path: Option<PathBuf>,
    /// Objects dropped because they could not be read.
    pub skipped: usize,
}

// ── Projects root ───────────────────────────────────────────────────────────

/// OS-appropriate default: `Documents/Flaner/projects` on Windows,
/// `<data dir>/Flaner/projects` elsewhere.
pub fn default_projects_root() -> Option<PathBuf> {
    let base = if cfg!(windows) {
        dirs::document_dir()
    } else {
        dirs::data_dir()
    };
    base.map(|dir| dir.join(APP_DIR).join("projects"))
}

/// Resolve and create the projects root, falling back to `./projects`.
pub fn projects_root(override_dir: Option<&Path>) -> PathBuf {
    let preferred = override_dir
        .map(Path::to_path_buf)
        .or_else(default_projects_root);
    if let Some(dir) = preferred {
        match fs::create_dir_all(&dir) {
            Ok(()) => return dir,
            Err(e) => log::warn!("Cannot use projects folder {}: {}", dir.display(), e),
        }
    }
    let fallback = std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("projects");
    if let Err(e) = fs::create_dir_all(&fallback) {
        log::error!("Cannot create fallback projects folder {}: {}", fallback.display(), e);
    }
    fallback
}

/// Folder for a named project, rejecting names that would escape the root.
pub fn project_dir(root: &Path, name: &str) -> ProjectResult<PathBuf> {
    let name = name.trim();
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(root.join(name)),
        _ => Err(ProjectError::InvalidName(name.to_owned())),
    }
}

pub fn quicksave_dir(root: &Path) -> PathBuf {
    root.join(QUICKSAVE_DIR)
}

// ── Save / load ─────────────────────────────────────────────────────────────

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Write `scene` and a copy of `image` into `dir`.
pub fn save_project(dir: &Path, image: &Path, scene: &Scene) -> ProjectResult<SaveReport> {
    let image_name = image
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or(ProjectError::NoImage)?
        .to_owned();
    fs::create_dir_all(dir)?;

    let image_path = dir.join(&image_name);
    let image_error = if same_file(image, &image_path) {
        None
    } else {
        fs::copy(image, &image_path).err()
    };
    if let Some(e) = &image_error {
        log::error!("Failed to copy image {} into {}: {}", image.display(), dir.display(), e);
    }

    let file = ProjectFile {
        image: image_name,
        objects: scene.to_entities().iter().map(Entity::to_json).collect(),
    };
    let json = serde_json::to_string_pretty(&file)?;
    let project_file = dir.join(PROJECT_FILE);
    let temp_path = project_file.with_extension("json.tmp");
    fs::write(&temp_path, json)?;
    fs::rename(&temp_path, &project_file)?;
    log::info!("Saved project to {}", project_file.display());

    Ok(SaveReport {
        project_file,
        image_path,
        image_error,
    })
}

/// Decode `objects`, dropping the ones that fail. Returns the survivors and
/// the number dropped.
pub fn parse_entities(values: Vec<serde_json::Value>) -> (Vec<Entity>, usize) {
    let mut skipped = 0;
    let entities = values
        .into_iter()
        .filter_map(|value| match Entity::from_json(value) {
            Ok(entity) => Some(entity),
            Err(e) => {
                log::warn!("Skipping project object: {}", e);
                skipped += 1;
                None
            }
        })
        .collect();
    (entities, skipped)
}

pub fn load_project(dir: &Path) -> ProjectResult<LoadedProject> {
    let data = fs::read_to_string(dir.join(PROJECT_FILE))?;
    let file: ProjectFile = serde_json::from_str(&data)?;
    let (entities, skipped) = parse_entities(file.objects);

    let image_path = Some(file.image)
        .filter(|name| !name.is_empty())
        .map(|name| dir.join(name))
        .filter(|path| {
            let exists = path.is_file();
            if !exists {
                log::warn!("Project image {} is missing", path.display());
            }
            exists
        });

    log::info!(
        "Loaded project {} ({} objects, {} skipped)",
        dir.display(),
        entities.len(),
        skipped
    );
    Ok(LoadedProject {
        scene: Scene::from_entities(entities),
        image_path,
        skipped,
    })
}

/// Show `dir` in the system file browser.
pub fn open_in_file_browser(dir: &Path) -> io::Result<()> {
    let program = if cfg!(windows) {
        "explorer"
    } else if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    };
    std::process::Command::new(program).arg(dir).spawn().map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{MeasureLine, Point, Rectangle, Rgb, ScaleLine};
    use serde_json::json;
    use tempfile::TempDir;

    fn sample_scene() -> Scene {
        let mut scene = Scene::new();
        scene.set_scale(ScaleLine::new(Point::new(0.0, 0.0), Point::new(100.0, 0.0), 2.0, 2));
        scene.push(MeasureLine::new(Point::new(0.0, 0.0), Point::new(200.0, 0.0), Some(4.0), 2));
        scene.push(Rectangle::new(Point::new(1.0, 2.0), Point::new(30.0, 40.0), Rgb::new(9, 8, 7), 3));
        scene
    }

    fn write_image(dir: &Path) -> PathBuf {
        let path = dir.join("plan.png");
        fs::write(&path, b"not really a png").unwrap();
        path
    }

    #[test]
    fn save_then_load_restores_scene_and_image() {
        let src = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let image = write_image(src.path());
        let dir = project_dir(root.path(), "flat").unwrap();

        let report = save_project(&dir, &image, &sample_scene()).unwrap();
        assert!(report.image_error.is_none());
        assert!(report.image_path.is_file());

        let loaded = load_project(&dir).unwrap();
        assert_eq!(loaded.scene, sample_scene());
        assert_eq!(loaded.image_path, Some(dir.join("plan.png")));
        assert_eq!(loaded.skipped, 0);
    }

    #[test]
    fn saving_over_own_image_skips_copy() {
        let root = TempDir::new().unwrap();
        let dir = quicksave_dir(root.path());
        fs::create_dir_all(&dir).unwrap();
        let image = write_image(&dir);
        let report = save_project(&dir, &image, &Scene::new()).unwrap();
        assert!(report.image_error.is_none());
        assert_eq!(fs::read(&image).unwrap(), b"not really a png");
    }

    #[test]
    fn failed_image_copy_still_writes_metadata() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("p");
        let missing = root.path().join("gone.png");
        let report = save_project(&dir, &missing, &sample_scene()).unwrap();
        assert!(report.image_error.is_some());
        assert!(report.project_file.is_file());
    }

    #[test]
    fn unknown_objects_are_skipped() {
        let root = TempDir::new().unwrap();
        let file = json!({
            "image": "missing.png",
            "objects": [
                {"type": "hexagon", "p1": [0, 0], "p2": [1, 1]},
                {"type": "rect", "p1": [0, 0], "p2": [10, 5], "color": [1, 2, 3], "width": 2}
            ]
        });
        fs::write(root.path().join(PROJECT_FILE), file.to_string()).unwrap();

        let loaded = load_project(root.path()).unwrap();
        assert_eq!(loaded.skipped, 1);
        assert_eq!(loaded.image_path, None);
        assert!(loaded.scene.scale().is_none());
        assert_eq!(loaded.scene.objects().len(), 1);
        assert!(matches!(loaded.scene.objects()[0], crate::entity::Annotation::Rect(_)));
    }

    #[test]
    fn malformed_project_file_is_an_error() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join(PROJECT_FILE), "[1, 2").unwrap();
        assert!(matches!(load_project(root.path()), Err(ProjectError::Json(_))));
        let empty = TempDir::new().unwrap();
        assert!(matches!(load_project(empty.path()), Err(ProjectError::Io(_))));
    }

    #[test]
    fn project_names_stay_inside_root() {
        let root = Path::new("/projects");
        assert_eq!(project_dir(root, " kitchen ").unwrap(), root.join("kitchen"));
        assert!(project_dir(root, "").is_err());
        assert!(project_dir(root, "..").is_err());
        assert!(project_dir(root, "a/b").is_err());
        assert!(project_dir(root, "/etc").is_err());
    }

    #[test]
    fn override_root_is_created() {
        let tmp = TempDir::new().unwrap();
        let wanted = tmp.path().join("nested").join("projects");
        assert_eq!(projects_root(Some(&wanted)), wanted);
        assert!(wanted.is_dir());
    }
}
