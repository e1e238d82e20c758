//! Floor-plan annotation core: scale a raster plan, then measure distances
//! and areas in real-world units.
//!
//! Everything here runs without a window; the eframe shell lives in the
//! binary target.

pub mod config;
pub mod draw;
pub mod editor;
pub mod entity;
pub mod geometry;
pub mod grid;
pub mod history;
pub mod project;
pub mod scene;
