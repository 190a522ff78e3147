//! Time-series kinematic plots with a cursor shared across plot surfaces,
//! drag-to-zoom selection and linked axis ranges.

pub mod config;
pub mod engine;
pub mod processing;
pub mod render;
pub mod state;
pub mod visualizer;

#[cfg(test)]
mod testing;

pub use config::{ConfigError, ViewerConfig};
pub use engine::registry::{PlotRegistry, SharedRegistry, SurfaceKind};
pub use render::surface::{PlotSurface, SurfaceHandle, SurfaceId};
pub use visualizer::KinematicView;
