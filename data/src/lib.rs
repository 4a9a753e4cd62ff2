use std::path::PathBuf;

pub mod config;
pub mod log;
pub mod theme;
pub mod trace;

pub use config::State;
pub use theme::Theme;
pub use trace::{Activity, ActivityKind, NodeEnergy, Selection, Trace};

/// Path of a file inside the platform data directory, falling back to
/// the working directory when no data directory is available.
pub fn data_path(file: &str) -> PathBuf {
    dirs_next::data_dir().map_or_else(
        || PathBuf::from(file),
        |dir| dir.join("floratrace").join(file),
    )
}
