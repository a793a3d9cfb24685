use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures while loading or wiring a scene description.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("failed to read scene file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to deserialize scene: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("portal '{portal}' links to unknown destination '{destination}'")]
    UnknownDestination { portal: String, destination: String },

    #[error("portal name '{0}' is used more than once")]
    DuplicatePortal(String),
}
