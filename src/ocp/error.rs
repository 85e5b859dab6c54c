use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the problem registry and its serializers.
#[derive(Debug, Error)]
pub enum Error {
    /// The name is already taken by a parameter, a stage, or a name a
    /// registered stage's dynamics model owns internally.
    #[error("name {name:?} is already in use")]
    DuplicateName { name: String },

    #[error("{name:?} is not a known parameter")]
    UnknownParameter { name: String },

    #[error("{name:?} is not a known shooting stage")]
    UnknownStage { name: String },

    #[error("stage {stage:?} has no state or action {name:?} at interval {interval}")]
    UnknownStageVar {
        stage: String,
        name: String,
        interval: usize,
    },

    #[error("a shooting stage needs at least one interval, got {given}")]
    InvalidIntervalCount { given: usize },

    /// The guess file holds more numeric lines than there are design
    /// variables.
    #[error("guess file {path:?} has more values than the {capacity} design variables")]
    TooManyValues { path: PathBuf, capacity: usize },

    #[error("failed to open {path:?}")]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o failed on {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
