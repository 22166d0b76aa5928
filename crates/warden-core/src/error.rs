use std::{io, path::PathBuf};

use thiserror::Error;
use warden_model::ModelError;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("missing value to argument {flag:?}")]
    MissingFlagValue { flag: &'static str },

    #[error("unable to read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to parse {}: {source}", path.display())]
    Invalid {
        path: PathBuf,
        #[source]
        source: ModelError,
    },

    #[error("failed to register signal handler: {0}")]
    SignalRegistration(#[source] io::Error),
}

/// Failure reported by a shutdown hook. Never fatal for the run.
#[derive(Debug, Error)]
pub enum HookError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Failed(String),
}

impl HookError {
    pub fn failed(reason: impl Into<String>) -> Self {
        HookError::Failed(reason.into())
    }
}
