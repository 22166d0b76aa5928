use std::{io, path::PathBuf, time::Duration};

use thiserror::Error;
use warden_core::CoreError;
use warden_model::ModelError;

/// The worker could not be started. Nothing is left running.
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error(transparent)]
    Options(#[from] ModelError),
    #[error(transparent)]
    AdminFlag(#[from] CoreError),
    #[error("unable to create run directory {}: {source}", path.display())]
    RunDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unable to create {}: {source}", path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unable to start {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: io::Error,
    },
    #[error("unable to write pid file {}: {source}", path.display())]
    PidFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{0} exited before its pid could be recorded")]
    NoPid(String),
}

/// Result of a supervised run, as reported to the caller.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Launch(#[from] LaunchError),
    #[error("{worker} exited with status: {code}")]
    Exited { worker: String, code: i32 },
    #[error("{worker} terminated by signal: {signal}")]
    Signaled { worker: String, signal: i32 },
    #[error("{worker} did not stop within {timeout:?} and was killed")]
    ForcedKill { worker: String, timeout: Duration },
    #[error("failed waiting for {worker}: {source}")]
    Wait {
        worker: String,
        #[source]
        source: io::Error,
    },
    #[error("runtime already started")]
    AlreadyStarted,
}

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("run directory {} has no name", .0.display())]
    Unnamed(PathBuf),
    #[error("unable to archive {} into {}: archive would be inside the run directory", run_dir.display(), archive.display())]
    InsideRunDir { run_dir: PathBuf, archive: PathBuf },
    #[error("unable to archive {} into {}: {source}", run_dir.display(), archive.display())]
    Pack {
        run_dir: PathBuf,
        archive: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unable to remove {}: {source}", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("archive task failed: {0}")]
    Join(String),
}
