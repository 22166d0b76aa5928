use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{
    ADMIN_ADDRESS_FILE, ARCHIVE_SUFFIX, DEFAULT_SHUTDOWN_TIMEOUT_MS, PID_FILE, STDERR_LOG,
    STDOUT_LOG, TimeoutMs, error::ModelError,
};

/// Everything the runtime needs to supervise one worker run.
///
/// Built by the caller (version resolution / CLI layer) and never mutated while the run is in progress.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOptions {
    /// Ready-to-execute worker binary.
    pub binary: PathBuf,
    /// Per-run scratch directory: pid file, logs, side-channel file.
    pub run_dir: PathBuf,
    /// Extra worker arguments, passed through verbatim.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Leave the run directory in place instead of archiving it.
    #[serde(default)]
    pub dont_archive_run_dir: bool,
    /// Graceful shutdown ceiling, measured from the start of the shutdown sequence.
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: TimeoutMs,
}

fn default_shutdown_timeout_ms() -> TimeoutMs {
    DEFAULT_SHUTDOWN_TIMEOUT_MS
}

impl RunOptions {
    pub fn new(binary: impl Into<PathBuf>, run_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            run_dir: run_dir.into(),
            args: Vec::new(),
            dont_archive_run_dir: false,
            shutdown_timeout_ms: DEFAULT_SHUTDOWN_TIMEOUT_MS,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_dont_archive(mut self, dont_archive: bool) -> Self {
        self.dont_archive_run_dir = dont_archive;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout_ms = timeout.as_millis() as TimeoutMs;
        self
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.binary.as_os_str().is_empty() {
            return Err(ModelError::InvalidOptions("binary path is empty"));
        }
        if self.run_dir.as_os_str().is_empty() {
            return Err(ModelError::InvalidOptions("run directory is empty"));
        }
        if self.run_dir.file_name().is_none() {
            return Err(ModelError::InvalidOptions("run directory has no name"));
        }
        if self.shutdown_timeout_ms == 0 {
            return Err(ModelError::InvalidOptions("shutdown timeout must be positive"));
        }
        Ok(())
    }

    #[inline]
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Short worker name used in banners and exit errors: the binary's file stem.
    pub fn worker_name(&self) -> String {
        self.binary
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.binary.display().to_string())
    }

    #[inline]
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn pid_path(&self) -> PathBuf {
        self.run_dir.join(PID_FILE)
    }

    pub fn stdout_log_path(&self) -> PathBuf {
        self.run_dir.join(STDOUT_LOG)
    }

    pub fn stderr_log_path(&self) -> PathBuf {
        self.run_dir.join(STDERR_LOG)
    }

    /// Side-channel path injected when the caller did not pick one.
    pub fn default_admin_address_path(&self) -> PathBuf {
        self.run_dir.join(ADMIN_ADDRESS_FILE)
    }

    /// `<run_dir>.tar.gz`, a sibling of the run directory.
    ///
    /// Built from the directory's name, so `runs/1/` still archives to `runs/1.tar.gz`.
    pub fn archive_path(&self) -> PathBuf {
        let Some(name) = self.run_dir.file_name() else {
            let mut path = OsString::from(self.run_dir.as_os_str());
            path.push(ARCHIVE_SUFFIX);
            return PathBuf::from(path);
        };
        let mut name = name.to_os_string();
        name.push(ARCHIVE_SUFFIX);
        self.run_dir.with_file_name(name)
    }
}
