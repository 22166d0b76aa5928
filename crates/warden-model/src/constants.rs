use crate::TimeoutMs;

/// File inside the run directory holding the worker pid as decimal text.
pub const PID_FILE: &str = "worker.pid";
/// Transcript of the worker's standard output.
pub const STDOUT_LOG: &str = "stdout.log";
/// Transcript of the worker's standard error.
pub const STDERR_LOG: &str = "stderr.log";
/// Default side-channel file the worker publishes its admin address to.
pub const ADMIN_ADDRESS_FILE: &str = "admin-address.txt";
/// Worker flag naming the side-channel file.
pub const ADMIN_ADDRESS_FLAG: &str = "--admin-address-path";
/// Appended to the run directory path to name the archive.
pub const ARCHIVE_SUFFIX: &str = ".tar.gz";
/// Ceiling for a graceful shutdown. Don't wait forever.
pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: TimeoutMs = 5_000;
