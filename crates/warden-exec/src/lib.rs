//! Worker process supervision.
//!
//! [`Runtime`] launches one worker, tees its output to the console and the run directory,
//! stops it gracefully when the caller's token is cancelled and archives the run directory
//! once the worker is gone.
mod error;
pub use error::{ArchiveError, LaunchError, RunError};

mod archive;
pub use archive::archive_run_dir;

mod console;
pub use console::{Capture, Console, Sink};

mod launch;
pub use launch::{Launch, ProcessHandle};

mod shutdown;
pub use shutdown::{Exit, ShutdownCoordinator};

mod state;
pub use state::RunState;

mod runtime;
pub use runtime::Runtime;

mod tee;
mod util;

#[cfg(feature = "collect")]
pub mod collect;

pub mod prelude {
    pub use crate::error::{LaunchError, RunError};
    pub use crate::{Capture, Console, Runtime, Sink};
    pub use warden_core::{HookError, HookFn, Runner, ShutdownContext, shutdown_token};
    pub use warden_model::RunOptions;
}
