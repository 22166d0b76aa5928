pub mod error;
pub use error::{CoreError, HookError};

pub mod admin;
pub use admin::AdminEndpoint;

pub mod hooks;
pub use hooks::{HookFn, HookRef, ShutdownContext, ShutdownHook, ShutdownHooks};

pub mod runner;
pub use runner::Runner;

pub mod signal;
pub use signal::{shutdown_token, wait_for_shutdown_signal};
