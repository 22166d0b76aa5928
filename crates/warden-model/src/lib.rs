mod constants;
pub use constants::*;

mod error;
pub use error::ModelError;

mod admin_address;
pub use admin_address::AdminAddress;

mod run_options;
pub use run_options::RunOptions;

mod run_phase;
pub use run_phase::RunPhase;

/// Timeout value in milliseconds.
pub type TimeoutMs = u64;
