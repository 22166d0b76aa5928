//! Logger bootstrap for warden binaries.
//!
//! Supervisor diagnostics go to **stderr** so they never interleave with the worker's
//! standard output, which the runtime forwards to the console verbatim.
mod logger;
pub use logger::*;
