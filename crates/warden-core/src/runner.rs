//! # Runner abstraction.
//!
//! The narrow surface the outer layers (CLI, tests) need from anything that supervises a worker:
//! run until done or cancelled, and describe where it currently is.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Something that can be run to completion under an external cancellation token.
///
/// Implemented by the real runtime and by test doubles.
#[async_trait]
pub trait Runner: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Runs until the supervised work ends on its own or `cancel` fires and shutdown completes.
    async fn run(&self, cancel: CancellationToken) -> Result<(), Self::Error>;

    /// Human-readable snapshot of the current state; cheap enough for test failure messages.
    fn describe(&self) -> String;
}
