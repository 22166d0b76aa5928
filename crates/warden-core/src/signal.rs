//! # OS signal bridge.
//!
//! Turns process termination signals into a [`CancellationToken`] that is passed explicitly to
//! [`Runner::run`](crate::Runner::run). Nothing is stored globally, so several runs in one host
//! process stay independent and tests can cancel their own token instead of raising signals.
//!
//! **Unix:** `SIGINT`, `SIGTERM`, `SIGQUIT`. **Windows:** Ctrl-C.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::CoreError;

/// Waits for a termination signal and returns its name.
///
/// Each call creates independent signal listeners.
pub async fn wait_for_shutdown_signal() -> std::io::Result<&'static str> {
    Ok(Signals::register()?.recv().await)
}

/// Returns a token cancelled on the first termination signal.
///
/// Listeners are registered before returning, so a signal arriving right after this call is not
/// lost. Must be called from within a tokio runtime.
pub fn shutdown_token() -> Result<CancellationToken, CoreError> {
    let mut signals = Signals::register().map_err(CoreError::SignalRegistration)?;
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        tokio::select! {
            name = signals.recv() => {
                info!(target: "warden.core.signal", signal = name, "shutdown requested");
                trigger.cancel();
            }
            _ = trigger.cancelled() => debug!(target: "warden.core.signal", "token cancelled elsewhere"),
        }
    });
    Ok(token)
}

/// Registered termination-signal listeners.
#[cfg(unix)]
struct Signals {
    sigint: tokio::signal::unix::Signal,
    sigterm: tokio::signal::unix::Signal,
    sigquit: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Signals {
    fn register() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            sigint: signal(SignalKind::interrupt())?,
            sigterm: signal(SignalKind::terminate())?,
            sigquit: signal(SignalKind::quit())?,
        })
    }

    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.sigint.recv() => "SIGINT",
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigquit.recv() => "SIGQUIT",
        }
    }
}

#[cfg(windows)]
struct Signals {
    ctrl_c: tokio::signal::windows::CtrlC,
}

#[cfg(windows)]
impl Signals {
    fn register() -> std::io::Result<Self> {
        Ok(Self {
            ctrl_c: tokio::signal::windows::ctrl_c()?,
        })
    }

    async fn recv(&mut self) -> &'static str {
        self.ctrl_c.recv().await;
        "ctrl-c"
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn tokens_are_independent() {
        let a = shutdown_token().unwrap();
        let b = shutdown_token().unwrap();

        a.cancel();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(a.is_cancelled());
        assert!(!b.is_cancelled());
    }
}
