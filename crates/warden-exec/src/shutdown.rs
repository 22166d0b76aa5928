//! # Graceful shutdown of the worker.
//!
//! Runs only when the caller cancels the run while the worker is alive:
//!
//! ```text
//! HooksRunning -> SignalSent -> WaitingExit -> Done
//!       \______________ ceiling elapsed ______/-> forced kill
//! ```
//!
//! The ceiling is measured from the moment shutdown starts, so slow hooks eat into the time the
//! worker gets to exit. Hooks are never interrupted: if they overrun, the worker is killed while
//! they keep going in the background.

use std::{
    path::PathBuf,
    process::ExitStatus,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tokio::{
    process::Child,
    time::{Instant, sleep_until},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use warden_core::{AdminEndpoint, ShutdownContext, ShutdownHooks};
use warden_model::RunPhase;

use crate::{console::Sink, state::SharedState, util::interrupt};

/// How the worker's exit was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// The worker exited on its own; no hooks ran.
    Natural(ExitStatus),
    /// The worker stopped after the graceful signal.
    Graceful(ExitStatus),
    /// The ceiling elapsed and the worker was killed.
    Forced(ExitStatus),
}

impl Exit {
    pub fn status(&self) -> ExitStatus {
        match *self {
            Exit::Natural(s) | Exit::Graceful(s) | Exit::Forced(s) => s,
        }
    }
}

/// Drives one shutdown sequence for one worker.
pub struct ShutdownCoordinator {
    hooks: ShutdownHooks,
    timeout: Duration,
    console: Sink,
    state: SharedState,
    signalled: AtomicBool,
}

impl ShutdownCoordinator {
    pub fn new(hooks: ShutdownHooks, timeout: Duration, console: Sink) -> Self {
        Self::with_state(hooks, timeout, console, SharedState::default())
    }

    pub(crate) fn with_state(
        hooks: ShutdownHooks,
        timeout: Duration,
        console: Sink,
        state: SharedState,
    ) -> Self {
        Self {
            hooks,
            timeout,
            console,
            state,
            signalled: AtomicBool::new(false),
        }
    }

    /// Whether the graceful signal has been sent.
    pub fn signalled(&self) -> bool {
        self.signalled.load(Ordering::SeqCst)
    }

    /// Runs hooks, signals the worker once, and waits for it up to the ceiling.
    ///
    /// The returned error only covers failing to observe the worker's exit status.
    pub async fn shutdown(
        &self,
        child: &mut Child,
        pid: u32,
        run_dir: impl Into<PathBuf>,
        admin: Arc<AdminEndpoint>,
    ) -> std::io::Result<Exit> {
        let deadline = Instant::now() + self.timeout;
        let budget = CancellationToken::new();
        let ctx = ShutdownContext::new(budget.clone(), pid, run_dir, admin);

        self.state.set_phase(RunPhase::HooksRunning);
        debug!(target: "warden.exec.shutdown", hooks = self.hooks.len(), timeout = ?self.timeout, "running shutdown hooks");
        let mut hooks = tokio::spawn(run_hooks(self.hooks.clone(), ctx, self.console.clone()));

        let hooks_done = tokio::select! {
            res = &mut hooks => {
                if let Err(e) = res {
                    warn!(target: "warden.exec.shutdown", error = %e, "shutdown hooks task failed");
                }
                true
            }
            _ = sleep_until(deadline) => false,
        };
        if !hooks_done {
            budget.cancel();
            self.warn(format_args!(
                "shutdown hooks did not complete within {:?}",
                self.timeout
            ));
            return self.force_kill(child).await;
        }

        self.signal_once(child);

        self.state.set_phase(RunPhase::WaitingExit);
        tokio::select! {
            status = child.wait() => {
                let status = status?;
                info!(target: "warden.exec.shutdown", %status, "worker stopped gracefully");
                Ok(Exit::Graceful(status))
            }
            _ = sleep_until(deadline) => {
                budget.cancel();
                self.force_kill(child).await
            }
        }
    }

    fn signal_once(&self, child: &mut Child) {
        if self.signalled.swap(true, Ordering::SeqCst) {
            trace!(target: "warden.exec.shutdown", "termination signal already sent");
            return;
        }
        if let Err(e) = interrupt(child) {
            self.warn(format_args!("unable to signal worker: {e}"));
        }
        self.state.set_phase(RunPhase::SignalSent);
    }

    async fn force_kill(&self, child: &mut Child) -> std::io::Result<Exit> {
        warn!(target: "warden.exec.shutdown", timeout = ?self.timeout, "worker did not stop in time; killing");
        self.state.update(|s| {
            s.forced = true;
            s.phase = RunPhase::WaitingExit;
        });
        if let Err(e) = child.kill().await {
            // Lost the race with a natural exit: the status below is still valid.
            debug!(target: "warden.exec.shutdown", error = %e, "kill failed");
        }
        let status = child.wait().await?;
        Ok(Exit::Forced(status))
    }

    fn warn(&self, args: std::fmt::Arguments<'_>) {
        warn!(target: "warden.exec.shutdown", "{args}");
        let _ = self.console.line(format_args!("warning: {args}"));
    }
}

/// Runs every hook in order. Each hook runs in its own task so a panic is reported like an error
/// and the remaining hooks still run.
async fn run_hooks(hooks: ShutdownHooks, ctx: ShutdownContext, console: Sink) {
    for hook in hooks.iter() {
        let name = hook.name().to_string();
        trace!(target: "warden.exec.shutdown", hook = %name, "hook start");
        let err = match tokio::spawn(hook.call(ctx.clone())).await {
            Ok(Ok(())) => continue,
            Ok(Err(e)) => e.to_string(),
            Err(e) => format!("hook panicked: {e}"),
        };
        warn!(target: "warden.exec.shutdown", hook = %name, error = %err, "shutdown hook failed");
        let _ = console.line(format_args!("warning: {err}"));
    }
}
