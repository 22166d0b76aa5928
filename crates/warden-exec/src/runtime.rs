use std::{
    path::Path,
    process::ExitStatus,
    sync::{
        Arc, OnceLock,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use warden_core::{AdminEndpoint, HookRef, Runner, ShutdownHooks};
use warden_model::{RunOptions, RunPhase};

use crate::{
    archive::archive_run_dir,
    console::Console,
    error::RunError,
    launch::{Launch, ProcessHandle},
    shutdown::{Exit, ShutdownCoordinator},
    state::{RunState, SharedState},
    util::banner_timestamp,
};

/// How long output forwarding may lag behind the worker's exit.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Supervises exactly one worker run.
///
/// ```no_run
/// # async fn demo() -> Result<(), warden_exec::RunError> {
/// use warden_exec::prelude::*;
///
/// let opts = RunOptions::new("/usr/local/bin/envoy", "/tmp/runs/1").with_args(["-c", "envoy.yaml"]);
/// let runtime = Runtime::new(opts, Console::std());
/// runtime.run(shutdown_token().expect("signals")).await
/// # }
/// ```
pub struct Runtime {
    opts: RunOptions,
    console: Console,
    hooks: ShutdownHooks,
    state: SharedState,
    admin: OnceLock<Arc<AdminEndpoint>>,
    started: AtomicBool,
}

impl Runtime {
    pub fn new(opts: RunOptions, console: Console) -> Self {
        Self {
            opts,
            console,
            hooks: ShutdownHooks::new(),
            state: SharedState::default(),
            admin: OnceLock::new(),
            started: AtomicBool::new(false),
        }
    }

    /// Adds a hook to run, after the ones already registered, when the run is cancelled.
    pub fn register_shutdown_hook(&mut self, hook: HookRef) {
        self.hooks.register(hook);
    }

    pub fn options(&self) -> &RunOptions {
        &self.opts
    }

    /// Directory the worker's files are written to.
    pub fn run_dir(&self) -> &Path {
        self.opts.run_dir()
    }

    /// Resolved argument vector; empty before [`run`](Self::run).
    pub fn args(&self) -> Vec<String> {
        self.state.snapshot().argv
    }

    pub fn pid(&self) -> Option<u32> {
        self.state.snapshot().pid
    }

    pub fn state(&self) -> RunState {
        self.state.snapshot()
    }

    /// Admin endpoint resolver, available once the run has been launched.
    pub fn admin_endpoint(&self) -> Option<Arc<AdminEndpoint>> {
        self.admin.get().cloned()
    }

    pub fn describe(&self) -> String {
        self.state.snapshot().describe()
    }

    /// Runs the worker until it exits on its own or `cancel` fires and shutdown completes.
    ///
    /// The run directory is archived afterwards (unless opted out) on every path where the
    /// worker was started. A graceful stop after cancellation is not an error.
    #[instrument(level = "debug", skip_all, fields(worker = %self.opts.worker_name()))]
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), RunError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(RunError::AlreadyStarted);
        }

        let mut handle = match self.launch().await {
            Ok(handle) => handle,
            Err(e) => {
                self.state.set_phase(RunPhase::Done);
                return Err(e);
            }
        };

        let exit = self.supervise(&mut handle, &cancel).await;

        handle.drain(DRAIN_TIMEOUT).await;
        if let Ok(exit) = &exit {
            let status = exit.status();
            self.state.update(|s| s.exit_code = Some(status.code().unwrap_or(-1)));
        }
        self.finalize_run_dir().await;
        self.state.set_phase(RunPhase::Done);

        let worker = self.opts.worker_name();
        match exit {
            Ok(Exit::Natural(status)) => natural_result(worker, status),
            Ok(Exit::Graceful(_)) => Ok(()),
            Ok(Exit::Forced(_)) => Err(RunError::ForcedKill {
                worker,
                timeout: self.opts.shutdown_timeout(),
            }),
            Err(source) => Err(RunError::Wait { worker, source }),
        }
    }

    async fn launch(&self) -> Result<ProcessHandle, RunError> {
        let launch = Launch::prepare(&self.opts)?;
        let _ = self.admin.set(launch.admin());
        self.state.update(|s| s.argv = launch.argv().to_vec());

        self.status_line(format_args!(
            "{} starting: {}",
            banner_timestamp(),
            launch.argv().join(" ")
        ));
        let handle = launch.spawn(&self.console).await?;

        self.state.update(|s| {
            s.pid = Some(handle.pid());
            s.phase = RunPhase::Running;
        });
        info!(target: "warden.exec.runtime", pid = handle.pid(), "worker running");
        Ok(handle)
    }

    /// Waits for whichever comes first: the worker's own exit or cancellation.
    async fn supervise(
        &self,
        handle: &mut ProcessHandle,
        cancel: &CancellationToken,
    ) -> std::io::Result<Exit> {
        let pid = handle.pid();
        let child = handle.child_mut();

        let exited = tokio::select! {
            biased;
            status = child.wait() => Some(status?),
            _ = cancel.cancelled() => None,
        };
        if let Some(status) = exited {
            debug!(target: "warden.exec.runtime", %status, "worker exited on its own");
            self.state.set_phase(RunPhase::WaitingExit);
            return Ok(Exit::Natural(status));
        }

        // Cancellation and a natural exit can land together; hooks only run for a live worker.
        if let Some(status) = child.try_wait()? {
            debug!(target: "warden.exec.runtime", %status, "worker exited before shutdown began");
            self.state.set_phase(RunPhase::WaitingExit);
            return Ok(Exit::Natural(status));
        }

        self.status_line(format_args!(
            "{} stopping: {} (pid {pid})",
            banner_timestamp(),
            self.opts.worker_name()
        ));
        let admin = self
            .admin_endpoint()
            .unwrap_or_else(|| Arc::new(AdminEndpoint::new(self.opts.default_admin_address_path())));
        let coordinator = ShutdownCoordinator::with_state(
            self.hooks.clone(),
            self.opts.shutdown_timeout(),
            self.console.out.clone(),
            self.state.clone(),
        );
        coordinator
            .shutdown(child, pid, self.opts.run_dir.clone(), admin)
            .await
    }

    async fn finalize_run_dir(&self) {
        if self.opts.dont_archive_run_dir {
            debug!(target: "warden.exec.runtime", run_dir = %self.opts.run_dir.display(), "archiving disabled");
            return;
        }
        if let Err(e) = archive_run_dir(self.opts.run_dir.clone(), self.opts.archive_path()).await {
            warn!(target: "warden.exec.runtime", error = %e, "unable to archive run directory");
            self.status_line(format_args!("warning: {e}"));
        }
    }

    fn status_line(&self, args: std::fmt::Arguments<'_>) {
        if let Err(e) = self.console.out.line(args) {
            warn!(target: "warden.exec.runtime", error = %e, "console write failed");
        }
    }
}

fn natural_result(worker: String, status: ExitStatus) -> Result<(), RunError> {
    if status.success() {
        return Ok(());
    }
    if let Some(code) = status.code() {
        return Err(RunError::Exited { worker, code });
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Err(RunError::Signaled { worker, signal });
        }
    }
    Err(RunError::Exited { worker, code: -1 })
}

#[async_trait]
impl Runner for Runtime {
    type Error = RunError;

    async fn run(&self, cancel: CancellationToken) -> Result<(), RunError> {
        Runtime::run(self, cancel).await
    }

    fn describe(&self) -> String {
        Runtime::describe(self)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;

    #[test]
    fn natural_exit_codes() {
        assert!(natural_result("worker".into(), ExitStatus::from_raw(0)).is_ok());

        let err = natural_result("worker".into(), ExitStatus::from_raw(1 << 8)).unwrap_err();
        assert_eq!(err.to_string(), "worker exited with status: 1");

        let err = natural_result("worker".into(), ExitStatus::from_raw(libc::SIGSEGV)).unwrap_err();
        assert!(matches!(err, RunError::Signaled { signal, .. } if signal == libc::SIGSEGV));
    }
}
