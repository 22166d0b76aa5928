use std::{
    io,
    path::{Path, PathBuf},
    process::Stdio,
    sync::Arc,
    time::Duration,
};

use tokio::{
    fs::{File, OpenOptions},
    process::{Child, Command},
    task::JoinHandle,
    time::{Instant, timeout_at},
};
use tracing::{debug, trace, warn};
use warden_core::AdminEndpoint;
use warden_model::RunOptions;

use crate::{console::Console, error::LaunchError, tee::tee};

/// A worker invocation ready to be started: resolved argv plus where its files go.
#[derive(Debug)]
pub struct Launch {
    binary: PathBuf,
    argv: Vec<String>,
    admin: Arc<AdminEndpoint>,
    run_dir: PathBuf,
    pid_path: PathBuf,
    stdout_log: PathBuf,
    stderr_log: PathBuf,
}

impl Launch {
    /// Resolves the argument vector: `[binary, caller args..., --admin-address-path <file>]`.
    ///
    /// The side-channel flag is only appended when the caller did not pass one.
    pub fn prepare(opts: &RunOptions) -> Result<Self, LaunchError> {
        opts.validate()?;

        let mut args = opts.args.clone();
        let admin = AdminEndpoint::ensure_flag(&mut args, &opts.default_admin_address_path())?;

        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push(opts.binary.display().to_string());
        argv.extend(args);

        Ok(Self {
            binary: opts.binary.clone(),
            argv,
            admin: Arc::new(admin),
            run_dir: opts.run_dir.clone(),
            pid_path: opts.pid_path(),
            stdout_log: opts.stdout_log_path(),
            stderr_log: opts.stderr_log_path(),
        })
    }

    /// Binary first, then arguments.
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn admin(&self) -> Arc<AdminEndpoint> {
        Arc::clone(&self.admin)
    }

    /// The command as it will be spawned.
    ///
    /// No working directory is set: the worker shares the host's, since relative paths in the
    /// caller's arguments (config files) are relative to it.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(&self.argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Creates the run directory and log files, starts the worker, records its pid and starts
    /// forwarding its output.
    pub async fn spawn(self, console: &Console) -> Result<ProcessHandle, LaunchError> {
        tokio::fs::create_dir_all(&self.run_dir)
            .await
            .map_err(|source| LaunchError::RunDir {
                path: self.run_dir.clone(),
                source,
            })?;
        let stdout_log = open_log(&self.stdout_log).await?;
        let stderr_log = open_log(&self.stderr_log).await?;

        trace!(target: "warden.exec.launch", argv = ?self.argv, "spawn");
        let mut child = self
            .command()
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                binary: self.binary.display().to_string(),
                source,
            })?;

        let Some(pid) = child.id() else {
            return Err(LaunchError::NoPid(self.binary.display().to_string()));
        };
        if let Err(source) = tokio::fs::write(&self.pid_path, pid.to_string()).await {
            let _ = child.start_kill();
            return Err(LaunchError::PidFile {
                path: self.pid_path,
                source,
            });
        }
        debug!(target: "warden.exec.launch", pid, pid_file = %self.pid_path.display(), "worker started");

        let mut tees = Vec::with_capacity(2);
        if let Some(out) = child.stdout.take() {
            tees.push(tokio::spawn(tee("stdout", out, stdout_log, console.out.clone())));
        }
        if let Some(err) = child.stderr.take() {
            tees.push(tokio::spawn(tee("stderr", err, stderr_log, console.err.clone())));
        }

        Ok(ProcessHandle {
            pid,
            argv: self.argv,
            child,
            tees,
        })
    }
}

async fn open_log(path: &Path) -> Result<File, LaunchError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|source| LaunchError::LogFile {
            path: path.to_path_buf(),
            source,
        })
}

/// The one running worker of a run.
#[derive(Debug)]
pub struct ProcessHandle {
    pid: u32,
    argv: Vec<String>,
    child: Child,
    tees: Vec<JoinHandle<io::Result<u64>>>,
}

impl ProcessHandle {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn child_mut(&mut self) -> &mut Child {
        &mut self.child
    }

    /// Waits for both output streams to reach EOF so the log files are complete.
    ///
    /// Grandchildren can keep the pipes open after the worker exits; past `limit` the
    /// forwarding is cut and the log files are closed as they are.
    pub async fn drain(&mut self, limit: Duration) {
        let deadline = Instant::now() + limit;
        for mut task in self.tees.drain(..) {
            match timeout_at(deadline, &mut task).await {
                Ok(Ok(Ok(bytes))) => trace!(target: "warden.exec.launch", bytes, "output drained"),
                Ok(Ok(Err(e))) => warn!(target: "warden.exec.launch", error = %e, "output forwarding failed"),
                Ok(Err(e)) => warn!(target: "warden.exec.launch", error = %e, "output task failed"),
                Err(_) => {
                    task.abort();
                    warn!(target: "warden.exec.launch", ?limit, "output still open after worker exit; log closed");
                }
            }
        }
    }
}
