//! Supervises one worker described by a JSON options file.
//!
//! ```text
//! supervise options.json
//! ```
//!
//! where `options.json` looks like
//! `{"binary": "/usr/local/bin/envoy", "runDir": "/tmp/runs/1", "args": ["-c", "envoy.yaml"]}`.
use std::{path::PathBuf, time::Duration};

use anyhow::{Context, bail};
use tracing::{error, info};

use warden_core::shutdown_token;
use warden_exec::{Console, RunError, Runtime, collect::admin_data_hook};
use warden_model::RunOptions;
use warden_observe::{LoggerConfig, logger_init};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1) Logger
    let cfg = LoggerConfig::from_env()?;
    logger_init(&cfg)?;

    // 2) Options
    let Some(path) = std::env::args_os().nth(1).map(PathBuf::from) else {
        bail!("usage: supervise <options.json>");
    };
    let raw = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
    let opts: RunOptions =
        serde_json::from_slice(&raw).with_context(|| format!("parsing {}", path.display()))?;
    opts.validate()?;
    info!(binary = %opts.binary.display(), run_dir = %opts.run_dir.display(), "options loaded");

    // 3) Runtime + hooks
    let mut runtime = Runtime::new(opts, Console::std());
    runtime.register_shutdown_hook(admin_data_hook(Duration::from_secs(1)));

    // 4) Run until the worker exits or we are asked to stop
    let cancel = shutdown_token()?;
    match runtime.run(cancel).await {
        Ok(()) => {
            info!(state = %runtime.describe(), "worker stopped");
            Ok(())
        }
        Err(RunError::Exited { worker, code }) => {
            error!(%worker, code, "worker failed");
            std::process::exit(code);
        }
        Err(e) => Err(e.into()),
    }
}
