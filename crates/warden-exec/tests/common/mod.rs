#![allow(dead_code)]

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use warden_core::Runner;
use warden_exec::Capture;

/// Shell stand-in for the proxy. Without `-c` it fails like a proxy missing its config;
/// with one it publishes its admin address, logs the dispatch-loop line and idles until SIGINT.
/// `-c ignore-sigint.yaml` makes it ignore SIGINT so only a kill stops it.
const FAKE_WORKER: &str = r#"
config=""
admin_path=""
while [ $# -gt 0 ]; do
  case "$1" in
    -c|--config-path) config="$2"; shift ;;
    --admin-address-path) admin_path="$2"; shift ;;
  esac
  shift
done
echo "initializing epoch 0" >&2
if [ -z "$config" ]; then
  echo "exiting" >&2
  echo "At least one of --config-path or --config-yaml or Options::configProto() should be non-empty" >&2
  exit 1
fi
if [ "$config" = "ignore-sigint.yaml" ]; then
  trap '' INT
else
  trap 'echo "caught SIGINT" >&2; echo "exiting" >&2; exit 0' INT
fi
if [ -n "$admin_path" ]; then printf '127.0.0.1:9901' > "$admin_path"; fi
echo "config: $config"
echo "starting main dispatch loop" >&2
while :; do sleep 1 >/dev/null 2>&1 & wait $!; done
"#;

pub const READY: &str = "starting main dispatch loop";

/// Installs the fake worker under `dir`.
///
/// The binary is a `worker` symlink to `/bin/sh` and the script is its first argument; executing
/// a freshly written script directly races with concurrent forks in other tests (ETXTBSY).
pub struct FakeWorker {
    pub binary: PathBuf,
    pub script: PathBuf,
}

impl FakeWorker {
    pub fn install(dir: &Path) -> Self {
        let binary = dir.join("worker");
        let script = dir.join("worker.sh");
        std::fs::write(&script, FAKE_WORKER).unwrap();
        std::os::unix::fs::symlink("/bin/sh", &binary).unwrap();
        Self { binary, script }
    }

    /// Script path followed by `extra`.
    pub fn args(&self, extra: &[&str]) -> Vec<String> {
        std::iter::once(self.script.display().to_string())
            .chain(extra.iter().map(|s| s.to_string()))
            .collect()
    }
}

/// Runs `runner` to completion. With `cancel_on`, the run is cancelled once `watch` shows that
/// text; otherwise the worker is expected to exit on its own.
pub async fn require_run<R>(
    runner: Arc<R>,
    watch: &Capture,
    cancel_on: Option<&str>,
    within: Duration,
) -> Result<(), R::Error>
where
    R: Runner + 'static,
{
    let cancel = CancellationToken::new();
    let task = tokio::spawn({
        let runner = Arc::clone(&runner);
        let cancel = cancel.clone();
        async move { runner.run(cancel).await }
    });

    if let Some(marker) = cancel_on {
        let deadline = Instant::now() + within;
        while !watch.contents().contains(marker) {
            assert!(
                !task.is_finished(),
                "run ended before {marker:?}: {}",
                runner.describe()
            );
            assert!(
                Instant::now() < deadline,
                "timed out waiting for {marker:?}: {}",
                runner.describe()
            );
            sleep(Duration::from_millis(10)).await;
        }
        cancel.cancel();
    }

    tokio::time::timeout(within, task)
        .await
        .unwrap_or_else(|_| panic!("run did not finish in {within:?}: {}", runner.describe()))
        .expect("run task panicked")
}

/// Names of the entries directly under `dir`.
pub fn list_dir(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Reads one file out of a `.tar.gz` archive.
pub fn read_from_archive(archive: &Path, entry: &str) -> Option<String> {
    use std::io::Read;

    let file = std::fs::File::open(archive).unwrap();
    let mut tar = tar::Archive::new(flate2::read::GzDecoder::new(file));
    for e in tar.entries().unwrap() {
        let mut e = e.unwrap();
        if e.path().unwrap() == Path::new(entry) {
            let mut s = String::new();
            e.read_to_string(&mut s).unwrap();
            return Some(s);
        }
    }
    None
}
