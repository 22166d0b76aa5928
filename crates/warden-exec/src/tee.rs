//! Forwarding of one worker stream to its log file and to the console.

use std::io;

use tokio::{
    fs::File,
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt},
};
use tracing::{trace, warn};

use crate::console::Sink;

const CHUNK: usize = 8 * 1024;

/// Copies `reader` until EOF into `log` and `console`, chunk by chunk, log first.
///
/// Console chunks are written on the blocking pool, so a stalled console holds up this stream
/// only, never the runtime's timers.
///
/// A failing destination is dropped with a warning and the other one keeps receiving data, so
/// the worker never blocks on a full pipe. Returns the number of bytes read.
pub(crate) async fn tee<R>(
    stream: &'static str,
    mut reader: R,
    log: File,
    console: Sink,
) -> io::Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut log = Some(log);
    let mut console = Some(console);
    let mut buf = vec![0u8; CHUNK];
    let mut total = 0u64;

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        total += n as u64;
        let chunk = &buf[..n];

        if let Some(file) = log.as_mut() {
            let res = match file.write_all(chunk).await {
                Ok(()) => file.flush().await,
                Err(e) => Err(e),
            };
            if let Err(e) = res {
                warn!(target: "warden.exec.tee", stream, error = %e, "log file write failed; continuing with console only");
                log = None;
            }
        }
        if let Some(sink) = console.clone() {
            // Console writes block; keep them off the async workers.
            let data = chunk.to_vec();
            let res = tokio::task::spawn_blocking(move || sink.write_all(&data))
                .await
                .unwrap_or_else(|e| Err(io::Error::other(e)));
            if let Err(e) = res {
                warn!(target: "warden.exec.tee", stream, error = %e, "console write failed; continuing with log file only");
                console = None;
            }
        }
    }

    if let Some(mut file) = log {
        file.flush().await?;
        file.sync_all().await?;
    }
    trace!(target: "warden.exec.tee", stream, bytes = total, "stream closed");
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::Capture;

    #[tokio::test]
    async fn copies_to_both_destinations_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stdout.log");
        let log = File::create(&path).await.unwrap();
        let cap = Capture::new();

        let input: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
        let n = tee("stdout", &input[..], log, cap.sink()).await.unwrap();

        assert_eq!(n, input.len() as u64);
        assert_eq!(cap.bytes(), input);
        assert_eq!(tokio::fs::read(&path).await.unwrap(), input);
    }

    /// Console whose every write waits for the test to release it.
    struct Gate(std::sync::mpsc::Receiver<()>);

    impl std::io::Write for Gate {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            let _ = self.0.recv();
            Ok(data.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn stalled_console_does_not_block_the_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stdout.log");
        let log = File::create(&path).await.unwrap();
        let (release, gate) = std::sync::mpsc::channel();

        let task = tokio::spawn(tee("stdout", &b"hello\n"[..], log, Sink::new(Gate(gate))));

        // Single-threaded runtime: this only wakes up if the console write is off-thread.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!task.is_finished());
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"hello\n");

        release.send(()).unwrap();
        assert_eq!(task.await.unwrap().unwrap(), 6);
    }

    #[tokio::test]
    async fn appends_to_existing_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stderr.log");
        tokio::fs::write(&path, b"earlier\n").await.unwrap();
        let log = tokio::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .await
            .unwrap();

        tee("stderr", &b"later\n"[..], log, Sink::discard())
            .await
            .unwrap();
        assert_eq!(
            tokio::fs::read_to_string(&path).await.unwrap(),
            "earlier\nlater\n"
        );
    }
}
