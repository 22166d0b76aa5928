use std::{
    fmt,
    io::{self, Write},
    sync::{Arc, Mutex, PoisonError},
};

/// Shared, cloneable output destination.
///
/// Writes are serialized through a mutex so chunks forwarded from the worker and the runtime's
/// own status lines never tear each other. Every write is flushed before the lock is released.
///
/// Writes are blocking `std::io` calls. Worker output reaches the sink from the blocking pool;
/// only the runtime's short status lines are written from async tasks.
#[derive(Clone)]
pub struct Sink {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Sink {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    pub fn discard() -> Self {
        Self::new(io::sink())
    }

    pub fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        let mut w = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        w.write_all(buf)?;
        w.flush()
    }

    /// Writes one formatted line followed by `\n`.
    pub fn line(&self, args: fmt::Arguments<'_>) -> io::Result<()> {
        let mut line = args.to_string();
        line.push('\n');
        self.write_all(line.as_bytes())
    }
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Sink")
    }
}

/// In-memory sink, e.g. for tests or for embedding the runtime behind another UI.
#[derive(Clone, Debug, Default)]
pub struct Capture {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl Capture {
    pub fn new() -> Self {
        Self::default()
    }

    /// A [`Sink`] appending to this capture.
    pub fn sink(&self) -> Sink {
        Sink::new(self.clone())
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.buf.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Captured bytes decoded lossily as UTF-8.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes()).into_owned()
    }
}

impl Write for Capture {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// The two console destinations of a run.
///
/// `out` receives the worker's stdout plus the runtime's banners and warnings;
/// `err` receives the worker's stderr only.
#[derive(Clone, Debug)]
pub struct Console {
    pub out: Sink,
    pub err: Sink,
}

impl Console {
    pub fn new(out: Sink, err: Sink) -> Self {
        Self { out, err }
    }

    /// The host process's own stdout and stderr.
    pub fn std() -> Self {
        Self::new(Sink::stdout(), Sink::stderr())
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::std()
    }
}
