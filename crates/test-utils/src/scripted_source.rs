use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use logtap::stream::{BoxedStream, OpenFuture, StreamSource};
use logtap::task::{StreamKind, Task};
use tokio::io::{AsyncRead, DuplexStream, ReadBuf};

/// What opening a given path does.
#[derive(Debug, Clone)]
pub enum Script {
    /// Open succeeds; the stream yields these bytes then ends.
    Bytes(Vec<u8>),
    /// Open succeeds; the stream stays open until the test writes to or
    /// drops the writer half (see [`ScriptedSource::take_writer`]).
    Live,
    /// Every open fails with `NotFound`.
    Fail,
    /// The first `n` opens fail, later ones follow the inner script.
    FailThen(u32, Box<Script>),
}

impl Script {
    /// Lines joined with `\n`, each one terminated.
    pub fn lines(lines: &[&str]) -> Self {
        let mut bytes = Vec::new();
        for line in lines {
            bytes.extend_from_slice(line.as_bytes());
            bytes.push(b'\n');
        }
        Script::Bytes(bytes)
    }
}

/// A fake stream source that:
/// - resolves `<identifier>/<stdout|stderr>` paths
/// - answers opens from per-path scripts (default: `Live`)
/// - counts open attempts per path and currently open streams.
#[derive(Debug)]
pub struct ScriptedSource {
    job_scoped: bool,
    default: Script,
    scripts: Mutex<HashMap<PathBuf, Script>>,
    opens: Mutex<HashMap<PathBuf, u32>>,
    writers: Mutex<HashMap<PathBuf, DuplexStream>>,
    live: Arc<AtomicUsize>,
}

impl Default for ScriptedSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::with_default(Script::Live)
    }

    pub fn with_default(default: Script) -> Self {
        Self {
            job_scoped: false,
            default,
            scripts: Mutex::new(HashMap::new()),
            opens: Mutex::new(HashMap::new()),
            writers: Mutex::new(HashMap::new()),
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn job_scoped(mut self, job_scoped: bool) -> Self {
        self.job_scoped = job_scoped;
        self
    }

    /// Script the given stream of the given task.
    pub fn script(&self, task: &Task, kind: StreamKind, script: Script) {
        let path = self.stream_path(task, kind);
        self.scripts.lock().unwrap().insert(path, script);
    }

    /// Number of open attempts on the given stream so far.
    pub fn open_attempts(&self, task: &Task, kind: StreamKind) -> u32 {
        let path = self.stream_path(task, kind);
        self.opens.lock().unwrap().get(&path).copied().unwrap_or(0)
    }

    /// Total open attempts across all paths.
    pub fn total_open_attempts(&self) -> u32 {
        self.opens.lock().unwrap().values().sum()
    }

    /// Streams handed out and not yet dropped.
    pub fn live_streams(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Writer half of the most recent `Live` stream opened on this path.
    pub fn take_writer(&self, task: &Task, kind: StreamKind) -> Option<DuplexStream> {
        let path = self.stream_path(task, kind);
        self.writers.lock().unwrap().remove(&path)
    }

    fn answer(&self, path: &Path) -> io::Result<BoxedStream> {
        let attempt = {
            let mut opens = self.opens.lock().unwrap();
            let count = opens.entry(path.to_path_buf()).or_insert(0);
            *count += 1;
            *count
        };

        let script = self
            .scripts
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .unwrap_or_else(|| self.default.clone());

        self.resolve(path, script, attempt)
    }

    fn resolve(&self, path: &Path, script: Script, attempt: u32) -> io::Result<BoxedStream> {
        match script {
            Script::Fail => Err(not_found(path)),
            Script::FailThen(n, _) if attempt <= n => Err(not_found(path)),
            Script::FailThen(_, then) => self.resolve(path, *then, attempt),
            Script::Bytes(bytes) => Ok(self.track(io::Cursor::new(bytes))),
            Script::Live => {
                let (reader, writer) = tokio::io::duplex(256 * 1024);
                self.writers
                    .lock()
                    .unwrap()
                    .insert(path.to_path_buf(), writer);
                Ok(self.track(reader))
            }
        }
    }

    fn track<R>(&self, inner: R) -> BoxedStream
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        self.live.fetch_add(1, Ordering::SeqCst);
        Box::new(Tracked {
            inner,
            live: Arc::clone(&self.live),
        })
    }
}

impl StreamSource for ScriptedSource {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn job_scoped(&self) -> bool {
        self.job_scoped
    }

    fn stream_path(&self, task: &Task, kind: StreamKind) -> PathBuf {
        task.identifier().as_path().join(kind.as_str())
    }

    fn open<'a>(&'a self, path: &'a Path) -> OpenFuture<'a> {
        let result = self.answer(path);
        Box::pin(async move { result })
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{} does not exist", path.display()))
}

/// Decrements the live-stream counter when the stream handle is dropped.
struct Tracked<R> {
    inner: R,
    live: Arc<AtomicUsize>,
}

impl<R: AsyncRead + Unpin> AsyncRead for Tracked<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl<R> Drop for Tracked<R> {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}
