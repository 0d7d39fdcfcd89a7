// SPDX-FileCopyrightText: 2025 Contributors to the multivo project.
// SPDX-License-Identifier: Apache-2.0

//! Byte sinks and aliasing-aware slot handling.
//!
//! A [`Sink`] is a shared handle: cloning it yields another slot that writes
//! to the same destination. The dispatch loop uses [`SinkId`] to emit the
//! stream header once per destination while still writing every frame once
//! per slot.

use std::{
    collections::HashSet,
    fs::File,
    io::{BufWriter, ErrorKind, Write},
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};

use tracing::trace;

use crate::{Error, Result};

type Writer = Box<dyn Write + Send>;

/// Identity of the destination behind a [`Sink`].
///
/// Two sinks compare equal exactly when one is a clone of the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SinkId(usize);

struct SinkInner {
    name: String,
    writer: Mutex<Option<Writer>>,
}

/// Labelled, cloneable handle to a writable byte destination.
///
/// # Examples
///
/// ```no_run
/// use std::process::{Command, Stdio};
/// use multivo::Sink;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut encoder = Command::new("x265")
///     .args(["--y4m", "-o", "out.hevc", "-"])
///     .stdin(Stdio::piped())
///     .spawn()?;
/// let stdin = encoder.stdin.take().ok_or("no stdin")?;
/// let sink = Sink::new("x265", stdin);
/// // ... dispatch frames ...
/// sink.close()?; // the encoder sees EOF
/// encoder.wait()?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Sink {
    inner: Arc<SinkInner>,
}

impl Sink {
    /// Wraps `writer`. `name` labels the sink in logs and errors.
    pub fn new<W: Write + Send + 'static>(name: impl Into<String>, writer: W) -> Self {
        Self {
            inner: Arc::new(SinkInner {
                name: name.into(),
                writer: Mutex::new(Some(Box::new(writer))),
            }),
        }
    }

    /// Creates (or truncates) the file at `path` and wraps it in a buffered writer.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path.display().to_string();
        let file = File::create(path).map_err(|error| Error::sink(&name, error))?;
        Ok(Self::new(name, BufWriter::new(file)))
    }

    /// Wraps the process' standard output.
    pub fn stdout() -> Self {
        Self::new("<stdout>", std::io::stdout())
    }

    /// Identity of the underlying destination.
    pub fn id(&self) -> SinkId {
        SinkId(Arc::as_ptr(&self.inner) as *const () as usize)
    }

    /// Label given at construction.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns `false` once [`Self::close`] has been called on any clone.
    pub fn is_open(&self) -> bool {
        self.lock().map(|writer| writer.is_some()).unwrap_or(false)
    }

    /// Flushes and drops the underlying writer.
    ///
    /// Dropping the writer closes pipes and files, which is how an encoder
    /// reading from this sink learns that the stream ended. Closing an
    /// already closed sink is a no-op.
    pub fn close(&self) -> Result<()> {
        let writer = self.lock()?.take();
        if let Some(mut writer) = writer {
            writer.flush().map_err(|error| Error::sink(self.name(), error))?;
            trace!("Closed sink \"{}\"", self.name());
        }
        Ok(())
    }

    /// Writes all of `buf`.
    pub(crate) fn write_all(&self, buf: &[u8]) -> Result<()> {
        self.with_writer(|writer| writer.write_all(buf))
    }

    pub(crate) fn flush(&self) -> Result<()> {
        self.with_writer(|writer| writer.flush())
    }

    fn with_writer<T>(&self, op: impl FnOnce(&mut Writer) -> std::io::Result<T>) -> Result<T> {
        let mut guard = self.lock()?;
        let writer = guard.as_mut().ok_or_else(|| {
            Error::sink(
                self.name(),
                std::io::Error::new(ErrorKind::BrokenPipe, "sink is closed"),
            )
        })?;
        op(writer).map_err(|error| Error::sink(self.name(), error))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<Writer>>> {
        self.inner.writer.lock().map_err(|_| {
            Error::sink(
                self.name(),
                std::io::Error::other("sink lock poisoned by a panicking writer"),
            )
        })
    }
}

impl std::fmt::Debug for Sink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sink")
            .field("name", &self.inner.name)
            .field("id", &self.id())
            .finish()
    }
}

/// Returns the distinct destinations among `slots`, in first-seen order.
///
/// Absent slots are skipped and aliased slots collapse to their first
/// occurrence.
pub fn distinct(slots: &[Option<Sink>]) -> Vec<&Sink> {
    let mut seen = HashSet::new();
    slots
        .iter()
        .flatten()
        .filter(|sink| seen.insert(sink.id()))
        .collect()
}
