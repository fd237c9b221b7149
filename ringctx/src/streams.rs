//! Standard I/O stream handles.
//!
//! [`InStream`] and [`OutStream`] are cheap, cloneable handles around a shared
//! reader or writer. Holding a handle never closes the stream behind it.

use std::fmt;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Shared readable stream.
#[derive(Clone)]
pub struct InStream {
    inner: Arc<Mutex<dyn Read + Send>>,
}

impl InStream {
    pub fn new<R: Read + Send + 'static>(reader: R) -> Self {
        Self {
            inner: Arc::new(Mutex::new(reader)),
        }
    }

    /// The process standard input.
    pub fn stdin() -> Self {
        Self::new(io::stdin())
    }

    /// A stream that is always at end of input.
    pub fn empty() -> Self {
        Self::new(io::empty())
    }

    /// Read everything left in the stream into a string.
    pub fn read_to_string(&self) -> io::Result<String> {
        let mut buf = String::new();
        self.lock().read_to_string(&mut buf)?;
        Ok(buf)
    }

    /// Return true when both handles point at the same stream.
    pub fn same(&self, other: &InStream) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn lock(&self) -> MutexGuard<'_, dyn Read + Send + 'static> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Read for InStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.lock().read(buf)
    }
}

impl Read for &InStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.lock().read(buf)
    }
}

impl fmt::Debug for InStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InStream").finish_non_exhaustive()
    }
}

/// Shared writable stream.
#[derive(Clone)]
pub struct OutStream {
    inner: Arc<Mutex<dyn Write + Send>>,
}

impl OutStream {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(writer)),
        }
    }

    /// The process standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// The process standard error.
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    /// A stream discarding everything written to it.
    pub fn sink() -> Self {
        Self::new(io::sink())
    }

    /// Return true when both handles point at the same stream.
    pub fn same(&self, other: &OutStream) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn lock(&self) -> MutexGuard<'_, dyn Write + Send + 'static> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Write for OutStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.lock().write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock().flush()
    }
}

impl Write for &OutStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.lock().write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock().flush()
    }
}

impl fmt::Debug for OutStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutStream").finish_non_exhaustive()
    }
}

/// Access to a program's standard streams.
pub trait Streams {
    fn stdin(&self) -> InStream;
    fn stdout(&self) -> OutStream;
    fn stderr(&self) -> OutStream;
}

/// The three standard streams of a program.
#[derive(Debug, Clone)]
pub struct StdIo {
    stdin: InStream,
    stdout: OutStream,
    stderr: OutStream,
}

impl StdIo {
    pub fn new(stdin: InStream, stdout: OutStream, stderr: OutStream) -> Self {
        Self {
            stdin,
            stdout,
            stderr,
        }
    }

    pub fn with_stdin(mut self, stdin: InStream) -> Self {
        self.stdin = stdin;
        self
    }

    pub fn with_stdout(mut self, stdout: OutStream) -> Self {
        self.stdout = stdout;
        self
    }

    pub fn with_stderr(mut self, stderr: OutStream) -> Self {
        self.stderr = stderr;
        self
    }
}

/// Binds the process standard streams.
impl Default for StdIo {
    fn default() -> Self {
        Self::new(InStream::stdin(), OutStream::stdout(), OutStream::stderr())
    }
}

impl Streams for StdIo {
    fn stdin(&self) -> InStream {
        self.stdin.clone()
    }

    fn stdout(&self) -> OutStream {
        self.stdout.clone()
    }

    fn stderr(&self) -> OutStream {
        self.stderr.clone()
    }
}
