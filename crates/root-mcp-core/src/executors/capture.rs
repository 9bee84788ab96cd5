//! Dual-channel output capture around one blocking interpreter call.
//!
//! The embedded interpreter emits output through two independent surfaces.
//! Python code writes to `sys.stdout` / `sys.stderr`, which are redirectable
//! in-process. The C++ bridge (cling) and any other native code write straight
//! to file descriptors 1 and 2, bypassing Python entirely. Capturing only one
//! of the two silently loses output, so [`capture`] redirects both:
//!
//! 1. pending host output is flushed so it does not leak into the capture,
//! 2. descriptors 1 and 2 are duplicated, then pointed at private temp files,
//! 3. `sys.stdout` / `sys.stderr` are swapped for `io.StringIO` buffers,
//! 4. the operation runs (it may return an error value or panic),
//! 5. the managed buffers are flushed, read and the original streams restored,
//! 6. C stdio is flushed and descriptors 1 and 2 are restored from the saved
//!    duplicates, before the temp files are read back,
//! 7. the duplicates are closed and the temp files deleted.
//!
//! Both redirections are RAII guards: if anything between steps 2 and 6 fails
//! or unwinds, `Drop` puts the original descriptors and streams back. The
//! descriptor swap is process-wide, so callers must never run two captures at
//! the same time.
//!
//! The two channels are fused managed-first: `stdout = managed + os`. Perfect
//! interleaving is not recoverable once the bytes sit in two sinks; a fixed
//! order keeps the result deterministic.

use nix::errno::Errno;
use nix::unistd::dup2;
use pyo3::prelude::*;
use pyo3::types::PyModule;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};
use tempfile::NamedTempFile;

use crate::errors::CaptureError;

/// Value returned by the captured operation plus the fused output of both channels.
#[derive(Debug)]
pub struct Captured<T> {
    pub value: T,
    pub stdout: String,
    pub stderr: String,
}

/// Capture machinery failure, with the operation's value if it got to run.
#[derive(Debug)]
pub struct CaptureFailure<T> {
    pub error: CaptureError,
    pub value: Option<T>,
}

impl<T> From<CaptureError> for CaptureFailure<T> {
    fn from(error: CaptureError) -> Self {
        Self { error, value: None }
    }
}

/// Run `operation` once with both output channels captured.
///
/// The operation's own failure is part of `T` (typically a `PyResult`); an
/// `Err` from this function means the capture machinery itself failed.
pub fn capture<'py, T, F>(py: Python<'py>, operation: F) -> Result<Captured<T>, CaptureFailure<T>>
where
    F: FnOnce(Python<'py>) -> T,
{
    flush_host_streams(py);

    let descriptors = DescriptorRedirect::install()?;
    let managed = ManagedRedirect::install(py).map_err(CaptureError::from)?;

    let value = operation(py);

    // Descriptors are restored even when the managed half failed.
    let managed = managed.finish().map_err(CaptureError::from);
    let descriptors = descriptors.finish();

    match (managed, descriptors) {
        (Ok((managed_stdout, managed_stderr)), Ok((os_stdout, os_stderr))) => Ok(Captured {
            value,
            stdout: managed_stdout + &os_stdout,
            stderr: managed_stderr + &os_stderr,
        }),
        (Err(error), _) | (_, Err(error)) => Err(CaptureFailure {
            error,
            value: Some(value),
        }),
    }
}

fn flush_host_streams(py: Python<'_>) {
    if let Ok(sys) = py.import("sys") {
        for name in ["stdout", "stderr"] {
            if let Ok(stream) = sys.getattr(name) {
                if !stream.is_none() {
                    let _ = stream.call_method0("flush");
                }
            }
        }
    }
    let _ = io::stdout().flush();
    let _ = io::stderr().flush();
    flush_c_stdio();
}

fn flush_c_stdio() {
    // SAFETY: fflush(NULL) flushes every open output stream and takes no pointers we own.
    unsafe {
        libc::fflush(std::ptr::null_mut());
    }
}

fn duplicate(fd: BorrowedFd<'_>) -> Result<OwnedFd, CaptureError> {
    fd.try_clone_to_owned().map_err(|source| CaptureError::Duplicate {
        fd: fd.as_raw_fd(),
        source,
    })
}

fn redirect(source: RawFd, target: RawFd) -> io::Result<()> {
    loop {
        match dup2(source, target) {
            Ok(_) => return Ok(()),
            Err(Errno::EINTR) => continue,
            Err(errno) => return Err(io::Error::from(errno)),
        }
    }
}

fn sink(prefix: &str) -> Result<NamedTempFile, CaptureError> {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempfile()
        .map_err(CaptureError::Sink)
}

struct Redirection {
    target: RawFd,
    saved: OwnedFd,
    sink: NamedTempFile,
}

impl Redirection {
    fn read_back(&mut self) -> Result<String, CaptureError> {
        let file = self.sink.as_file_mut();
        file.seek(SeekFrom::Start(0)).map_err(CaptureError::Read)?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).map_err(CaptureError::Read)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// OS-level half of the capture: descriptors 1 and 2 pointed at temp files.
struct DescriptorRedirect {
    stdout: Redirection,
    stderr: Redirection,
    active: bool,
}

impl DescriptorRedirect {
    fn install() -> Result<Self, CaptureError> {
        let stdout_sink = sink("root-mcp-stdout-")?;
        let stderr_sink = sink("root-mcp-stderr-")?;

        // Both duplicates must exist before either descriptor is touched.
        let stdout = io::stdout();
        let stderr = io::stderr();
        let saved_stdout = duplicate(stdout.as_fd())?;
        let saved_stderr = duplicate(stderr.as_fd())?;

        let guard = Self {
            stdout: Redirection {
                target: stdout.as_raw_fd(),
                saved: saved_stdout,
                sink: stdout_sink,
            },
            stderr: Redirection {
                target: stderr.as_raw_fd(),
                saved: saved_stderr,
                sink: stderr_sink,
            },
            active: true,
        };

        for redirection in [&guard.stdout, &guard.stderr] {
            redirect(redirection.sink.as_file().as_raw_fd(), redirection.target).map_err(
                |source| CaptureError::Redirect {
                    fd: redirection.target,
                    source,
                },
            )?;
        }

        Ok(guard)
    }

    fn restore(&mut self) -> Result<(), CaptureError> {
        if !self.active {
            return Ok(());
        }
        flush_c_stdio();

        let mut first_error = None;
        for redirection in [&self.stdout, &self.stderr] {
            if let Err(source) = redirect(redirection.saved.as_raw_fd(), redirection.target) {
                first_error.get_or_insert(CaptureError::Restore {
                    fd: redirection.target,
                    source,
                });
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => {
                self.active = false;
                Ok(())
            }
        }
    }

    fn finish(mut self) -> Result<(String, String), CaptureError> {
        self.restore()?;
        let stdout = self.stdout.read_back()?;
        let stderr = self.stderr.read_back()?;
        Ok((stdout, stderr))
    }
}

impl Drop for DescriptorRedirect {
    fn drop(&mut self) {
        if let Err(err) = self.restore() {
            log::error!("Failed to restore standard descriptors after capture: {}", err);
        }
    }
}

struct ManagedStream<'py> {
    name: &'static str,
    original: Bound<'py, PyAny>,
    buffer: Bound<'py, PyAny>,
}

impl<'py> ManagedStream<'py> {
    fn new(sys: &Bound<'py, PyModule>, io: &Bound<'py, PyModule>, name: &'static str) -> PyResult<Self> {
        Ok(Self {
            name,
            original: sys.getattr(name)?,
            buffer: io.call_method0("StringIO")?,
        })
    }

    fn contents(&self) -> PyResult<String> {
        self.buffer.call_method0("flush")?;
        self.buffer.call_method0("getvalue")?.extract()
    }
}

/// Managed half of the capture: `sys.stdout` / `sys.stderr` swapped for `StringIO`.
struct ManagedRedirect<'py> {
    sys: Bound<'py, PyModule>,
    stdout: ManagedStream<'py>,
    stderr: ManagedStream<'py>,
    active: bool,
}

impl<'py> ManagedRedirect<'py> {
    fn install(py: Python<'py>) -> PyResult<Self> {
        let sys = py.import("sys")?;
        let io = py.import("io")?;
        let stdout = ManagedStream::new(&sys, &io, "stdout")?;
        let stderr = ManagedStream::new(&sys, &io, "stderr")?;

        let guard = Self {
            sys,
            stdout,
            stderr,
            active: true,
        };
        for stream in [&guard.stdout, &guard.stderr] {
            guard.sys.setattr(stream.name, &stream.buffer)?;
        }
        Ok(guard)
    }

    fn restore(&mut self) -> PyResult<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        let stdout = self.sys.setattr(self.stdout.name, &self.stdout.original);
        let stderr = self.sys.setattr(self.stderr.name, &self.stderr.original);
        stdout.and(stderr)
    }

    fn finish(mut self) -> PyResult<(String, String)> {
        let stdout = self.stdout.contents()?;
        let stderr = self.stderr.contents()?;
        self.restore()?;
        Ok((stdout, stderr))
    }
}

impl Drop for ManagedRedirect<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.restore() {
            log::error!("Failed to restore sys.stdout/sys.stderr after capture: {}", err);
        }
    }
}
