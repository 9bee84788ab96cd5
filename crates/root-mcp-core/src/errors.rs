//! Error types for the execution gateway
//!
//! Two families live here. `GatewayError` covers failures of the gateway as a
//! service: configuration, tool arguments, interpreter startup. Those surface
//! to the operator or to the MCP peer as protocol errors. `CaptureError` covers
//! the descriptor and stream plumbing around a single execution; it never
//! crosses the dispatcher boundary and is folded into an `ExecutionResult`
//! by the interpreter adapter instead.

use pyo3::prelude::*;
use std::os::fd::RawFd;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Invalid arguments for '{tool_name}': {message}")]
    InvalidArguments { tool_name: String, message: String },
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Interpreter module '{module}' is not available: {message}")]
    InterpreterUnavailable { module: String, message: String },
    #[error("Interpreter setup failed: {0}")]
    InterpreterSetup(String),
    #[error("I/O error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        GatewayError::IoError(err.to_string())
    }
}

/// Failure of the dual-channel capture machinery itself (not of the user code).
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Could not create capture sink: {0}")]
    Sink(#[source] std::io::Error),
    #[error("Could not duplicate descriptor {fd}: {source}")]
    Duplicate {
        fd: RawFd,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not redirect descriptor {fd}: {source}")]
    Redirect {
        fd: RawFd,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not restore descriptor {fd}: {source}")]
    Restore {
        fd: RawFd,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not read captured output: {0}")]
    Read(#[source] std::io::Error),
    #[error("Managed stream redirection failed: {0}")]
    Managed(#[from] PyErr),
}

impl CaptureError {
    /// Classification tag reported in `ExecutionResult::error_type`.
    ///
    /// Descriptor and sink failures are reported the way the embedded Python
    /// host would name them (`OSError`); managed-stream failures carry the
    /// class name of the Python exception that triggered them.
    pub fn type_name(&self) -> String {
        match self {
            CaptureError::Managed(err) => Python::with_gil(|py| {
                err.get_type(py)
                    .name()
                    .map(|name| name.to_string())
                    .unwrap_or_else(|_| "Exception".to_string())
            }),
            _ => "OSError".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_failures_are_reported_as_os_errors() {
        let err = CaptureError::Restore {
            fd: 1,
            source: std::io::Error::from(nix::errno::Errno::EBADF),
        };
        assert_eq!(err.type_name(), "OSError");
        assert!(err.to_string().contains("restore descriptor 1"));
    }

    #[test]
    fn test_managed_failures_keep_python_class_name() {
        let err = CaptureError::Managed(pyo3::exceptions::PyAttributeError::new_err("no stdout"));
        assert_eq!(err.type_name(), "AttributeError");
    }

    #[test]
    fn test_io_error_converts_to_gateway_error() {
        let err: GatewayError = std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert!(matches!(err, GatewayError::IoError(ref m) if m.contains("missing")));
    }
}
