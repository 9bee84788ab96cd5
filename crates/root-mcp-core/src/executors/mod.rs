//! Code execution against the embedded ROOT interpreter.
//!
//! Every execution, whatever its outcome, produces an [`ExecutionResult`]. The
//! record is the only contract the transport layer depends on: it is built once
//! by an executor, handed back through the dispatcher and serialized field by
//! field. Failures of the submitted code, of the C++ bridge and of the capture
//! machinery are all folded into it so that a failing fragment never takes the
//! host process or the client session down with it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod capture;
pub mod root;

pub use capture::{capture, CaptureFailure, Captured};
pub use root::{ExecutorSettings, NamespaceMode, RootExecutor, COMPILATION_ERROR_TAG};

/// Outcome of one execution call.
///
/// Invariants: `ok` implies `error` and `error_type` are `None`; `!ok` implies
/// `error` is `Some`. `stdout` and `stderr` are always present, possibly empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub ok: bool,
    pub stdout: String,
    pub stderr: String,
    pub error: Option<String>,
    pub error_type: Option<String>,
    /// Reserved; no timeout is enforced so this is always `false`.
    pub timed_out: bool,
}

impl ExecutionResult {
    pub fn success(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            ok: true,
            stdout: stdout.into(),
            stderr: stderr.into(),
            error: None,
            error_type: None,
            timed_out: false,
        }
    }

    pub fn failure(
        stdout: impl Into<String>,
        stderr: impl Into<String>,
        error: impl Into<String>,
        error_type: impl Into<String>,
    ) -> Self {
        Self {
            ok: false,
            stdout: stdout.into(),
            stderr: stderr.into(),
            error: Some(error.into()),
            error_type: Some(error_type.into()),
            timed_out: false,
        }
    }
}

/// Fragment language accepted by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Cpp,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Python => write!(f, "Python"),
            Language::Cpp => write!(f, "C++"),
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "python" | "python3" | "py" => Ok(Language::Python),
            "cpp" | "c++" | "cxx" | "cling" => Ok(Language::Cpp),
            other => Err(format!("Unsupported language: {}", other)),
        }
    }
}

/// Blocking execution seam between the dispatcher and an interpreter adapter.
///
/// Implementations are free to block for as long as the fragment runs. Callers
/// must not invoke two of these concurrently when the implementation redirects
/// process-wide descriptors; [`crate::dispatcher::ExecutionDispatcher`] enforces that.
pub trait CodeExecutor: Send + Sync {
    fn run_python(&self, code: &str) -> ExecutionResult;

    fn run_cpp(&self, code: &str) -> ExecutionResult;

    fn execute(&self, language: Language, code: &str) -> ExecutionResult {
        match language {
            Language::Python => self.run_python(code),
            Language::Cpp => self.run_cpp(code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_has_no_error_fields() {
        let result = ExecutionResult::success("hi\n", "");
        assert!(result.ok);
        assert!(result.error.is_none());
        assert!(result.error_type.is_none());
        assert!(!result.timed_out);
    }

    #[test]
    fn test_failure_carries_error_and_type() {
        let result = ExecutionResult::failure("", "trace", "bad", "ValueError");
        assert!(!result.ok);
        assert_eq!(result.error.as_deref(), Some("bad"));
        assert_eq!(result.error_type.as_deref(), Some("ValueError"));
        assert_eq!(result.stderr, "trace");
    }

    #[test]
    fn test_wire_field_names() {
        let value = serde_json::to_value(ExecutionResult::failure("o", "e", "bad", "ValueError")).unwrap();
        assert_eq!(
            value,
            json!({
                "ok": false,
                "stdout": "o",
                "stderr": "e",
                "error": "bad",
                "errorType": "ValueError",
                "timedOut": false
            })
        );

        let value = serde_json::to_value(ExecutionResult::success("", "")).unwrap();
        assert!(value["error"].is_null());
        assert!(value["errorType"].is_null());
    }

    #[test]
    fn test_language_parsing() {
        assert_eq!("python".parse::<Language>().unwrap(), Language::Python);
        assert_eq!("C++".parse::<Language>().unwrap(), Language::Cpp);
        assert_eq!("cling".parse::<Language>().unwrap(), Language::Cpp);
        assert!("fortran".parse::<Language>().is_err());
    }

    struct Echo;

    impl CodeExecutor for Echo {
        fn run_python(&self, code: &str) -> ExecutionResult {
            ExecutionResult::success(format!("py:{}", code), "")
        }

        fn run_cpp(&self, code: &str) -> ExecutionResult {
            ExecutionResult::success(format!("cpp:{}", code), "")
        }
    }

    #[test]
    fn test_execute_routes_by_language() {
        assert_eq!(Echo.execute(Language::Python, "x").stdout, "py:x");
        assert_eq!(Echo.execute(Language::Cpp, "y").stdout, "cpp:y");
    }
}
