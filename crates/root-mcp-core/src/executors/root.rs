//! ROOT interpreter adapter.
//!
//! Python fragments run through the builtin `exec` against a namespace that has
//! `ROOT` pre-bound. C++ fragments go through cling via `ROOT.gInterpreter`,
//! first as a declaration and, if that raises, as a processed line. Both paths
//! run inside [`capture`] and always come back as an [`ExecutionResult`].

use pyo3::prelude::*;
use pyo3::sync::GILOnceCell;
use pyo3::types::{PyDict, PyString};
use serde::{Deserialize, Serialize};

use super::capture::{capture, CaptureFailure, Captured};
use super::{CodeExecutor, ExecutionResult};

/// `errorType` reported when cling rejects a C++ fragment.
pub const COMPILATION_ERROR_TAG: &str = "CompilationError";

/// `__name__` bound in the execution namespace.
pub const DEFAULT_MODULE_NAME: &str = "__root_mcp__";

pub fn default_error_markers() -> Vec<String> {
    vec!["error:".to_string(), "Error:".to_string(), "fatal error:".to_string()]
}

/// Lifetime of the Python namespace fragments execute in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamespaceMode {
    /// One namespace for the whole process; bindings survive between calls.
    #[default]
    Persistent,
    /// A fresh namespace for every call.
    PerCall,
}

#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub namespace: NamespaceMode,
    pub module_name: String,
    /// Substrings that mark cling diagnostics in captured stderr.
    pub error_markers: Vec<String>,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            namespace: NamespaceMode::default(),
            module_name: DEFAULT_MODULE_NAME.to_string(),
            error_markers: default_error_markers(),
        }
    }
}

/// Which cling entry point accepted the fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BridgeOutcome {
    Declared,
    Processed { status: i64 },
}

pub struct RootExecutor {
    root: Py<PyAny>,
    settings: ExecutorSettings,
    persistent_namespace: GILOnceCell<Py<PyDict>>,
}

impl RootExecutor {
    /// `root` is the interpreter's root object, normally the imported `ROOT` module.
    pub fn new(root: Py<PyAny>, settings: ExecutorSettings) -> Self {
        Self {
            root,
            settings,
            persistent_namespace: GILOnceCell::new(),
        }
    }

    fn fresh_namespace<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let namespace = PyDict::new(py);
        namespace.set_item("ROOT", self.root.bind(py))?;
        namespace.set_item("__name__", &self.settings.module_name)?;
        Ok(namespace)
    }

    fn namespace<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        match self.settings.namespace {
            NamespaceMode::PerCall => self.fresh_namespace(py),
            NamespaceMode::Persistent => self
                .persistent_namespace
                .get_or_try_init(py, || self.fresh_namespace(py).map(Bound::unbind))
                .map(|namespace| namespace.bind(py).clone()),
        }
    }

    fn run_python_in(&self, py: Python<'_>, code: &str) -> ExecutionResult {
        let namespace = match self.namespace(py) {
            Ok(namespace) => namespace,
            Err(err) => return python_failure(py, String::new(), String::new(), &err),
        };

        let captured = capture(py, |py| -> PyResult<()> {
            let exec = py.import("builtins")?.getattr("exec")?;
            exec.call1((code, &namespace))?;
            Ok(())
        });

        match captured {
            Err(failure) => capture_failure(py, failure),
            Ok(Captured { value: Ok(()), stdout, stderr }) => ExecutionResult::success(stdout, stderr),
            Ok(Captured { value: Err(err), stdout, stderr }) => python_failure(py, stdout, stderr, &err),
        }
    }

    fn run_cpp_in(&self, py: Python<'_>, code: &str) -> ExecutionResult {
        let captured = capture(py, |py| self.invoke_bridge(py, code));

        match captured {
            Err(failure) => capture_failure(py, failure),
            Ok(Captured { value: Err(err), stdout, stderr }) => python_failure(py, stdout, stderr, &err),
            Ok(Captured { value: Ok(outcome), stdout, stderr }) => self.classify_bridge(outcome, stdout, stderr),
        }
    }

    /// Declare first; only a raised declaration falls back to ProcessLine.
    fn invoke_bridge(&self, py: Python<'_>, code: &str) -> PyResult<BridgeOutcome> {
        let interpreter = self.root.bind(py).getattr("gInterpreter")?;
        match interpreter.call_method1("Declare", (code,)) {
            Ok(_) => Ok(BridgeOutcome::Declared),
            Err(_) => {
                let status: i64 = interpreter.call_method1("ProcessLine", (code,))?.extract()?;
                Ok(BridgeOutcome::Processed { status })
            }
        }
    }

    fn classify_bridge(&self, outcome: BridgeOutcome, stdout: String, stderr: String) -> ExecutionResult {
        if let BridgeOutcome::Processed { status } = outcome {
            if status != 0 {
                return ExecutionResult::failure(
                    stdout,
                    stderr,
                    format!("C++ execution returned non-zero status {}", status),
                    COMPILATION_ERROR_TAG,
                );
            }
        }

        if let Some(marker) = find_error_marker(&stderr, &self.settings.error_markers) {
            let error = format!("C++ compilation error detected in output (matched \"{}\")", marker);
            return ExecutionResult::failure(stdout, stderr, error, COMPILATION_ERROR_TAG);
        }

        ExecutionResult::success(stdout, stderr)
    }
}

impl CodeExecutor for RootExecutor {
    fn run_python(&self, code: &str) -> ExecutionResult {
        Python::with_gil(|py| self.run_python_in(py, code))
    }

    fn run_cpp(&self, code: &str) -> ExecutionResult {
        Python::with_gil(|py| self.run_cpp_in(py, code))
    }
}

/// First configured marker found in `text`, if any. Empty markers never match.
pub fn find_error_marker<'a>(text: &str, markers: &'a [String]) -> Option<&'a str> {
    markers
        .iter()
        .find(|marker| !marker.is_empty() && text.contains(marker.as_str()))
        .map(String::as_str)
}

/// The machinery failed; still say how the fragment itself ended, if it ran.
fn capture_failure<T>(py: Python<'_>, failure: CaptureFailure<PyResult<T>>) -> ExecutionResult {
    let CaptureFailure { error, value } = failure;
    let mut message = error.to_string();
    match value {
        Some(Ok(_)) => message.push_str("; the fragment itself completed"),
        Some(Err(err)) => {
            let raised = err
                .value(py)
                .str()
                .map(|text| text.to_string())
                .unwrap_or_default();
            message.push_str(&format!(
                "; the fragment itself raised {}: {}",
                exception_type(py, &err),
                raised
            ));
        }
        None => {}
    }
    ExecutionResult::failure(String::new(), String::new(), message, error.type_name())
}

fn python_failure(py: Python<'_>, stdout: String, mut stderr: String, err: &PyErr) -> ExecutionResult {
    let error_type = exception_type(py, err);
    let message = err
        .value(py)
        .str()
        .map(|message| message.to_string())
        .unwrap_or_default();
    stderr.push_str(&render_traceback(py, err, &error_type, &message));
    ExecutionResult::failure(stdout, stderr, message, error_type)
}

fn exception_type(py: Python<'_>, err: &PyErr) -> String {
    err.get_type(py)
        .name()
        .map(|name| name.to_string())
        .unwrap_or_else(|_| "Exception".to_string())
}

/// Same text `traceback.print_exc()` would print.
fn render_traceback(py: Python<'_>, err: &PyErr, error_type: &str, message: &str) -> String {
    let rendered = || -> PyResult<String> {
        let lines = py.import("traceback")?.call_method1(
            "format_exception",
            (err.get_type(py), err.value(py), err.traceback(py)),
        )?;
        PyString::new(py, "").call_method1("join", (lines,))?.extract()
    };
    rendered().unwrap_or_else(|_| format!("{}: {}\n", error_type, message))
}
