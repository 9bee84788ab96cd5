mod common;

use common::{executor, standard_descriptors};
use root_mcp_core::executors::{CodeExecutor, ExecutionResult, ExecutorSettings, NamespaceMode};
use serial_test::serial;

#[test]
#[serial(descriptors)]
fn test_print_is_captured() {
    let executor = executor("fake_root_print", ExecutorSettings::default());
    let result = executor.run_python("print(\"hi\")");
    assert_eq!(result, ExecutionResult::success("hi\n", ""));
}

#[test]
#[serial(descriptors)]
fn test_empty_fragment_succeeds_silently() {
    let executor = executor("fake_root_empty", ExecutorSettings::default());
    assert_eq!(executor.run_python(""), ExecutionResult::success("", ""));
    assert_eq!(executor.run_python("x = 1"), ExecutionResult::success("", ""));
}

#[test]
#[serial(descriptors)]
fn test_raised_exception_is_classified() {
    let executor = executor("fake_root_raise", ExecutorSettings::default());
    let result = executor.run_python("raise ValueError(\"bad\")");

    assert!(!result.ok);
    assert_eq!(result.error.as_deref(), Some("bad"));
    assert_eq!(result.error_type.as_deref(), Some("ValueError"));
    assert!(result.stderr.contains("Traceback (most recent call last)"));
    assert!(result.stderr.contains("ValueError: bad"));
    assert!(!result.timed_out);
}

#[test]
#[serial(descriptors)]
fn test_output_before_exception_is_kept() {
    let executor = executor("fake_root_partial", ExecutorSettings::default());
    let result = executor.run_python("print(\"before\")\nimport sys\nsys.stderr.write(\"warn\\n\")\n{}['k']");

    assert!(!result.ok);
    assert_eq!(result.stdout, "before\n");
    assert!(result.stderr.starts_with("warn\n"));
    assert_eq!(result.error_type.as_deref(), Some("KeyError"));
    assert_eq!(result.error.as_deref(), Some("'k'"));
}

#[test]
#[serial(descriptors)]
fn test_syntax_error_is_classified() {
    let executor = executor("fake_root_syntax", ExecutorSettings::default());
    let result = executor.run_python("def broken(:\n    pass");
    assert!(!result.ok);
    assert_eq!(result.error_type.as_deref(), Some("SyntaxError"));
}

#[test]
#[serial(descriptors)]
fn test_state_persists_between_calls() {
    let executor = executor("fake_root_persist", ExecutorSettings::default());
    assert!(executor.run_python("counter = 41").ok);

    let result = executor.run_python("counter += 1\nprint(counter)");
    assert_eq!(result, ExecutionResult::success("42\n", ""));
}

#[test]
#[serial(descriptors)]
fn test_per_call_namespace_forgets_bindings() {
    let settings = ExecutorSettings {
        namespace: NamespaceMode::PerCall,
        ..ExecutorSettings::default()
    };
    let executor = executor("fake_root_per_call", settings);
    assert!(executor.run_python("counter = 41").ok);

    let result = executor.run_python("print(counter)");
    assert!(!result.ok);
    assert_eq!(result.error_type.as_deref(), Some("NameError"));
}

#[test]
#[serial(descriptors)]
fn test_namespace_is_prebound() {
    let executor = executor("fake_root_prebound", ExecutorSettings::default());
    let result = executor.run_python("print(__name__)\nprint(ROOT.gInterpreter is not None)");
    assert_eq!(result.stdout, "__root_mcp__\nTrue\n");
}

#[test]
#[serial(descriptors)]
fn test_managed_output_precedes_native_output() {
    let executor = executor("fake_root_fusion", ExecutorSettings::default());
    let result = executor.run_python(
        "import os, sys\nos.write(1, b\"B\")\nprint(\"A\", end=\"\")\nos.write(2, b\"D\")\nsys.stderr.write(\"C\")",
    );
    assert!(result.ok);
    assert_eq!(result.stdout, "AB");
    assert_eq!(result.stderr, "CD");
}

#[test]
#[serial(descriptors)]
fn test_descriptors_restored_after_success_and_failure() {
    let executor = executor("fake_root_descriptors", ExecutorSettings::default());
    let before = standard_descriptors();

    assert!(executor.run_python("import os\nos.write(1, b'x')").ok);
    assert_eq!(standard_descriptors(), before);

    assert!(!executor.run_python("import os\nos.write(2, b'y')\nraise RuntimeError('z')").ok);
    assert_eq!(standard_descriptors(), before);
}

#[test]
#[serial(descriptors)]
fn test_sys_streams_restored_after_failure() {
    use pyo3::prelude::*;

    let executor = executor("fake_root_streams", ExecutorSettings::default());
    let before = Python::with_gil(|py| py.import("sys").unwrap().getattr("stdout").unwrap().unbind());

    let result = executor.run_python("raise RuntimeError('boom')");
    assert!(!result.ok);

    Python::with_gil(|py| {
        let after = py.import("sys").unwrap().getattr("stdout").unwrap();
        assert!(after.is(before.bind(py)));
    });
}
