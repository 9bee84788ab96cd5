#![allow(dead_code)]

use pyo3::prelude::*;
use pyo3::types::PyModule;
use root_mcp_core::executors::{ExecutorSettings, RootExecutor};
use std::ffi::CString;

/// Stand-in for PyROOT. `gInterpreter` reports diagnostics the way cling does,
/// straight to descriptor 2, and honours a few comment directives:
/// `//echo <text>` writes text to descriptor 1 from Declare, `//process` makes
/// Declare raise so ProcessLine runs, `//status N` sets ProcessLine's return
/// value, `//slow` makes Declare take a moment and `//crash` makes both entry
/// points raise.
pub const FAKE_ROOT: &str = r#"
import os
import time

calls = []

class _ROOT:
    def SetBatch(self, flag):
        calls.append(("SetBatch", flag))

class _Interpreter:
    def Declare(self, code):
        calls.append(("Declare", code))
        if "//slow" in code:
            time.sleep(0.3)
        if "//process" in code or "//crash" in code:
            raise TypeError("Declare cannot handle statements")
        if "int x = ;" in code:
            os.write(2, b"input_line_8:1:9: error: expected expression\nint x = ;\n        ^\n")
            return False
        if "//echo " in code:
            os.write(1, code.split("//echo ", 1)[1].encode())
        return True

    def ProcessLine(self, code):
        calls.append(("ProcessLine", code))
        if "//crash" in code:
            raise RuntimeError("cling bridge crashed")
        os.write(1, b"processed\n")
        status = 0
        if "//status " in code:
            status = int(code.split("//status ", 1)[1].split()[0])
        return status

gROOT = _ROOT()
gInterpreter = _Interpreter()
"#;

/// Import `FAKE_ROOT` under `name` and register it in `sys.modules`.
pub fn install_fake_root(name: &str) -> Py<PyAny> {
    Python::with_gil(|py| {
        let code = CString::new(FAKE_ROOT).unwrap();
        let file = CString::new(format!("{}.py", name)).unwrap();
        let module_name = CString::new(name).unwrap();
        let module = PyModule::from_code(py, &code, &file, &module_name).unwrap();
        py.import("sys")
            .unwrap()
            .getattr("modules")
            .unwrap()
            .set_item(name, &module)
            .unwrap();
        module.into_any().unbind()
    })
}

pub fn executor(name: &str, settings: ExecutorSettings) -> RootExecutor {
    RootExecutor::new(install_fake_root(name), settings)
}

/// Entry points the fake interpreter saw, in order.
pub fn bridge_calls(name: &str) -> Vec<String> {
    Python::with_gil(|py| {
        let calls = py.import(name).unwrap().getattr("calls").unwrap();
        calls
            .try_iter()
            .unwrap()
            .map(|call| call.unwrap().get_item(0).unwrap().extract::<String>().unwrap())
            .collect()
    })
}

/// (device, inode) currently behind a descriptor.
pub fn descriptor_identity(fd: i32) -> (u64, u64) {
    let stat = nix::sys::stat::fstat(fd).unwrap_or_else(|e| panic!("fstat({}) failed: {}", fd, e));
    (stat.st_dev as u64, stat.st_ino as u64)
}

pub fn standard_descriptors() -> [(u64, u64); 2] {
    [descriptor_identity(1), descriptor_identity(2)]
}
