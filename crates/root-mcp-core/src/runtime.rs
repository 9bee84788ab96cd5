//! Process-wide lifecycle of the embedded ROOT interpreter
//!
//! ROOT keeps every histogram, canvas and tree it creates in its own global
//! registry, so the interpreter has to outlive any single request. This module
//! owns that state explicitly: [`RootRuntime::initialize`] boots the interpreter
//! once per process and stores the handle in a `OnceLock`, and executors are
//! built from it with the root handle injected rather than looked up ambiently.
//! There is no teardown; the interpreter is released when the process exits.

use pyo3::prelude::*;
use std::sync::OnceLock;

use crate::errors::GatewayError;
use crate::executors::{ExecutorSettings, RootExecutor};

static RUNTIME: OnceLock<RootRuntime> = OnceLock::new();

/// Creates the application object cling needs for graphics when none exists yet.
const ENSURE_APPLICATION: &str = "if (!gApplication) { new TApplication(\"root-mcp\", nullptr, nullptr); }";

#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    /// Python module exposing the interpreter (`ROOT` for PyROOT).
    pub module: String,
    /// Keep graphics enabled; `false` puts ROOT in batch mode.
    pub graphics: bool,
    /// Try `ROOT.EnableImplicitMT()`; absence or failure is not an error.
    pub implicit_mt: bool,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            module: "ROOT".to_string(),
            graphics: true,
            implicit_mt: true,
        }
    }
}

#[derive(Debug)]
pub struct RootRuntime {
    root: Py<PyAny>,
    options: RuntimeOptions,
    implicit_mt_enabled: bool,
}

impl RootRuntime {
    /// Initialize the process-wide runtime, or return the one already running.
    ///
    /// Options passed after the first successful call are ignored.
    pub fn initialize(options: RuntimeOptions) -> Result<&'static RootRuntime, GatewayError> {
        if let Some(runtime) = RUNTIME.get() {
            log::debug!("Interpreter runtime already initialized; ignoring new options");
            return Ok(runtime);
        }

        let runtime = Self::boot(options)?;
        if RUNTIME.set(runtime).is_err() {
            log::debug!("Interpreter runtime was initialized concurrently; keeping the first instance");
        }
        RUNTIME
            .get()
            .ok_or_else(|| GatewayError::InterpreterSetup("runtime missing after initialization".to_string()))
    }

    /// The runtime, if [`RootRuntime::initialize`] has succeeded.
    pub fn get() -> Option<&'static RootRuntime> {
        RUNTIME.get()
    }

    /// Boot a runtime without registering it as the process singleton.
    pub fn boot(options: RuntimeOptions) -> Result<Self, GatewayError> {
        log::info!(
            "Initializing interpreter module '{}' (graphics: {}, implicit MT: {})",
            options.module,
            options.graphics,
            options.implicit_mt
        );

        Python::with_gil(|py| {
            let root = py
                .import(options.module.as_str())
                .map_err(|e| GatewayError::InterpreterUnavailable {
                    module: options.module.clone(),
                    message: e.to_string(),
                })?
                .into_any();

            configure_graphics(&root, options.graphics)
                .map_err(|e| GatewayError::InterpreterSetup(format!("Failed to configure graphics mode: {}", e)))?;

            let implicit_mt_enabled = options.implicit_mt && enable_implicit_mt(&root);

            Ok(Self {
                root: root.unbind(),
                options,
                implicit_mt_enabled,
            })
        })
    }

    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    pub fn implicit_mt_enabled(&self) -> bool {
        self.implicit_mt_enabled
    }

    /// Build an executor bound to this runtime's interpreter.
    pub fn executor(&self, settings: ExecutorSettings) -> RootExecutor {
        let root = Python::with_gil(|py| self.root.clone_ref(py));
        RootExecutor::new(root, settings)
    }
}

fn configure_graphics(root: &Bound<'_, PyAny>, graphics: bool) -> PyResult<()> {
    root.getattr("gROOT")?.call_method1("SetBatch", (!graphics,))?;
    if graphics {
        root.getattr("gInterpreter")?
            .call_method1("ProcessLine", (ENSURE_APPLICATION,))?;
    }
    Ok(())
}

fn enable_implicit_mt(root: &Bound<'_, PyAny>) -> bool {
    match root.hasattr("EnableImplicitMT") {
        Ok(true) => match root.call_method0("EnableImplicitMT") {
            Ok(_) => {
                log::info!("Implicit multi-threading enabled");
                true
            }
            Err(e) => {
                log::debug!("EnableImplicitMT failed, continuing single-threaded: {}", e);
                false
            }
        },
        _ => {
            log::debug!("Interpreter has no EnableImplicitMT; continuing single-threaded");
            false
        }
    }
}
