//! Execution gateway for running Python and C++ fragments inside an embedded ROOT interpreter.
//!
//! A long-lived process embeds CPython with PyROOT loaded. Callers submit code
//! fragments; the gateway runs them against persistent interpreter state and
//! returns a structured [`ExecutionResult`] describing what happened.
//!
//! # Architecture Overview
//!
//! - **Result model**: the fixed six-field record returned for every execution
//! - **Dual-channel capture**: output written through Python's `sys.stdout` /
//!   `sys.stderr` and output written straight to descriptors 1 and 2 by native
//!   code are both collected, managed output first
//! - **Interpreter adapter**: Python `exec` and cling `Declare`/`ProcessLine`
//!   with outcome classification
//! - **Lifecycle**: one-time interpreter boot (graphics, application handle,
//!   implicit multi-threading) owned by a process singleton
//! - **Dispatcher**: offloads blocking executions with at most one in flight
//! - **Tools and configuration**: the `run_python` / `run_cpp` tool surface and
//!   YAML configuration with environment overrides

pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod executors;
pub mod runtime;
pub mod tools;

pub use config::{ConfigLoader, GatewayConfig};
pub use dispatcher::ExecutionDispatcher;
pub use errors::{CaptureError, GatewayError};
pub use executors::{CodeExecutor, ExecutionResult, Language, RootExecutor};
pub use runtime::{RootRuntime, RuntimeOptions};
pub use tools::{Tool, ToolFactory, ToolMetadata, ToolRegistry};
