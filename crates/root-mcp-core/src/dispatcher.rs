//! Execution dispatcher between the async request loop and the blocking interpreter
//!
//! The transport runs on a cooperative async loop that must stay responsive
//! while a fragment executes, so every executor call is moved onto tokio's
//! blocking pool. Offloading is not the same as being safe to run in parallel:
//! a capture redirects descriptors 1 and 2 for the whole process, so executions
//! are serialized through a single gate. The gate's owned guard travels into
//! the blocking closure, which keeps the guarantee even if the awaiting request
//! is cancelled while its fragment is still running.

use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::executors::{CodeExecutor, ExecutionResult, Language};

/// `errorType` used when the executor panicked instead of returning a result.
pub const PANIC_ERROR_TAG: &str = "PanicException";

pub struct ExecutionDispatcher {
    executor: Arc<dyn CodeExecutor>,
    gate: Arc<Mutex<()>>,
    log_code: bool,
}

impl ExecutionDispatcher {
    pub fn new(executor: Arc<dyn CodeExecutor>) -> Self {
        Self {
            executor,
            gate: Arc::new(Mutex::new(())),
            log_code: true,
        }
    }

    /// Toggle the numbered listing of submitted code in debug logs.
    pub fn with_code_logging(mut self, enabled: bool) -> Self {
        self.log_code = enabled;
        self
    }

    pub async fn run_python(&self, code: String) -> ExecutionResult {
        self.dispatch(Language::Python, code).await
    }

    pub async fn run_cpp(&self, code: String) -> ExecutionResult {
        self.dispatch(Language::Cpp, code).await
    }

    /// Queue one execution behind any in flight and await its result.
    ///
    /// Log lines are only written while the gate is held, so they can never
    /// land in another execution's captured descriptors.
    pub async fn dispatch(&self, language: Language, code: String) -> ExecutionResult {
        let execution_id = Uuid::new_v4();

        let permit = self.gate.clone().lock_owned().await;
        if self.log_code {
            log::debug!("Executing {} code [{}]:\n{}", language, execution_id, number_lines(&code));
        }

        let executor = self.executor.clone();
        let joined = tokio::task::spawn_blocking(move || {
            let result = executor.execute(language, &code);
            (result, permit)
        })
        .await;

        let (result, _permit) = match joined {
            Ok((result, permit)) => (result, permit),
            Err(e) => {
                let result = if e.is_panic() {
                    ExecutionResult::failure(
                        String::new(),
                        String::new(),
                        format!("{} execution worker panicked: {}", language, panic_message(e.into_panic())),
                        PANIC_ERROR_TAG,
                    )
                } else {
                    ExecutionResult::failure(
                        String::new(),
                        String::new(),
                        format!("{} execution worker did not complete: {}", language, e),
                        "CancelledError",
                    )
                };
                // The worker released the gate while unwinding; take it back to log.
                (result, self.gate.clone().lock_owned().await)
            }
        };

        log_outcome(execution_id, language, &result);
        result
    }
}

fn number_lines(code: &str) -> String {
    code.split('\n')
        .enumerate()
        .map(|(i, line)| format!("{:3} | {}", i + 1, line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn log_outcome(execution_id: Uuid, language: Language, result: &ExecutionResult) {
    if result.ok {
        log::info!("✓ {} execution succeeded [{}]", language, execution_id);
    } else {
        log::warn!(
            "❌ {} execution failed [{}]: {} ({})",
            language,
            execution_id,
            result.error.as_deref().unwrap_or_default(),
            result.error_type.as_deref().unwrap_or_default()
        );
    }
    if !result.stdout.is_empty() {
        log::debug!("STDOUT [{}]:\n{}", execution_id, result.stdout);
    }
    if !result.stderr.is_empty() {
        log::debug!("STDERR [{}]:\n{}", execution_id, result.stderr);
    }
}
