//! Test doubles.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use fnhost_common::RuntimeError;
use fnhost_core::{FunctionInvoker, Invocation};

/// Records every invocation. `"fail"` fails, `"ghost"` is unknown, anything
/// else prints `"<name> ran"`.
#[derive(Debug, Default)]
pub struct Recorder {
    calls: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl FunctionInvoker for Recorder {
    async fn invoke(&self, name: &str) -> Result<Invocation, RuntimeError> {
        self.calls.lock().push(name.to_string());
        match name {
            "fail" => Err(RuntimeError::execution(name, "exit status 1", "boom\n")),
            "ghost" => Err(RuntimeError::function_not_found(name)),
            _ => Ok(Invocation::new(format!("{name} ran"), Duration::ZERO)),
        }
    }
}
