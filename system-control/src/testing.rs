//! Scripted [`CommandRunner`] for tests

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::ControlError;
use crate::runner::{CommandOutput, CommandRunner, Invocation};

/// Runner that records every invocation and answers from a script.
///
/// Responses are matched by prefix against `"<program> <args...>"`; the
/// most recently added matching rule wins. Unmatched calls succeed with
/// empty output.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRunner {
    rules: Arc<Mutex<Vec<(String, CommandOutput)>>>,
    calls: Arc<Mutex<Vec<Invocation>>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer calls starting with `prefix` with `output`
    pub fn respond(&self, prefix: impl Into<String>, output: CommandOutput) -> &Self {
        self.rules
            .lock()
            .unwrap()
            .push((prefix.into(), output));
        self
    }

    /// Every invocation seen so far
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    /// Invocations rendered as command lines
    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(ToString::to_string).collect()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, ControlError> {
        self.calls.lock().unwrap().push(invocation.clone());
        let line = invocation.to_string();
        let rules = self.rules.lock().unwrap();
        Ok(rules
            .iter()
            .rev()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_default())
    }
}
