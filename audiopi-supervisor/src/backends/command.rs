//! Child processes spawned directly by the daemon

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use crate::backend::{Health, ProcessBackend};
use crate::error::BackendError;

/// A program the daemon runs itself, such as an `alsaloop` line-in bridge
/// or a per-zone `snapclient` instance.
///
/// Health is "the child has not exited".
#[derive(Debug)]
pub struct CommandBackend {
    program: String,
    args: Vec<String>,
    child: Mutex<Option<Child>>,
}

impl CommandBackend {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            child: Mutex::new(None),
        }
    }

    /// Process id of the running child
    pub async fn pid(&self) -> Option<u32> {
        self.child.lock().await.as_ref().and_then(Child::id)
    }
}

#[async_trait]
impl ProcessBackend for CommandBackend {
    async fn start(&self) -> Result<(), BackendError> {
        let mut slot = self.child.lock().await;
        if let Some(child) = slot.as_mut() {
            if matches!(child.try_wait(), Ok(None)) {
                return Ok(());
            }
        }

        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| BackendError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        tracing::debug!(program = %self.program, pid = ?child.id(), "child spawned");
        *slot = Some(child);
        Ok(())
    }

    async fn stop(&self) -> Result<(), BackendError> {
        let Some(mut child) = self.child.lock().await.take() else {
            return Ok(());
        };
        if let Ok(Some(_)) = child.try_wait() {
            return Ok(());
        }
        child
            .kill()
            .await
            .map_err(|err| BackendError::Other(format!("failed to kill {}: {}", self.program, err)))
    }

    async fn health_check(&self) -> Health {
        let mut slot = self.child.lock().await;
        match slot.as_mut() {
            None => Health::Unhealthy("not running".into()),
            Some(child) => match child.try_wait() {
                Ok(None) => Health::Healthy,
                Ok(Some(status)) => Health::Unhealthy(format!("{} exited with {}", self.program, status)),
                Err(err) => Health::Unhealthy(err.to_string()),
            },
        }
    }

    fn describe(&self) -> String {
        if self.args.is_empty() {
            format!("command {}", self.program)
        } else {
            format!("command {} {}", self.program, self.args.join(" "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_long_running_child() {
        let backend = CommandBackend::new("sleep", vec!["30".into()]);
        assert!(!backend.health_check().await.is_healthy());

        backend.start().await.unwrap();
        assert!(backend.health_check().await.is_healthy());
        assert!(backend.pid().await.is_some());

        backend.stop().await.unwrap();
        assert!(!backend.health_check().await.is_healthy());
        // stopping twice is fine
        backend.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_exited_child_is_unhealthy() {
        let backend = CommandBackend::new("true", vec![]);
        backend.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        match backend.health_check().await {
            Health::Unhealthy(reason) => assert!(reason.contains("exited")),
            Health::Healthy => panic!("child should have exited"),
        }
    }

    #[tokio::test]
    async fn test_missing_program() {
        let backend = CommandBackend::new("/nonexistent/alsaloop", vec![]);
        assert!(matches!(
            backend.start().await,
            Err(BackendError::Spawn { .. })
        ));
    }
}
