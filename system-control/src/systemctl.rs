//! systemd unit control

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::error::ControlError;
use crate::runner::{CommandRunner, Invocation};

const SYSTEMCTL: &str = "/usr/bin/systemctl";

/// `systemctl is-active` result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitStatus {
    Active,
    Inactive,
    Activating,
    Deactivating,
    Failed,
    Unknown,
}

impl UnitStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "active" | "reloading" => UnitStatus::Active,
            "inactive" => UnitStatus::Inactive,
            "activating" => UnitStatus::Activating,
            "deactivating" => UnitStatus::Deactivating,
            "failed" => UnitStatus::Failed,
            _ => UnitStatus::Unknown,
        }
    }

    /// Whether the unit is up or on its way up
    pub fn is_running(&self) -> bool {
        matches!(self, UnitStatus::Active | UnitStatus::Activating)
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnitStatus::Active => "active",
            UnitStatus::Inactive => "inactive",
            UnitStatus::Activating => "activating",
            UnitStatus::Deactivating => "deactivating",
            UnitStatus::Failed => "failed",
            UnitStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Thin client over `systemctl`
#[derive(Debug, Clone)]
pub struct Systemctl {
    runner: Arc<dyn CommandRunner>,
}

impl Systemctl {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    pub async fn start(&self, unit: &str) -> Result<(), ControlError> {
        self.action(&["start", unit]).await
    }

    pub async fn stop(&self, unit: &str) -> Result<(), ControlError> {
        self.action(&["stop", unit]).await
    }

    pub async fn restart(&self, unit: &str) -> Result<(), ControlError> {
        self.action(&["restart", unit]).await
    }

    /// `enable --now`
    pub async fn enable_now(&self, unit: &str) -> Result<(), ControlError> {
        self.action(&["enable", "--now", unit]).await
    }

    /// `disable --now`
    pub async fn disable_now(&self, unit: &str) -> Result<(), ControlError> {
        self.action(&["disable", "--now", unit]).await
    }

    /// Current activity of `unit`.
    ///
    /// `is-active` exits non-zero for anything but active, so the exit code
    /// is ignored and only stdout is interpreted.
    pub async fn is_active(&self, unit: &str) -> Result<UnitStatus, ControlError> {
        let invocation = Invocation::new(SYSTEMCTL).args(["is-active", unit]);
        let output = self.runner.run(&invocation).await?;
        Ok(UnitStatus::parse(&output.stdout))
    }

    /// Raw `is-enabled` state (`enabled`, `disabled`, `masked`, ...)
    pub async fn is_enabled(&self, unit: &str) -> Result<String, ControlError> {
        let invocation = Invocation::new(SYSTEMCTL).args(["is-enabled", unit]);
        let output = self.runner.run(&invocation).await?;
        let state = output.stdout.trim();
        Ok(if state.is_empty() {
            "unknown".to_string()
        } else {
            state.to_string()
        })
    }

    async fn action(&self, args: &[&str]) -> Result<(), ControlError> {
        let invocation = Invocation::new(SYSTEMCTL)
            .args(args.iter().copied())
            .privileged();
        self.runner.run(&invocation).await?.check(&invocation)?;
        tracing::debug!(command = %invocation, "systemctl ok");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::CommandOutput;
    use crate::testing::ScriptedRunner;
    use rstest::rstest;

    #[rstest]
    #[case("active\n", UnitStatus::Active)]
    #[case("inactive", UnitStatus::Inactive)]
    #[case("activating", UnitStatus::Activating)]
    #[case("failed\n", UnitStatus::Failed)]
    #[case("", UnitStatus::Unknown)]
    #[case("bogus", UnitStatus::Unknown)]
    fn test_unit_status_parse(#[case] raw: &str, #[case] expected: UnitStatus) {
        assert_eq!(UnitStatus::parse(raw), expected);
    }

    #[tokio::test]
    async fn test_start_is_privileged() {
        let runner = ScriptedRunner::new();
        let systemctl = Systemctl::new(Arc::new(runner.clone()));

        systemctl.start("snapclient").await.unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].privileged);
        assert_eq!(calls[0].to_string(), "/usr/bin/systemctl start snapclient");
    }

    #[tokio::test]
    async fn test_failed_stop_surfaces_stderr() {
        let runner = ScriptedRunner::new();
        runner.respond(
            "/usr/bin/systemctl stop",
            CommandOutput::failed(5, "Unit raspotify.service not loaded."),
        );
        let systemctl = Systemctl::new(Arc::new(runner));

        let err = systemctl.stop("raspotify").await.unwrap_err();
        assert!(err.to_string().contains("not loaded"));
    }

    #[tokio::test]
    async fn test_is_active_ignores_exit_code() {
        let runner = ScriptedRunner::new();
        runner.respond(
            "/usr/bin/systemctl is-active",
            CommandOutput {
                code: 3,
                stdout: "inactive\n".to_string(),
                stderr: String::new(),
            },
        );
        let systemctl = Systemctl::new(Arc::new(runner.clone()));

        let status = systemctl.is_active("shairport-sync").await.unwrap();
        assert_eq!(status, UnitStatus::Inactive);
        assert!(!runner.calls()[0].privileged);
    }
}
