//! Services managed as systemd units

use async_trait::async_trait;
use system_control::Systemctl;

use audiopi_state::SourceKind;

use crate::backend::{Health, ProcessBackend};
use crate::error::BackendError;

/// Unit driving a source kind on a stock Audio-Pi image
pub fn default_unit(kind: SourceKind) -> Option<&'static str> {
    match kind {
        SourceKind::Airplay => Some("shairport-sync"),
        SourceKind::Spotify => Some("raspotify"),
        SourceKind::Dlna => Some("gmediarender"),
        SourceKind::Bluetooth => Some("bluetooth"),
        SourceKind::LineIn => None,
    }
}

/// Unit for a local zone client
pub const ZONE_UNIT: &str = "snapclient";

/// A process that lives as a systemd unit
#[derive(Debug, Clone)]
pub struct SystemdUnitBackend {
    unit: String,
    systemctl: Systemctl,
}

impl SystemdUnitBackend {
    pub fn new(unit: impl Into<String>, systemctl: Systemctl) -> Self {
        Self {
            unit: unit.into(),
            systemctl,
        }
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }
}

#[async_trait]
impl ProcessBackend for SystemdUnitBackend {
    async fn start(&self) -> Result<(), BackendError> {
        self.systemctl.start(&self.unit).await?;
        Ok(())
    }

    async fn stop(&self) -> Result<(), BackendError> {
        self.systemctl.stop(&self.unit).await?;
        Ok(())
    }

    async fn health_check(&self) -> Health {
        match self.systemctl.is_active(&self.unit).await {
            Ok(status) if status.is_running() => Health::Healthy,
            Ok(status) => Health::Unhealthy(format!("unit {} is {}", self.unit, status)),
            Err(err) => Health::Unhealthy(err.to_string()),
        }
    }

    fn describe(&self) -> String {
        format!("systemd unit {}", self.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use system_control::testing::ScriptedRunner;
    use system_control::CommandOutput;

    #[tokio::test]
    async fn test_start_stop_issue_systemctl() {
        let runner = ScriptedRunner::new();
        let backend =
            SystemdUnitBackend::new("shairport-sync", Systemctl::new(Arc::new(runner.clone())));

        backend.start().await.unwrap();
        backend.stop().await.unwrap();

        assert_eq!(
            runner.command_lines(),
            vec![
                "/usr/bin/systemctl start shairport-sync",
                "/usr/bin/systemctl stop shairport-sync"
            ]
        );
    }

    #[tokio::test]
    async fn test_health_follows_is_active() {
        let runner = ScriptedRunner::new();
        runner.respond("/usr/bin/systemctl is-active", CommandOutput::ok("active\n"));
        let backend = SystemdUnitBackend::new("raspotify", Systemctl::new(Arc::new(runner.clone())));
        assert!(backend.health_check().await.is_healthy());

        runner.respond(
            "/usr/bin/systemctl is-active",
            CommandOutput {
                code: 3,
                stdout: "failed\n".into(),
                stderr: String::new(),
            },
        );
        assert_eq!(
            backend.health_check().await,
            Health::Unhealthy("unit raspotify is failed".into())
        );
    }

    #[test]
    fn test_default_units() {
        assert_eq!(default_unit(SourceKind::Airplay), Some("shairport-sync"));
        assert_eq!(default_unit(SourceKind::LineIn), None);
    }
}
