//! The capability every supervised technology implements

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

use crate::error::BackendError;

/// Result of one liveness probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum Health {
    Healthy,
    Unhealthy(String),
}

impl Health {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Health::Healthy)
    }
}

/// Start/stop/probe contract for one underlying OS process or service.
///
/// The supervisor serializes calls per entity; implementations never see
/// `start` and `stop` concurrently for the same process.
#[async_trait]
pub trait ProcessBackend: Send + Sync + fmt::Debug {
    /// Bring the process up. Starting an already running process succeeds.
    async fn start(&self) -> Result<(), BackendError>;

    /// Bring the process down. Stopping a stopped process succeeds.
    async fn stop(&self) -> Result<(), BackendError>;

    /// Probe liveness
    async fn health_check(&self) -> Health;

    /// Human readable description, e.g. `systemd unit shairport-sync`
    fn describe(&self) -> String;
}
