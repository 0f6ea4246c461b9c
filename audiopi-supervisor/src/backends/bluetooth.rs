//! Bluetooth A2DP sink

use async_trait::async_trait;
use system_control::{Bluetoothctl, Systemctl};

use crate::backend::{Health, ProcessBackend};
use crate::error::BackendError;

const BLUETOOTH_UNIT: &str = "bluetooth";

/// Bluetooth source: the `bluetooth` unit plus adapter visibility.
///
/// Starting powers the adapter and makes it pairable and discoverable so
/// phones can connect; stopping hides it again and stops the unit.
#[derive(Debug, Clone)]
pub struct BluetoothBackend {
    systemctl: Systemctl,
    bluetooth: Bluetoothctl,
}

impl BluetoothBackend {
    pub fn new(systemctl: Systemctl, bluetooth: Bluetoothctl) -> Self {
        Self {
            systemctl,
            bluetooth,
        }
    }
}

#[async_trait]
impl ProcessBackend for BluetoothBackend {
    async fn start(&self) -> Result<(), BackendError> {
        self.systemctl.start(BLUETOOTH_UNIT).await?;
        self.bluetooth.power(true).await?;
        self.bluetooth.pairable(true).await?;
        self.bluetooth.discoverable(true).await?;
        Ok(())
    }

    async fn stop(&self) -> Result<(), BackendError> {
        // The adapter may already be gone with the unit; hiding it is best effort
        if let Err(err) = self.bluetooth.discoverable(false).await {
            tracing::warn!(error = %err, "could not hide bluetooth adapter");
        }
        self.systemctl.stop(BLUETOOTH_UNIT).await?;
        Ok(())
    }

    async fn health_check(&self) -> Health {
        match self.systemctl.is_active(BLUETOOTH_UNIT).await {
            Ok(status) if status.is_running() => Health::Healthy,
            Ok(status) => Health::Unhealthy(format!("unit {} is {}", BLUETOOTH_UNIT, status)),
            Err(err) => Health::Unhealthy(err.to_string()),
        }
    }

    fn describe(&self) -> String {
        "bluetooth adapter".to_string()
    }
}
