//! Bluetooth adapter control through `bluetoothctl`

use std::sync::Arc;

use serde::Serialize;

use crate::error::ControlError;
use crate::runner::{CommandRunner, Invocation};

const BLUETOOTHCTL: &str = "/usr/bin/bluetoothctl";

/// A device known to the adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BluetoothDevice {
    pub address: String,
    pub name: String,
}

/// Parse `bluetoothctl devices` (`Device AA:BB:CC:DD:EE:FF Name`)
pub fn parse_devices(output: &str) -> Vec<BluetoothDevice> {
    output
        .lines()
        .filter_map(|line| {
            let rest = line.trim().strip_prefix("Device ")?;
            let (address, name) = match rest.split_once(' ') {
                Some((address, name)) => (address, name.trim()),
                None => (rest, ""),
            };
            if address.split(':').count() != 6 {
                return None;
            }
            Some(BluetoothDevice {
                address: address.to_string(),
                name: if name.is_empty() {
                    address.to_string()
                } else {
                    name.to_string()
                },
            })
        })
        .collect()
}

/// Thin client over `bluetoothctl`
#[derive(Debug, Clone)]
pub struct Bluetoothctl {
    runner: Arc<dyn CommandRunner>,
}

impl Bluetoothctl {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    pub async fn power(&self, on: bool) -> Result<(), ControlError> {
        self.toggle("power", on).await
    }

    pub async fn pairable(&self, on: bool) -> Result<(), ControlError> {
        self.toggle("pairable", on).await
    }

    pub async fn discoverable(&self, on: bool) -> Result<(), ControlError> {
        self.toggle("discoverable", on).await
    }

    /// Devices the adapter knows about
    pub async fn devices(&self) -> Result<Vec<BluetoothDevice>, ControlError> {
        let invocation = Invocation::new(BLUETOOTHCTL).arg("devices");
        let output = self.runner.run(&invocation).await?.check(&invocation)?;
        Ok(parse_devices(&output.stdout))
    }

    async fn toggle(&self, setting: &str, on: bool) -> Result<(), ControlError> {
        let invocation =
            Invocation::new(BLUETOOTHCTL).args([setting, if on { "on" } else { "off" }]);
        self.runner.run(&invocation).await?.check(&invocation)?;
        tracing::debug!(setting, on, "bluetooth adapter updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::CommandOutput;
    use crate::testing::ScriptedRunner;

    #[test]
    fn test_parse_devices() {
        let output = "Device 40:4E:36:11:22:33 Pixel 7\n\
                      Device F4:4E:FD:00:00:01\n\
                      [CHG] Controller B8:27:EB:00:00:00 Discoverable: yes\n\
                      Device not-an-address Junk\n";
        assert_eq!(
            parse_devices(output),
            vec![
                BluetoothDevice {
                    address: "40:4E:36:11:22:33".to_string(),
                    name: "Pixel 7".to_string(),
                },
                BluetoothDevice {
                    address: "F4:4E:FD:00:00:01".to_string(),
                    name: "F4:4E:FD:00:00:01".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_toggles() {
        let runner = ScriptedRunner::new();
        let bt = Bluetoothctl::new(Arc::new(runner.clone()));

        bt.power(true).await.unwrap();
        bt.discoverable(false).await.unwrap();

        assert_eq!(
            runner.command_lines(),
            vec![
                "/usr/bin/bluetoothctl power on".to_string(),
                "/usr/bin/bluetoothctl discoverable off".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_devices_error() {
        let runner = ScriptedRunner::new();
        runner.respond(
            "/usr/bin/bluetoothctl devices",
            CommandOutput::failed(1, "No default controller available"),
        );
        let bt = Bluetoothctl::new(Arc::new(runner));
        assert!(matches!(
            bt.devices().await,
            Err(ControlError::CommandFailed { .. })
        ));
    }
}
