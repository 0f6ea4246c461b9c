//! Private OS control client for the audiopi daemon
//!
//! This crate wraps the handful of command line tools an Audio-Pi host is
//! driven through: `systemctl` for the audio daemons, `amixer` for the ALSA
//! mixer, `nmcli` for Wi-Fi and `bluetoothctl` for the adapter. Every call
//! goes through a [`CommandRunner`], so the daemon can run them for real
//! (optionally behind `sudo`) while tests script the outputs.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use system_control::{SystemControl, TokioCommandRunner};
//!
//! # async fn demo() -> Result<(), system_control::ControlError> {
//! let control = SystemControl::new(Arc::new(TokioCommandRunner::new(true)), 0, "PCM");
//!
//! let status = control.systemctl.is_active("shairport-sync").await?;
//! println!("airplay is {}", status);
//!
//! let volume = control.amixer.volume_percent().await?;
//! println!("master volume {}%", volume);
//! # Ok(())
//! # }
//! ```

mod error;
mod runner;

pub mod amixer;
pub mod bluetoothctl;
pub mod nmcli;
pub mod systemctl;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use amixer::{Amixer, MixerStatus};
pub use bluetoothctl::{BluetoothDevice, Bluetoothctl};
pub use error::ControlError;
pub use nmcli::{Nmcli, WifiNetwork};
pub use runner::{CommandOutput, CommandRunner, Invocation, TokioCommandRunner};
pub use systemctl::{Systemctl, UnitStatus};

use std::sync::Arc;

const REBOOT: &str = "/usr/sbin/reboot";

/// Bundle of every OS control client, sharing one runner
#[derive(Debug, Clone)]
pub struct SystemControl {
    pub systemctl: Systemctl,
    pub amixer: Amixer,
    pub nmcli: Nmcli,
    pub bluetooth: Bluetoothctl,
    runner: Arc<dyn CommandRunner>,
}

impl SystemControl {
    /// Create all clients on top of `runner`, with the master mixer at
    /// `card`/`control`.
    pub fn new(runner: Arc<dyn CommandRunner>, card: u32, control: impl Into<String>) -> Self {
        Self {
            systemctl: Systemctl::new(Arc::clone(&runner)),
            amixer: Amixer::new(Arc::clone(&runner), card, control),
            nmcli: Nmcli::new(Arc::clone(&runner)),
            bluetooth: Bluetoothctl::new(Arc::clone(&runner)),
            runner,
        }
    }

    /// The runner every client shares
    pub fn runner(&self) -> &Arc<dyn CommandRunner> {
        &self.runner
    }

    /// Reboot the host
    pub async fn reboot(&self) -> Result<(), ControlError> {
        let invocation = Invocation::new(REBOOT).privileged();
        self.runner.run(&invocation).await?.check(&invocation)?;
        tracing::warn!("reboot requested");
        Ok(())
    }
}
