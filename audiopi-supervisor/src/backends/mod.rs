//! Backends for each wrapped technology

mod bluetooth;
mod command;
mod systemd;

pub use bluetooth::BluetoothBackend;
pub use command::CommandBackend;
pub use systemd::{default_unit, SystemdUnitBackend, ZONE_UNIT};
