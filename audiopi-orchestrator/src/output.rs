//! Hardware side of a zone's volume

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// A mixer write that did not take
#[derive(Debug, Error)]
#[error("{0}")]
pub struct OutputError(pub String);

/// Applies a zone's volume and mute to real hardware, such as the local ALSA
/// mixer. Zones without an output are bookkeeping only (their client
/// applies volume itself).
#[async_trait]
pub trait ZoneOutput: Send + Sync + fmt::Debug {
    /// Make the hardware reflect `volume` (0..=100) and `muted`
    async fn apply(&self, volume: u8, muted: bool) -> Result<(), OutputError>;
}
