//! # audiopi
//!
//! The multiroom audio daemon for the Audio-Pi image. It owns the source
//! and zone registries, supervises the receiver and zone client processes
//! and serves the control API.
//!
//! Most of the work happens in the library crates; this crate loads the
//! [`DaemonConfig`] and wires everything together in [`Daemon`].
//!
//! ```no_run
//! # async fn example() -> anyhow::Result<()> {
//! let config = audiopi::DaemonConfig::load(None)?;
//! audiopi::daemon::run(&config).await
//! # }
//! ```

pub mod config;
pub mod daemon;

pub use config::{ConfigError, DaemonConfig, ProcessSpec, SourceEntry, ZoneEntry};
pub use daemon::{AmixerOutput, Daemon};
