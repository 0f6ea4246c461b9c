//! Device process supervisor for audiopi
//!
//! Every audio source and every local zone client is backed by some OS
//! process: a systemd unit such as `shairport-sync`, the Bluetooth adapter,
//! or a child the daemon spawns itself. This crate puts all of them behind
//! one [`ProcessBackend`] capability and supervises them uniformly:
//!
//! - a checked [`ProcessState`] machine per process
//! - a monitor task per running process polling `health_check`
//! - restarts with capped exponential backoff per [`RestartPolicy`],
//!   giving up with a single Failed observation once the limit is exceeded
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use audiopi_state::EntityId;
//! use audiopi_supervisor::{RestartPolicy, Supervisor, SystemdUnitBackend};
//! use system_control::{Systemctl, TokioCommandRunner};
//!
//! # async fn demo() -> Result<(), audiopi_supervisor::SupervisorError> {
//! let systemctl = Systemctl::new(Arc::new(TokioCommandRunner::new(true)));
//! let (supervisor, mut observations) = Supervisor::new(RestartPolicy::default());
//!
//! let airplay = EntityId::Source("airplay".into());
//! supervisor.register(
//!     airplay.clone(),
//!     Arc::new(SystemdUnitBackend::new("shairport-sync", systemctl)),
//! );
//! supervisor.start(&airplay).await?;
//!
//! while let Some(event) = observations.recv().await {
//!     println!("{} is {}", event.entity, event.state);
//! }
//! # Ok(())
//! # }
//! ```

mod backend;
pub mod backends;
mod error;
mod policy;
mod state;
mod supervisor;

#[cfg(feature = "test-support")]
pub mod testing;

pub use backend::{Health, ProcessBackend};
pub use backends::{default_unit, BluetoothBackend, CommandBackend, SystemdUnitBackend, ZONE_UNIT};
pub use error::{BackendError, Result, SupervisorError};
pub use policy::RestartPolicy;
pub use state::ProcessState;
pub use supervisor::{ProcessHandle, Supervisor, SupervisorEvent};
