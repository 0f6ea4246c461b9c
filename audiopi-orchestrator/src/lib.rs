//! audiopi orchestrator
//!
//! Turns intents ("play Spotify", "kitchen to 40%") into ordered state
//! transitions. One task owns every write to the registries and drives the
//! supervisor, so activations never race and each intent's events are
//! published contiguously under its correlation id.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! use audiopi_orchestrator::{Engine, EngineConfig, Intent};
//! use audiopi_state::{EventBus, Source, SourceKind, SourceRegistry, ZoneRegistry};
//! use audiopi_supervisor::{RestartPolicy, Supervisor};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let bus = EventBus::default();
//! let sources = Arc::new(SourceRegistry::new(
//!     vec![Source::new("line-in", SourceKind::LineIn, "Line In")],
//!     bus.clone(),
//! ));
//! let zones = Arc::new(ZoneRegistry::new(Vec::new(), bus.clone()));
//! let (supervisor, observations) = Supervisor::new(RestartPolicy::default());
//!
//! let engine = Engine::spawn(
//!     EngineConfig::default(),
//!     sources,
//!     zones,
//!     supervisor,
//!     observations,
//!     HashMap::new(),
//! );
//!
//! let ack = engine
//!     .submit(Intent::ActivateSource { source: "line-in".into() })
//!     .await?;
//! println!("{} event(s) under {}", ack.events, ack.correlation_id);
//!
//! engine.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod intent;
pub mod output;

pub use config::EngineConfig;
pub use engine::{Engine, EngineHandle, ZoneOutputs};
pub use error::{OrchestrationError, Result};
pub use intent::{Ack, Intent, IntentRequest};
pub use output::{OutputError, ZoneOutput};
