//! Control API for the audiopi daemon
//!
//! A warp server exposing the orchestration engine and host controls over
//! HTTP. Every response uses one envelope:
//!
//! ```json
//! { "ok": true,  "data": { ... } }
//! { "ok": false, "errorKind": "ConflictError", "errorMessage": "..." }
//! ```
//!
//! with the HTTP status following the error kind (404, 409, 504, 502, 400).
//! State changes go through `POST /api/intents`; committed changes stream
//! out of `GET /api/events` as server-sent events.

pub mod context;
pub mod error;
pub mod reply;
pub mod routes;
pub mod server;
pub mod settings;

pub use context::{default_services, ApiContext};
pub use error::{status_for, ApiError, ServerError};
pub use reply::ApiResult;
pub use routes::routes;
pub use server::ControlServer;
pub use settings::{Settings, SettingsError, SettingsStore, DEFAULT_DEVICE_NAME};
