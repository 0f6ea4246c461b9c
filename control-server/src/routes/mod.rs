//! Route table for the control API
//!
//! | Route | Handler |
//! |-------|---------|
//! | `GET /api/sources`, `GET /api/sources/{id}` | [`orchestration`] |
//! | `GET /api/zones`, `GET /api/zones/{id}`, `GET /api/groups` | [`orchestration`] |
//! | `GET /api/snapshot`, `POST /api/intents` | [`orchestration`] |
//! | `GET /api/events`, `GET /api/events/history` | [`events`] |
//! | `GET /api/state`, `POST /api/volume/{value}` | [`system`] |
//! | `GET /api/wifi/scan`, `POST /api/wifi/connect` | [`system`] |
//! | `GET /api/bluetooth/devices`, `POST /api/bluetooth/{setting}/{on,off}` | [`system`] |
//! | `POST /api/service/{name}/{action}`, `POST /api/multiroom/{mode}` | [`system`] |
//! | `POST /api/device-name`, `POST /api/reboot` | [`system`] |

use std::convert::Infallible;

use warp::filters::body::BodyDeserializeError;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use crate::context::ApiContext;
use crate::error::ApiError;
use crate::reply::{self, ApiResult};

pub mod events;
pub mod orchestration;
pub mod system;

/// Largest JSON body accepted
pub const MAX_BODY_BYTES: u64 = 16 * 1024;

/// The full API, with rejections rendered as error envelopes
pub fn routes(
    ctx: ApiContext,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone + Send + Sync + 'static {
    orchestration::routes(ctx.clone())
        .or(events::routes(ctx.clone()))
        .unify()
        .or(system::routes(ctx))
        .unify()
        .recover(handle_rejection)
        .unify()
        .with(warp::trace::request())
}

pub(crate) fn with_context(
    ctx: ApiContext,
) -> impl Filter<Extract = (ApiContext,), Error = Infallible> + Clone {
    warp::any().map(move || ctx.clone())
}

/// JSON body of at most [`MAX_BODY_BYTES`]
pub(crate) fn json_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: serde::de::DeserializeOwned + Send,
{
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

/// Convert rejections into the error envelope
pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    if err.is_not_found() {
        return Ok(reply::error(ApiError::not_found("No such route")));
    }
    if let Some(e) = err.find::<BodyDeserializeError>() {
        return Ok(reply::error(ApiError::validation(format!("Invalid body: {}", e))));
    }
    if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        return Ok(reply::error(ApiError::validation(e.to_string())));
    }
    if let Some(e) = err.find::<warp::reject::InvalidHeader>() {
        return Ok(reply::error(ApiError::validation(e.to_string())));
    }
    if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        return Ok(reply::error(ApiError::validation(format!(
            "Body larger than {} bytes",
            MAX_BODY_BYTES
        ))));
    }
    if err.find::<warp::reject::LengthRequired>().is_some() {
        return Ok(reply::error(ApiError::validation("Content-Length required")));
    }
    if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        return Ok(reply::error(ApiError::validation("Expected application/json")));
    }
    if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        let body = ApiResult::failure(&ApiError::validation("Method not allowed"));
        return Ok(
            warp::reply::with_status(warp::reply::json(&body), StatusCode::METHOD_NOT_ALLOWED)
                .into_response(),
        );
    }

    tracing::error!(rejection = ?err, "unhandled rejection");
    let body = ApiResult::failure(&ApiError::new(
        audiopi_state::ErrorKind::ProcessFailure,
        "Internal server error",
    ));
    Ok(
        warp::reply::with_status(warp::reply::json(&body), StatusCode::INTERNAL_SERVER_ERROR)
            .into_response(),
    )
}
