//! The `{ ok, data }` / `{ ok, errorKind, errorMessage }` envelope

use serde::Serialize;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::Reply;

use audiopi_state::ErrorKind;

use crate::error::ApiError;

/// Body of every API response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResult<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl<T: Serialize> ApiResult<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error_kind: None,
            error_message: None,
        }
    }
}

impl ApiResult<()> {
    pub fn failure(err: &ApiError) -> Self {
        Self {
            ok: false,
            data: None,
            error_kind: Some(err.kind),
            error_message: Some(err.message.clone()),
        }
    }
}

/// 200 with `data`
pub fn ok<T: Serialize>(data: T) -> Response {
    warp::reply::json(&ApiResult::success(data)).into_response()
}

/// Error envelope with the status matching its kind
pub fn error(err: ApiError) -> Response {
    warp::reply::with_status(warp::reply::json(&ApiResult::failure(&err)), err.status())
        .into_response()
}

/// Render a handler outcome
pub fn respond<T: Serialize>(result: Result<T, ApiError>) -> Response {
    match result {
        Ok(data) => ok(data),
        Err(err) => {
            if err.status() == StatusCode::BAD_GATEWAY || err.status() == StatusCode::GATEWAY_TIMEOUT {
                tracing::warn!(kind = %err.kind, error = %err.message, "request failed");
            } else {
                tracing::debug!(kind = %err.kind, error = %err.message, "request rejected");
            }
            error(err)
        }
    }
}
