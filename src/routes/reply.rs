use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

pub const JSON_UTF8: &str = "application/json; charset=utf-8";

/// Serialize `body` as JSON with the headers every API response carries:
/// an explicit UTF-8 content type and `cache-control: no-store`.
pub fn json_reply<T: Serialize>(status: StatusCode, body: T) -> Response {
    let bytes = match serde_json::to_vec(&body) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!("Failed to serialize response: {e}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    (
        status,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(JSON_UTF8)),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-store")),
        ],
        bytes,
    )
        .into_response()
}

/// `200 OK` JSON reply.
pub struct JsonReply<T>(pub T);

impl<T: Serialize> IntoResponse for JsonReply<T> {
    fn into_response(self) -> Response {
        json_reply(StatusCode::OK, self.0)
    }
}
