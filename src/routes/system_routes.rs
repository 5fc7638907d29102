use axum::{
    extract::State,
    routing::get,
    Router,
};
use serde_json::json;

use crate::config::AppConfig;
use crate::routes::reply::JsonReply;

pub fn routes(config: AppConfig) -> Router {
    Router::new()
        .route("/alive", get(is_alive))
        .route("/version", get(version))
        .with_state(config)
}

/// GET /system/alive
async fn is_alive() -> &'static str {
    "OK"
}

/// GET /system/version
async fn version(State(config): State<AppConfig>) -> JsonReply<serde_json::Value> {
    JsonReply(json!({
        "version": config.server_version
    }))
}
