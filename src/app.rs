use axum::Router;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::AppConfig;
use crate::routes::{signup_routes, system_routes};
use crate::state::app::AppState;

/// Build the complete Axum application:
/// - /signups, /subscribe  (counter and signup recording)
/// - /system               (alive + version)
///
/// `cfg` is passed to /system/version so the server can expose its version.
pub fn build_app(state: AppState, cfg: AppConfig) -> Router {
    Router::new()
        .merge(signup_routes::routes(state))

        // /system/*
        .nest("/system", system_routes::routes(cfg))

        // Logging middleware
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}
