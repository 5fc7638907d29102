use axum::{extract::State, routing::{get, post}, Router};
use serde::Serialize;

use crate::errors::AppError;
use crate::routes::reply::JsonReply;
use crate::routes::submission::EmailSubmission;
use crate::services::counter::Count;
use crate::services::signup_service::SignupOutcome;
use crate::state::app::AppState;

#[derive(Debug, Serialize)]
pub struct CounterBody {
    pub value: Count,
}

/// Build the signup routes: /signups and /subscribe
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/signups", get(get_signups).post(bump_signups))
        .route("/subscribe", post(subscribe))
        .with_state(state)
}

//
// ─────────────────────────────────────────────────────────────
// GET /signups
// Current counter value
// ─────────────────────────────────────────────────────────────
//
async fn get_signups(
    State(state): State<AppState>,
) -> Result<JsonReply<CounterBody>, AppError>
{
    let value = state.counter.read().await?;
    Ok(JsonReply(CounterBody { value }))
}

//
// ─────────────────────────────────────────────────────────────
// POST /signups
// Increment by one, no identity attached
// ─────────────────────────────────────────────────────────────
//
async fn bump_signups(
    State(state): State<AppState>,
) -> Result<JsonReply<CounterBody>, AppError>
{
    let value = state.counter.increment().await?;
    Ok(JsonReply(CounterBody { value }))
}

//
// ─────────────────────────────────────────────────────────────
// POST /subscribe
// Record an email once; 400 on invalid_email
// ─────────────────────────────────────────────────────────────
//
async fn subscribe(
    State(state): State<AppState>,
    EmailSubmission(email): EmailSubmission,
) -> Result<JsonReply<SignupOutcome>, AppError>
{
    let outcome = state.recorder.record(&email).await?;
    Ok(JsonReply(outcome))
}
