use std::convert::Infallible;

use axum::{
    async_trait,
    body::Bytes,
    extract::{Form, FromRequest, Multipart, Request},
    http::header,
};
use serde_json::Value;

/// How a request body is decoded, picked from its declared content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Json,
    UrlEncoded,
    Multipart,
    /// Anything else is tried as JSON.
    Fallback,
}

impl BodyKind {
    pub fn from_content_type(content_type: &str) -> Self {
        if content_type.contains("application/json") {
            BodyKind::Json
        } else if content_type.contains("application/x-www-form-urlencoded") {
            BodyKind::UrlEncoded
        } else if content_type.contains("multipart/form-data") {
            BodyKind::Multipart
        } else {
            BodyKind::Fallback
        }
    }
}

/// The raw `email` field of a subscribe request.
///
/// Extraction never rejects: a missing field or an unreadable body yields
/// an empty string, which the email validator then refuses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailSubmission(pub String);

#[async_trait]
impl<S> FromRequest<S> for EmailSubmission
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        let kind = BodyKind::from_content_type(content_type);

        let email = match kind {
            BodyKind::UrlEncoded => from_urlencoded(req, state).await,
            BodyKind::Multipart => from_multipart(req, state).await,
            BodyKind::Json | BodyKind::Fallback => from_json(req, state).await,
        };

        Ok(EmailSubmission(email.unwrap_or_default()))
    }
}

async fn from_json<S: Send + Sync>(req: Request, state: &S) -> Option<String> {
    let bytes = Bytes::from_request(req, state).await.ok()?;
    let body: Value = serde_json::from_slice(&bytes).ok()?;
    body.get("email").map(coerce_email)
}

async fn from_urlencoded<S: Send + Sync>(req: Request, state: &S) -> Option<String> {
    let Form(fields) = Form::<Vec<(String, String)>>::from_request(req, state)
        .await
        .ok()?;

    fields
        .into_iter()
        .find(|(name, _)| name == "email")
        .map(|(_, value)| value)
}

async fn from_multipart<S: Send + Sync>(req: Request, state: &S) -> Option<String> {
    let mut multipart = Multipart::from_request(req, state).await.ok()?;

    while let Some(field) = multipart.next_field().await.ok()? {
        if field.name() == Some("email") {
            return field.text().await.ok();
        }
    }

    None
}

/// Scalars become their text form; falsy values and containers become "".
fn coerce_email(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "true".to_string(),
        Value::Number(n) if n.as_f64() != Some(0.0) => n.to_string(),
        _ => String::new(),
    }
}
