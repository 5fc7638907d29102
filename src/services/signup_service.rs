use std::sync::Arc;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::errors::SignupError;
use crate::services::counter::{ApproxCounter, Count};
use crate::services::mailer::WelcomeMailer;
use crate::services::validation::{is_valid_email, normalize_email};
use crate::state::kv::KvStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SignupStatus {
    New,
    Existing,
}

/// Successful `/subscribe` result.
#[derive(Debug, Clone, Serialize)]
pub struct SignupOutcome {
    pub ok: bool,
    pub value: Count,
    pub status: SignupStatus,
}

impl SignupOutcome {
    fn new(value: Count, status: SignupStatus) -> Self {
        Self {
            ok: true,
            value,
            status,
        }
    }
}

/// Store key for a normalized email: `email:<sha256 hex>`.
pub fn signup_key(normalized_email: &str) -> String {
    let digest = Sha256::digest(normalized_email.as_bytes());
    format!("email:{}", hex::encode(digest))
}

/// Records unique signups and bumps the counter for each new one.
#[derive(Clone)]
pub struct SignupRecorder {
    store: Arc<dyn KvStore>,
    counter: ApproxCounter,
    mailer: WelcomeMailer,
}

impl SignupRecorder {
    pub fn new(store: Arc<dyn KvStore>, counter: ApproxCounter, mailer: WelcomeMailer) -> Self {
        Self {
            store,
            counter,
            mailer,
        }
    }

    pub async fn record(&self, raw_email: &str) -> Result<SignupOutcome, SignupError> {
        let email = normalize_email(raw_email);
        if !is_valid_email(&email) {
            return Err(SignupError::InvalidEmail);
        }

        let key = signup_key(&email);

        let existing = self.store.get(&key).await?;
        if existing.is_some_and(|v| !v.is_empty()) {
            let value = self.counter.read().await?;
            return Ok(SignupOutcome::new(value, SignupStatus::Existing));
        }

        // Two concurrent first signups of one address can both get here.
        // They write the same value, but both increment the counter.
        self.store.put(&key, email.clone()).await?;
        let value = self.counter.increment().await?;

        if let Err(e) = self.mailer.send(&email).await {
            tracing::warn!("Welcome email failed (ignored): {e}");
        }

        tracing::info!("New signup recorded, total {}", value);
        Ok(SignupOutcome::new(value, SignupStatus::New))
    }
}
