use std::sync::Arc;

use crate::services::counter::ApproxCounter;
use crate::services::mailer::WelcomeMailer;
use crate::services::signup_service::SignupRecorder;
use crate::state::kv::KvStore;

/// Shared application state handed to the signup routes.
///
/// Everything inside is a handle onto the key-value store; there is no
/// in-process mutable state of its own.
#[derive(Clone)]
pub struct AppState {
    pub counter: ApproxCounter,
    pub recorder: SignupRecorder,
}

impl AppState {
    pub fn new(store: Arc<dyn KvStore>, mailer: WelcomeMailer) -> Self {
        let counter = ApproxCounter::new(store.clone());
        let recorder = SignupRecorder::new(store, counter.clone(), mailer);

        Self { counter, recorder }
    }
}
