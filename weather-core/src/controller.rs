//! Form controller: one text field, one request at a time.
//!
//! The controller owns the `FormState` and drives each submission through
//! `Idle -> Submitting -> {Succeeded, Failed}`. A submission holds a permit
//! for its whole lifetime; while it is held every other `submit` call is
//! ignored, and the permit puts the form back into a settled phase however
//! the submission ends.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::{
    error::LookupResult,
    lookup::{LOOKUP_FAILED_MESSAGE, LookupService},
    model::{FormState, Phase, SubmissionResult},
};

pub const SUCCESS_MESSAGE: &str = "Weather lookup successful!";

/// What a call to `submit` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Another submission was in flight; nothing was sent.
    Ignored,
    /// The ID field was empty; nothing was sent.
    MissingId,
    Completed(SubmissionResult),
}

#[derive(Debug)]
pub struct FormController<S> {
    service: S,
    state: Mutex<FormState>,
}

impl<S: LookupService> FormController<S> {
    pub fn new(service: S) -> Self {
        Self { service, state: Mutex::new(FormState::default()) }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Snapshot of the current form state.
    pub fn state(&self) -> FormState {
        lock(&self.state).clone()
    }

    pub fn is_submitting(&self) -> bool {
        lock(&self.state).is_submitting()
    }

    pub fn update_field(&self, name: &str, value: impl Into<String>) -> LookupResult<()> {
        lock(&self.state).update_field(name, value)
    }

    /// Look up the record named by the ID field.
    pub async fn submit(&self) -> SubmitOutcome {
        let (permit, id) = match self.begin() {
            Ok(started) => started,
            Err(outcome) => return outcome,
        };

        tracing::info!(%id, "submitting weather lookup");

        let reply = self.service.fetch(&id).await;
        let result = match reply.and_then(|reply| reply.into_body(LOOKUP_FAILED_MESSAGE)) {
            Ok(body) => {
                let raw_body = normalize_body(body);
                tracing::debug!(body = %raw_body, "weather lookup succeeded");
                SubmissionResult {
                    success: true,
                    message: SUCCESS_MESSAGE.to_string(),
                    raw_body: Some(raw_body),
                }
            }
            Err(err) => {
                tracing::warn!(%id, error = %err, "weather lookup failed");
                SubmissionResult { success: false, message: err.to_string(), raw_body: None }
            }
        };

        permit.finish(result.clone());
        SubmitOutcome::Completed(result)
    }

    fn begin(&self) -> Result<(SubmitPermit<'_>, String), SubmitOutcome> {
        let mut state = lock(&self.state);

        if state.is_submitting() {
            tracing::debug!("submission already in flight, ignoring");
            return Err(SubmitOutcome::Ignored);
        }
        if state.id_value.trim().is_empty() {
            return Err(SubmitOutcome::MissingId);
        }

        state.phase = Phase::Submitting;
        state.last_result = None;

        Ok((SubmitPermit { state: &self.state, finished: false }, state.id_value.clone()))
    }
}

/// Held for the duration of one submission.
struct SubmitPermit<'a> {
    state: &'a Mutex<FormState>,
    finished: bool,
}

impl SubmitPermit<'_> {
    fn finish(mut self, result: SubmissionResult) {
        let mut state = lock(self.state);

        if result.success {
            state.phase = Phase::Succeeded;
            state.id_value.clear();
        } else {
            state.phase = Phase::Failed;
        }
        state.last_result = Some(result);

        self.finished = true;
    }
}

impl Drop for SubmitPermit<'_> {
    fn drop(&mut self) {
        // Submission future dropped mid-request.
        if !self.finished {
            lock(self.state).phase = Phase::Idle;
        }
    }
}

fn lock(state: &Mutex<FormState>) -> MutexGuard<'_, FormState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Compact JSON text of the body, or the body itself when it isn't JSON.
fn normalize_body(body: String) -> String {
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(value) => value.to_string(),
        Err(_) => body,
    }
}
