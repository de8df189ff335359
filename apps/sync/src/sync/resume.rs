//! Resume parsing: upload, trigger the backend parser, and poll until it
//! reports a terminal status.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::backend::{Backend, ResumeFile, SessionProvider};
use crate::errors::SyncError;
use crate::model::{CanonicalPatch, ParsingStatus};
use crate::normalize::normalizer::{failure_message, has_resume_data_flag};
use crate::normalize::{normalize, resolve};
use crate::sync::poll::{poll_until_terminal, PollPolicy, PollStep};
use crate::sync::run::{Run, RunTracker};
use crate::sync::store::ProfileStore;

const STATUS_KEYS: &[&str] = &["parsing_status", "parsingStatus", "status"];

#[derive(Debug, Clone, PartialEq)]
pub struct ParseReport {
    pub run_id: u64,
    pub attempts: u32,
    pub patch: CanonicalPatch,
}

pub struct ResumeParsing {
    backend: Arc<dyn Backend>,
    session: Arc<dyn SessionProvider>,
    store: ProfileStore,
    runs: RunTracker,
    policy: PollPolicy,
}

impl ResumeParsing {
    pub fn new(
        backend: Arc<dyn Backend>,
        session: Arc<dyn SessionProvider>,
        store: ProfileStore,
    ) -> Self {
        Self {
            backend,
            session,
            store,
            runs: RunTracker::new(),
            policy: PollPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_tracker(mut self, runs: RunTracker) -> Self {
        self.runs = runs;
        self
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    pub async fn upload_and_parse(&self, file: &ResumeFile) -> Result<ParseReport, SyncError> {
        info!(file = %file.file_name, bytes = file.contents.len(), "uploading resume");
        if let Err(e) = self.backend.upload_resume(file).await {
            return Err(self.surface(None, e).await);
        }
        self.start().await
    }

    /// Triggers parsing and polls for the result. Supersedes any run in flight.
    pub async fn start(&self) -> Result<ParseReport, SyncError> {
        let run = self.runs.begin();
        info!(run = run.id(), "starting resume parse");

        let triggered = tokio::select! {
            biased;
            _ = run.token().cancelled() => return Err(SyncError::Cancelled),
            triggered = self.backend.trigger_resume_parse() => triggered,
        };
        match triggered {
            Err(e) if e.requires_sign_out() => return Err(self.surface(Some(&run), e).await),
            Err(e) => warn!(error = %e, "could not trigger resume parsing, polling anyway"),
            Ok(()) => {}
        }

        let polled = poll_until_terminal(
            &self.policy,
            run.token(),
            |attempt| {
                let backend = Arc::clone(&self.backend);
                async move {
                    debug!(attempt, "checking resume parsing status");
                    backend.resume_parse_status().await
                }
            },
            classify_parse_response,
        )
        .await;

        let polled = match polled {
            Ok(polled) => polled,
            Err(e) => return Err(self.surface(Some(&run), e.into()).await),
        };

        if !self.store.commit(&run, &polled.value) {
            return Err(SyncError::Cancelled);
        }
        info!(run = run.id(), attempts = polled.attempts, "resume parsed");
        Ok(ParseReport {
            run_id: run.id(),
            attempts: polled.attempts,
            patch: polled.value,
        })
    }

    /// The user-facing "try again": a fresh trigger and a fresh poll.
    pub async fn retry(&self) -> Result<ParseReport, SyncError> {
        info!("retrying resume parse");
        self.start().await
    }

    pub fn cancel(&self) {
        self.runs.cancel();
    }

    async fn surface(&self, run: Option<&Run>, error: SyncError) -> SyncError {
        if matches!(error, SyncError::Cancelled) || run.is_some_and(|r| !r.is_current()) {
            debug!("discarding failure of superseded resume parse");
            return SyncError::Cancelled;
        }
        if error.requires_sign_out() {
            warn!(code = error.code(), "signing out after rejected credentials");
            self.session.sign_out().await;
        } else if let Some(reason) = error.failure_reason() {
            warn!(%reason, code = error.code(), "resume parsing failed: {}", error);
        }
        error
    }
}

/// Maps one status response onto a poll step.
///
/// `failed`/`error` are terminal. `parsed`, or any status carrying the
/// has-data flag, ends the poll with whatever the normalizer extracts; an
/// empty extraction is reported as no data. Everything else keeps polling.
pub fn classify_parse_response(payload: Value) -> PollStep<CanonicalPatch> {
    let raw = resolve(&payload, STATUS_KEYS)
        .and_then(Value::as_str)
        .unwrap_or_default();

    match ParsingStatus::classify(raw) {
        ParsingStatus::Failed | ParsingStatus::Error => PollStep::Failed(failure_message(&payload)),
        ParsingStatus::Parsed => extract(&payload),
        _ if has_resume_data_flag(&payload) => extract(&payload),
        ParsingStatus::Unknown(status) => {
            warn!(%status, "unrecognized parsing status, polling again");
            PollStep::Continue
        }
        ParsingStatus::NotStarted | ParsingStatus::Parsing => PollStep::Continue,
    }
}

fn extract(payload: &Value) -> PollStep<CanonicalPatch> {
    match normalize(payload) {
        Ok(patch) if patch.has_content() => PollStep::Done(patch),
        Ok(_) => PollStep::NoData,
        Err(e) => {
            warn!(error = %e, "parsed resume payload could not be normalized");
            PollStep::NoData
        }
    }
}
