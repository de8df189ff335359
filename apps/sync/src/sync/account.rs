//! Account sync: links a freshly authenticated identity to its backend
//! record, then loads the profile that hangs off it.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::backend::{Backend, LinkAccountRequest, Session, SessionProvider};
use crate::errors::{SyncError, ACCOUNT_SYNC_TIMEOUT_MESSAGE};
use crate::normalize::normalize;
use crate::sync::retry::{run_with_retry, RetryError, RetryObserver, RetryPolicy};
use crate::sync::run::{Run, RunTracker};
use crate::sync::store::ProfileStore;

/// Which entry point started the sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncFlow {
    /// Right after sign-in. Any failure ends the session.
    Strict,
    /// The user pressed "sync again".
    Interactive,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccountSyncReport {
    pub run_id: u64,
    pub flow: SyncFlow,
    pub attempts: u32,
    pub elapsed: Duration,
    pub profile_loaded: bool,
}

pub struct AccountSync {
    backend: Arc<dyn Backend>,
    session: Arc<dyn SessionProvider>,
    store: ProfileStore,
    runs: RunTracker,
    login_policy: RetryPolicy,
    resync_policy: RetryPolicy,
    observer: Arc<dyn RetryObserver>,
}

impl AccountSync {
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
            login_policy: RetryPolicy::account_sync(),
            resync_policy: RetryPolicy::manual_resync(),
            observer: Arc::new(()),
        }
    }

    pub fn with_policies(mut self, login: RetryPolicy, resync: RetryPolicy) -> Self {
        self.login_policy = login;
        self.resync_policy = resync;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn RetryObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Share a tracker, e.g. one rooted at the process shutdown token.
    pub fn with_tracker(mut self, runs: RunTracker) -> Self {
        self.runs = runs;
        self
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    pub async fn sync_on_login(&self, session: &Session) -> Result<AccountSyncReport, SyncError> {
        self.sync(SyncFlow::Strict, session).await
    }

    pub async fn resync(&self) -> Result<AccountSyncReport, SyncError> {
        let session = self
            .session
            .current_session()
            .await
            .ok_or_else(|| SyncError::Auth {
                message: "no active session".to_string(),
            })?;
        self.sync(SyncFlow::Interactive, &session).await
    }

    /// Abandons the in-flight sync, if any. Its result is discarded.
    pub fn cancel(&self) {
        self.runs.cancel();
    }

    async fn sync(&self, flow: SyncFlow, session: &Session) -> Result<AccountSyncReport, SyncError> {
        let run = self.runs.begin();
        let policy = match flow {
            SyncFlow::Strict => &self.login_policy,
            SyncFlow::Interactive => &self.resync_policy,
        };
        let request = LinkAccountRequest::from(session);
        info!(run = run.id(), ?flow, identity = %session.identity_id, "starting account sync");

        let outcome = run_with_retry(policy, run.token(), self.observer.as_ref(), |attempt| {
            let backend = Arc::clone(&self.backend);
            let request = request.clone();
            async move {
                debug!(attempt, "linking account");
                backend.link_account(&request).await
            }
        })
        .await;

        let linked = match outcome {
            Ok(linked) => linked,
            Err(err) => return Err(self.fail(flow, &run, err).await),
        };

        let profile_loaded = self.load_profile(&run).await;
        if !run.is_current() {
            debug!(run = run.id(), "account sync superseded after linking");
            return Err(SyncError::Cancelled);
        }

        info!(
            run = run.id(),
            attempts = linked.attempts,
            elapsed_ms = linked.elapsed.as_millis() as u64,
            profile_loaded,
            "account sync complete"
        );
        Ok(AccountSyncReport {
            run_id: run.id(),
            flow,
            attempts: linked.attempts,
            elapsed: linked.elapsed,
            profile_loaded,
        })
    }

    async fn fail(&self, flow: SyncFlow, run: &Run, err: RetryError<SyncError>) -> SyncError {
        let error = match err {
            RetryError::Cancelled => {
                debug!(run = run.id(), "account sync superseded");
                return SyncError::Cancelled;
            }
            RetryError::Fatal(error) => error,
            RetryError::TimedOut { attempts, last_error }
            | RetryError::Exhausted { attempts, last_error } => {
                warn!(
                    attempts,
                    last_error = ?last_error.map(|e| e.to_string()),
                    "account sync gave up"
                );
                SyncError::Timeout {
                    message: ACCOUNT_SYNC_TIMEOUT_MESSAGE.to_string(),
                }
            }
        };

        let sign_out = error.requires_sign_out() || (flow == SyncFlow::Strict && run.is_current());
        if sign_out {
            warn!(code = error.code(), "signing out after failed account sync");
            self.session.sign_out().await;
        }
        error
    }

    /// Loads and merges the profile. Failure here does not fail the sync.
    async fn load_profile(&self, run: &Run) -> bool {
        let response = tokio::select! {
            biased;
            _ = run.token().cancelled() => return false,
            response = self.backend.fetch_profile() => response,
        };

        let patch = match response.and_then(|payload| Ok(normalize(&payload)?)) {
            Ok(patch) => patch,
            Err(e) => {
                warn!(error = %e, "could not load profile after account sync");
                return false;
            }
        };
        self.store.commit(run, &patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CanonicalProfile;
    use crate::sync::retry::RetryBound;
    use crate::sync::testing::{network_error, session, RecordingSession, ScriptedBackend};
    use serde_json::json;
    use tokio::time::Instant;

    fn setup(session: Option<Session>) -> (Arc<ScriptedBackend>, Arc<RecordingSession>, AccountSync) {
        let backend = Arc::new(ScriptedBackend::new());
        let provider = Arc::new(RecordingSession::new(session));
        let sync = AccountSync::new(backend.clone(), provider.clone(), ProfileStore::default());
        (backend, provider, sync)
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_third_attempt_and_loads_profile() {
        let (backend, provider, sync) = setup(Some(session()));
        backend
            .push("link", Err(network_error()))
            .push("link", Err(network_error()))
            .push("profile", Ok(json!({ "data": { "name": "Ada Lovelace" } })));

        let report = sync.sync_on_login(&session()).await.unwrap();
        assert_eq!(report.attempts, 3);
        // 900ms then 1530ms of backoff, give or take timer granularity.
        assert!(report.elapsed >= Duration::from_millis(2430));
        assert!(report.elapsed < Duration::from_millis(2440));
        assert!(report.profile_loaded);
        assert_eq!(provider.sign_outs(), 0);
        assert_eq!(
            sync.store().snapshot().basic_info.get("full_name"),
            Some(&json!("Ada Lovelace"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_reports_timeout_and_signs_out() {
        let (backend, provider, sync) = setup(Some(session()));
        for _ in 0..30 {
            backend.push("link", Err(network_error()));
        }

        let started = Instant::now();
        let err = sync.sync_on_login(&session()).await.unwrap_err();
        assert!(matches!(err, SyncError::Timeout { .. }));
        assert!(err.user_message().contains("taking longer than expected"));
        assert!(err.retry_available());
        assert!(started.elapsed() < Duration::from_secs(31));
        assert_eq!(provider.sign_outs(), 1);

        let calls = backend.calls("link");
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(backend.calls("link"), calls);
        assert_eq!(backend.calls("profile"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_error_signs_out_without_retrying() {
        let (backend, provider, sync) = setup(Some(session()));
        backend.push(
            "link",
            Err(SyncError::Auth {
                message: "Token expired".to_string(),
            }),
        );

        let err = sync.resync().await.unwrap_err();
        assert!(matches!(err, SyncError::Auth { .. }));
        assert!(!err.retry_available());
        assert_eq!(backend.calls("link"), 1);
        assert_eq!(provider.sign_outs(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interactive_exhaustion_keeps_session() {
        let (backend, provider, sync) = setup(Some(session()));
        for _ in 0..3 {
            backend.push("link", Err(network_error()));
        }

        let err = sync.resync().await.unwrap_err();
        assert!(matches!(err, SyncError::Timeout { .. }));
        assert_eq!(err.user_message(), ACCOUNT_SYNC_TIMEOUT_MESSAGE);
        assert!(err.retry_available());
        assert_eq!(backend.calls("link"), 3);
        assert_eq!(provider.sign_outs(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_count_bounded_login_exhaustion_is_timeout_and_signs_out() {
        let (backend, provider, sync) = setup(Some(session()));
        let sync = sync.with_policies(
            RetryPolicy {
                bound: RetryBound::MaxAttempts(2),
                ..RetryPolicy::account_sync()
            },
            RetryPolicy::manual_resync(),
        );
        backend
            .push("link", Err(network_error()))
            .push("link", Err(network_error()));

        let err = sync.sync_on_login(&session()).await.unwrap_err();
        assert!(matches!(err, SyncError::Timeout { .. }));
        assert_eq!(backend.calls("link"), 2);
        assert_eq!(provider.sign_outs(), 1);
    }

    #[tokio::test]
    async fn test_resync_without_session_is_auth_error() {
        let (backend, _provider, sync) = setup(None);
        let err = sync.resync().await.unwrap_err();
        assert!(matches!(err, SyncError::Auth { .. }));
        assert_eq!(backend.calls("link"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_profile_failure_is_not_fatal() {
        let (backend, _provider, sync) = setup(Some(session()));
        backend.push(
            "profile",
            Err(SyncError::Api {
                status: 500,
                message: "boom".to_string(),
            }),
        );

        let report = sync.sync_on_login(&session()).await.unwrap();
        assert_eq!(report.attempts, 1);
        assert!(!report.profile_loaded);
        assert_eq!(sync.store().snapshot(), CanonicalProfile::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_sync_mutates_nothing() {
        let (backend, provider, sync) = setup(Some(session()));
        backend.set_latency(Duration::from_secs(2));
        backend.push("profile", Ok(json!({ "name": "Stale" })));

        let login_session = session();
        let (result, _) = tokio::join!(sync.sync_on_login(&login_session), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            sync.cancel();
        });

        assert!(matches!(result, Err(SyncError::Cancelled)));
        assert_eq!(provider.sign_outs(), 0);
        assert_eq!(backend.calls("profile"), 0);
        assert_eq!(sync.store().snapshot(), CanonicalProfile::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_sync_supersedes_older() {
        let (backend, provider, sync) = setup(Some(session()));
        backend.set_latency(Duration::from_secs(1));
        backend
            .push("link", Err(network_error()))
            .push("profile", Ok(json!({ "name": "Newer" })));

        let login_session = session();
        let (first, second) = tokio::join!(sync.sync_on_login(&login_session), async {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            sync.resync().await
        });

        assert!(matches!(first, Err(SyncError::Cancelled)));
        let report = second.unwrap();
        assert_eq!(report.flow, SyncFlow::Interactive);
        assert!(report.profile_loaded);
        assert_eq!(provider.sign_outs(), 0);
        assert_eq!(
            sync.store().snapshot().basic_info.get("full_name"),
            Some(&json!("Newer"))
        );
    }
}
