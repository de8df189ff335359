use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use recruit_sync::backend::{Backend, HttpBackend, InMemorySession, ResumeFile, SessionProvider};
use recruit_sync::config::Config;
use recruit_sync::sync::{AccountSync, ProfileStore, ResumeParsing, RunTracker};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("recruit_sync={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting recruit-sync v{}", env!("CARGO_PKG_VERSION"));

    let session = config.session();
    let backend: Arc<dyn Backend> = Arc::new(
        HttpBackend::new(config.backend_url.clone(), config.http_timeout)
            .context("failed to build HTTP client")?
            .with_token(session.token.clone()),
    );
    let provider: Arc<dyn SessionProvider> = Arc::new(InMemorySession::new(session.clone()));
    let store = ProfileStore::default();

    // Ctrl-C cancels every in-flight run.
    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, cancelling");
                shutdown.cancel();
            }
        }
    });

    let account = AccountSync::new(backend.clone(), provider.clone(), store.clone())
        .with_policies(config.account_sync_policy(), config.resync_policy())
        .with_tracker(RunTracker::with_root(shutdown.clone()));

    match account.sync_on_login(&session).await {
        Ok(report) => info!(
            attempts = report.attempts,
            elapsed_ms = report.elapsed.as_millis() as u64,
            profile_loaded = report.profile_loaded,
            "account linked"
        ),
        Err(e) => {
            error!(code = e.code(), "account sync failed: {e}");
            anyhow::bail!(e.user_message());
        }
    }

    if let Some(path) = &config.resume_path {
        let file = ResumeFile::from_path(path)
            .await
            .with_context(|| format!("failed to read resume at {}", path.display()))?;
        let parsing = ResumeParsing::new(backend, provider, store.clone())
            .with_policy(config.poll_policy())
            .with_tracker(RunTracker::with_root(shutdown.clone()));

        match parsing.upload_and_parse(&file).await {
            Ok(report) => info!(attempts = report.attempts, "resume parsed"),
            Err(e) => {
                let reason = e.failure_reason().map(|r| r.as_str()).unwrap_or("cancelled");
                error!(code = e.code(), reason, "resume parsing failed: {e}");
                anyhow::bail!(e.user_message());
            }
        }
    }

    let profile = serde_json::to_string_pretty(&store.snapshot())?;
    println!("{profile}");
    Ok(())
}
