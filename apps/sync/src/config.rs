use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::backend::Session;
use crate::sync::{PollPolicy, RetryBound, RetryPolicy};

/// Driver configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: String,
    pub identity_id: String,
    pub identity_email: String,
    pub auth_token: Option<String>,
    pub resume_path: Option<PathBuf>,
    pub rust_log: String,
    pub http_timeout: Duration,
    pub sync_deadline: Duration,
    pub sync_initial_delay: Duration,
    pub sync_backoff_multiplier: f64,
    pub sync_max_delay: Duration,
    /// Zero disables the per-attempt cap.
    pub sync_attempt_timeout: Duration,
    pub poll_max_attempts: u32,
    pub poll_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let resume_path = var("RESUME_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        if let Some(path) = &resume_path {
            if !path.is_file() {
                bail!("RESUME_PATH '{}' is not a readable file", path.display());
            }
        }

        Ok(Config {
            backend_url: require(&var, "BACKEND_URL")?,
            identity_id: require(&var, "IDENTITY_ID")?,
            identity_email: require(&var, "IDENTITY_EMAIL")?,
            auth_token: var("AUTH_TOKEN").filter(|t| !t.is_empty()),
            resume_path,
            rust_log: var("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            http_timeout: Duration::from_secs(parse_or(&var, "HTTP_TIMEOUT_SECS", 30)?),
            sync_deadline: Duration::from_secs(parse_or(&var, "SYNC_DEADLINE_SECS", 30)?),
            sync_initial_delay: Duration::from_millis(parse_or(&var, "SYNC_INITIAL_DELAY_MS", 900)?),
            sync_backoff_multiplier: parse_or(&var, "SYNC_BACKOFF_MULTIPLIER", 1.7)?,
            sync_max_delay: Duration::from_millis(parse_or(&var, "SYNC_MAX_DELAY_MS", 5000)?),
            sync_attempt_timeout: Duration::from_secs(parse_or(&var, "SYNC_ATTEMPT_TIMEOUT_SECS", 10)?),
            poll_max_attempts: parse_or(&var, "POLL_MAX_ATTEMPTS", 40)?,
            poll_interval: Duration::from_millis(parse_or(&var, "POLL_INTERVAL_MS", 3000)?),
        })
    }

    /// Deadline-bounded policy for the sync that follows sign-in.
    pub fn account_sync_policy(&self) -> RetryPolicy {
        RetryPolicy {
            bound: RetryBound::Deadline(self.sync_deadline),
            initial_delay: self.sync_initial_delay,
            multiplier: self.sync_backoff_multiplier,
            max_delay: self.sync_max_delay,
            attempt_timeout: self.attempt_timeout(),
        }
    }

    pub fn resync_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempt_timeout: self.attempt_timeout(),
            ..RetryPolicy::manual_resync()
        }
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            max_attempts: self.poll_max_attempts,
            interval: self.poll_interval,
        }
    }

    pub fn session(&self) -> Session {
        Session {
            identity_id: self.identity_id.clone(),
            email: self.identity_email.clone(),
            token: self.auth_token.clone(),
        }
    }

    fn attempt_timeout(&self) -> Option<Duration> {
        (!self.sync_attempt_timeout.is_zero()).then_some(self.sync_attempt_timeout)
    }
}

fn require(var: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    var(key)
        .filter(|v| !v.trim().is_empty())
        .with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("BACKEND_URL", "http://localhost:8080"),
        ("IDENTITY_ID", "user_2abc"),
        ("IDENTITY_EMAIL", "dev@example.com"),
    ];

    #[test]
    fn test_defaults_match_account_sync_policy() {
        let config = Config::from_vars(vars(&REQUIRED)).unwrap();
        assert_eq!(config.account_sync_policy(), RetryPolicy::account_sync());
        assert_eq!(config.resync_policy(), RetryPolicy::manual_resync());
        assert_eq!(config.poll_policy(), PollPolicy::default());
        assert_eq!(config.rust_log, "info");
        assert_eq!(config.session().token, None);
    }

    #[test]
    fn test_missing_required_variable_is_named() {
        let err = Config::from_vars(vars(&REQUIRED[..2])).unwrap_err();
        assert!(err.to_string().contains("IDENTITY_EMAIL"));
    }

    #[test]
    fn test_overrides_and_bad_numbers() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("SYNC_DEADLINE_SECS", "5"),
            ("SYNC_ATTEMPT_TIMEOUT_SECS", "0"),
            ("POLL_INTERVAL_MS", "250"),
            ("AUTH_TOKEN", "tok"),
        ]);
        let config = Config::from_vars(vars(&pairs)).unwrap();
        let policy = config.account_sync_policy();
        assert_eq!(policy.bound, RetryBound::Deadline(Duration::from_secs(5)));
        assert_eq!(policy.attempt_timeout, None);
        assert_eq!(config.poll_policy().interval, Duration::from_millis(250));
        assert_eq!(config.session().token.as_deref(), Some("tok"));

        pairs.push(("POLL_MAX_ATTEMPTS", "lots"));
        let err = Config::from_vars(vars(&pairs)).unwrap_err();
        assert!(err.to_string().contains("POLL_MAX_ATTEMPTS"));
    }

    #[test]
    fn test_resume_path_must_exist() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_string_lossy().to_string();
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("RESUME_PATH", path.as_str()));
        let config = Config::from_vars(vars(&pairs)).unwrap();
        assert_eq!(config.resume_path.as_deref(), Some(file.path()));

        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("cv.pdf").to_string_lossy().to_string();
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("RESUME_PATH", missing.as_str()));
        assert!(Config::from_vars(vars(&pairs)).is_err());
    }
}
