//! Backend seam: the only place this crate talks to the remote API.
//!
//! Orchestrators hold an `Arc<dyn Backend>`; production uses `HttpBackend`,
//! tests substitute scripted implementations.

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;

use crate::errors::SyncError;

pub mod http;
pub mod session;

pub use http::HttpBackend;
pub use session::{InMemorySession, Session, SessionProvider};

/// Body of the "link identity to backend record" call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkAccountRequest {
    pub identity_id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl From<&Session> for LinkAccountRequest {
    fn from(session: &Session) -> Self {
        Self {
            identity_id: session.identity_id.clone(),
            email: session.email.clone(),
            token: session.token.clone(),
        }
    }
}

/// A resume file ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeFile {
    pub file_name: String,
    pub contents: Bytes,
}

impl ResumeFile {
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let contents = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "resume".to_string());
        Ok(Self {
            file_name,
            contents: Bytes::from(contents),
        })
    }
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// Links the authenticated identity to a backend user record.
    async fn link_account(&self, request: &LinkAccountRequest) -> Result<Value, SyncError>;

    async fn fetch_profile(&self) -> Result<Value, SyncError>;

    async fn patch_profile(&self, body: &Value) -> Result<Value, SyncError>;

    async fn upload_resume(&self, file: &ResumeFile) -> Result<Value, SyncError>;

    /// Asks the backend to start parsing the uploaded resume.
    async fn trigger_resume_parse(&self) -> Result<(), SyncError>;

    async fn resume_parse_status(&self) -> Result<Value, SyncError>;
}
