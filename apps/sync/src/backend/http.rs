//! `reqwest` implementation of [`Backend`].
//!
//! One client is built up front with a global timeout. Non-2xx responses are
//! classified here: 401/403 become `SyncError::Auth`, everything else
//! `SyncError::Api` carrying the server's message verbatim when it sent one.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::backend::{Backend, LinkAccountRequest, ResumeFile};
use crate::errors::SyncError;
use crate::normalize::normalizer::failure_message;

const LINK_ACCOUNT_PATH: &str = "/api/users/sync";
const PROFILE_PATH: &str = "/api/profile";
const RESUME_UPLOAD_PATH: &str = "/api/resume/upload";
const RESUME_PARSE_PATH: &str = "/api/resume/parse";
const RESUME_STATUS_PATH: &str = "/api/resume/parsing-status";

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SyncError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Bearer token sent with every request.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, SyncError> {
        let response = request.send().await?;
        let status = response.status();
        let url = response.url().path().to_string();
        let body = response.text().await?;

        if !status.is_success() {
            warn!("{} returned {}: {}", url, status, body);
            return Err(classify_status(status, &body));
        }

        debug!("{} returned {}", url, status);
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| SyncError::Api {
            status: status.as_u16(),
            message: format!("invalid JSON in response: {e}"),
        })
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn link_account(&self, request: &LinkAccountRequest) -> Result<Value, SyncError> {
        self.send(self.request(Method::POST, LINK_ACCOUNT_PATH).json(request))
            .await
    }

    async fn fetch_profile(&self) -> Result<Value, SyncError> {
        self.send(self.request(Method::GET, PROFILE_PATH)).await
    }

    async fn patch_profile(&self, body: &Value) -> Result<Value, SyncError> {
        self.send(self.request(Method::PATCH, PROFILE_PATH).json(body))
            .await
    }

    async fn upload_resume(&self, file: &ResumeFile) -> Result<Value, SyncError> {
        let part = Part::bytes(file.contents.to_vec())
            .file_name(file.file_name.clone())
            .mime_str(mime_for(&file.file_name))?;
        let form = Form::new().part("resume", part);
        self.send(self.request(Method::POST, RESUME_UPLOAD_PATH).multipart(form))
            .await
    }

    async fn trigger_resume_parse(&self) -> Result<(), SyncError> {
        self.send(self.request(Method::POST, RESUME_PARSE_PATH))
            .await
            .map(|_| ())
    }

    async fn resume_parse_status(&self) -> Result<Value, SyncError> {
        self.send(self.request(Method::GET, RESUME_STATUS_PATH)).await
    }
}

fn classify_status(status: StatusCode, body: &str) -> SyncError {
    let message = error_message(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SyncError::Auth { message },
        _ => SyncError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

/// Extracts a human-readable message from an error body, JSON or plain text.
fn error_message(body: &str) -> Option<String> {
    match serde_json::from_str::<Value>(body) {
        Ok(json) => failure_message(&json),
        Err(_) => {
            let text = body.trim();
            (!text.is_empty()).then(|| text.to_string())
        }
    }
}

fn mime_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::retry::Retryable;
    use axum::body::Bytes as AxumBytes;
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;

    async fn spawn_server(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn backend(base_url: &str) -> HttpBackend {
        HttpBackend::new(base_url, Duration::from_secs(5))
            .unwrap()
            .with_token(Some("tok-123".to_string()))
    }

    fn auth_header(headers: &HeaderMap) -> Value {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| json!(v))
            .unwrap_or(Value::Null)
    }

    #[tokio::test]
    async fn test_link_account_posts_json_with_bearer_token() {
        let router = Router::new().route(
            "/api/users/sync",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                Json(json!({ "received": body, "authorization": auth_header(&headers) }))
            }),
        );
        let base = spawn_server(router).await;

        let request = LinkAccountRequest {
            identity_id: "user_1".to_string(),
            email: "dev@example.com".to_string(),
            token: Some("idp-token".to_string()),
        };
        let response = backend(&format!("{base}/")).link_account(&request).await.unwrap();
        assert_eq!(
            response["received"],
            json!({ "identity_id": "user_1", "email": "dev@example.com", "token": "idp-token" })
        );
        assert_eq!(response["authorization"], json!("Bearer tok-123"));
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_auth_error_with_message() {
        let router = Router::new().route(
            "/api/users/sync",
            post(|| async {
                (
                    AxumStatus::UNAUTHORIZED,
                    Json(json!({ "message": "Token expired" })),
                )
            }),
        );
        let base = spawn_server(router).await;
        let request = LinkAccountRequest {
            identity_id: "user_1".to_string(),
            email: "dev@example.com".to_string(),
            token: None,
        };
        match backend(&base).link_account(&request).await {
            Err(SyncError::Auth { message }) => assert_eq!(message, "Token expired"),
            other => panic!("expected Auth error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_server_error_is_retryable_and_keeps_plain_text_body() {
        let router = Router::new().route(
            "/api/profile",
            get(|| async { (AxumStatus::SERVICE_UNAVAILABLE, "upstream down") }),
        );
        let base = spawn_server(router).await;
        let err = backend(&base).fetch_profile().await.unwrap_err();
        assert!(err.is_retryable());
        match err {
            SyncError::Api { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "upstream down");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_client_error_is_not_retryable() {
        let router = Router::new().route(
            "/api/profile",
            axum::routing::patch(|| async {
                (
                    AxumStatus::UNPROCESSABLE_ENTITY,
                    Json(json!({ "detail": "email is invalid" })),
                )
            }),
        );
        let base = spawn_server(router).await;
        let err = backend(&base).patch_profile(&json!({})).await.unwrap_err();
        assert!(!err.is_retryable());
        assert_eq!(err.user_message(), "email is invalid");
    }

    #[tokio::test]
    async fn test_trigger_accepts_empty_body_and_status_returns_json() {
        let router = Router::new()
            .route("/api/resume/parse", post(|| async { AxumStatus::ACCEPTED }))
            .route(
                "/api/resume/parsing-status",
                get(|| async { Json(json!({ "parsing_status": "parsing" })) }),
            );
        let base = spawn_server(router).await;
        let backend = backend(&base);
        backend.trigger_resume_parse().await.unwrap();
        assert_eq!(
            backend.resume_parse_status().await.unwrap(),
            json!({ "parsing_status": "parsing" })
        );
    }

    #[tokio::test]
    async fn test_upload_sends_multipart_form() {
        let router = Router::new().route(
            "/api/resume/upload",
            post(|headers: HeaderMap, body: AxumBytes| async move {
                let content_type = headers
                    .get("content-type")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                let text = String::from_utf8_lossy(&body).to_string();
                Json(json!({
                    "multipart": content_type.starts_with("multipart/form-data"),
                    "has_file_name": text.contains("filename=\"cv.pdf\""),
                    "has_field": text.contains("name=\"resume\""),
                    "has_mime": text.contains("application/pdf"),
                }))
            }),
        );
        let base = spawn_server(router).await;
        let file = ResumeFile {
            file_name: "cv.pdf".to_string(),
            contents: bytes::Bytes::from_static(b"%PDF-1.4"),
        };
        let response = backend(&base).upload_resume(&file).await.unwrap();
        assert_eq!(
            response,
            json!({ "multipart": true, "has_file_name": true, "has_field": true, "has_mime": true })
        );
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let err = backend(&format!("http://{addr}"))
            .resume_parse_status()
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Network(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_error_message_sources() {
        assert_eq!(
            error_message(r#"{"error": "Email already linked"}"#),
            Some("Email already linked".to_string())
        );
        assert_eq!(error_message("  "), None);
        assert_eq!(error_message(r#"{"code": 7}"#), None);
        assert_eq!(
            classify_status(StatusCode::FORBIDDEN, "").code(),
            "AUTH_ERROR"
        );
        assert_eq!(
            classify_status(StatusCode::BAD_GATEWAY, "").user_message(),
            "Bad Gateway"
        );
    }

    #[test]
    fn test_mime_for_common_resume_formats() {
        assert_eq!(mime_for("CV.PDF"), "application/pdf");
        assert!(mime_for("resume.docx").ends_with("wordprocessingml.document"));
        assert_eq!(mime_for("noext"), "application/octet-stream");
    }
}
