//! HTTP implementation of the backend interface.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use url::Url;

use super::{
    ApiError, ApiResult, Authorization, ChatBackend,
    types::{
        Credentials, ErrorBody, ForgotPasswordRequest, LoginResponse, MessageDto, MessageResponse,
        RegisterResponse, ResetPasswordRequest, SendMessageRequest,
    },
};
use crate::config::ApiConfig;
use crate::model::{Conversation, ConversationId};

/// REST client for the chat backend.
///
/// # Example
///
/// ```rust,no_run
/// use chat_sync_client::api::{Authorization, ChatBackend, HttpBackend};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = HttpBackend::new("http://localhost:8080/api")?;
/// let conversations = backend
///     .list_conversations(&Authorization::bearer("token"))
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: Url,
    http: reqwest::Client,
}

impl HttpBackend {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The API root, including its path (e.g. `http://localhost:8080/api`)
    pub fn new(base_url: impl AsRef<str>) -> ApiResult<Self> {
        Self::with_client(base_url, reqwest::Client::new())
    }

    /// Create a new client with a custom reqwest client.
    pub fn with_client(base_url: impl AsRef<str>, http: reqwest::Client) -> ApiResult<Self> {
        Ok(Self {
            base_url: normalize_base(base_url.as_ref())?,
            http,
        })
    }

    /// Build a client from configuration, applying the request timeout.
    pub fn from_config(config: &ApiConfig) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Self::with_client(&config.base_url, http)
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal helpers
    // ─────────────────────────────────────────────────────────────────────────

    /// Resolve a path relative to the API root.
    fn url(&self, path: &str) -> ApiResult<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    async fn send<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> ApiResult<T> {
        let response = request.send().await?;
        let response = Self::check_status(response).await?;
        Ok(response.json().await?)
    }

    /// Map non-success statuses to [`ApiError`], keeping the body's `message`.
    async fn check_status(response: reqwest::Response) -> ApiResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = extract_message(&body);
        tracing::debug!(
            name: "api.response.rejected",
            status = status.as_u16(),
            has_message = message.is_some(),
            "Backend rejected request"
        );

        if status == reqwest::StatusCode::UNAUTHORIZED {
            Err(ApiError::Unauthorized { message })
        } else {
            Err(ApiError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn register(&self, credentials: &Credentials) -> ApiResult<RegisterResponse> {
        tracing::debug!(name: "api.request", path = "auth/register", "POST");
        Self::send(self.http.post(self.url("auth/register")?).json(credentials)).await
    }

    async fn login(&self, credentials: &Credentials) -> ApiResult<LoginResponse> {
        tracing::debug!(name: "api.request", path = "auth/login", "POST");
        Self::send(self.http.post(self.url("auth/login")?).json(credentials)).await
    }

    async fn forgot_password(&self, request: &ForgotPasswordRequest) -> ApiResult<MessageResponse> {
        tracing::debug!(name: "api.request", path = "auth/forgot-password", "POST");
        Self::send(self.http.post(self.url("auth/forgot-password")?).json(request)).await
    }

    async fn reset_password(&self, request: &ResetPasswordRequest) -> ApiResult<MessageResponse> {
        tracing::debug!(name: "api.request", path = "auth/reset-password", "POST");
        Self::send(self.http.post(self.url("auth/reset-password")?).json(request)).await
    }

    async fn list_conversations(&self, auth: &Authorization) -> ApiResult<Vec<Conversation>> {
        tracing::debug!(name: "api.request", path = "chat/conversations", "GET");
        Self::send(auth.apply(self.http.get(self.url("chat/conversations")?))).await
    }

    async fn create_conversation(&self, auth: &Authorization) -> ApiResult<Conversation> {
        tracing::debug!(name: "api.request", path = "chat/conversations", "POST");
        Self::send(auth.apply(self.http.post(self.url("chat/conversations")?))).await
    }

    async fn delete_conversation(
        &self,
        auth: &Authorization,
        id: &ConversationId,
    ) -> ApiResult<()> {
        let path = format!("chat/conversations/{id}");
        tracing::debug!(name: "api.request", path = %path, "DELETE");
        let response = auth.apply(self.http.delete(self.url(&path)?)).send().await?;
        Self::check_status(response).await.map(|_| ())
    }

    async fn list_messages(
        &self,
        auth: &Authorization,
        id: &ConversationId,
    ) -> ApiResult<Vec<MessageDto>> {
        let path = format!("chat/conversations/{id}/messages");
        tracing::debug!(name: "api.request", path = %path, "GET");
        Self::send(auth.apply(self.http.get(self.url(&path)?))).await
    }

    async fn send_message(
        &self,
        auth: &Authorization,
        request: &SendMessageRequest,
    ) -> ApiResult<MessageDto> {
        tracing::debug!(
            name: "api.request",
            path = "chat/messages",
            conversation_id = %request.conversation_id,
            content_length = request.content.len(),
            "POST"
        );
        Self::send(auth.apply(self.http.post(self.url("chat/messages")?).json(request))).await
    }
}

/// `Url::join` drops the last path segment unless the base ends with `/`.
fn normalize_base(raw: &str) -> ApiResult<Url> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Pull `message` out of a JSON error body, or use the raw text if it is not JSON.
fn extract_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<ErrorBody>(trimmed) {
        Ok(parsed) => parsed.message.filter(|m| !m.trim().is_empty()),
        Err(_) if trimmed.starts_with('{') => None,
        Err(_) => Some(trimmed.to_string()),
    }
}
