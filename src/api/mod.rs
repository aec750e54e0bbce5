//! Backend service interface.
//!
//! The [`ChatBackend`] trait is the only way the engine talks to the remote
//! service. [`HttpBackend`] implements it over REST with `reqwest`; tests
//! substitute scripted fakes.
//!
//! # Endpoints
//!
//! All paths are relative to the configured base (default `/api`):
//!
//! - `POST /auth/register`, `/auth/login`, `/auth/forgot-password`, `/auth/reset-password`
//! - `GET|POST /chat/conversations`, `DELETE /chat/conversations/{id}`
//! - `GET /chat/conversations/{id}/messages`, `POST /chat/messages`

pub mod auth;
pub mod client;
pub mod error;
pub mod types;

pub use auth::Authorization;
pub use client::HttpBackend;
pub use error::{ApiError, ApiResult};
pub use types::*;

use async_trait::async_trait;

use crate::model::{Conversation, ConversationId};

/// Remote chat service.
///
/// Auth endpoints are unauthenticated. Every chat endpoint takes the
/// [`Authorization`] issued by the session store for that call.
#[async_trait]
pub trait ChatBackend: Send + Sync + std::fmt::Debug {
    // Auth
    async fn register(&self, credentials: &Credentials) -> ApiResult<RegisterResponse>;
    async fn login(&self, credentials: &Credentials) -> ApiResult<LoginResponse>;
    async fn forgot_password(&self, request: &ForgotPasswordRequest) -> ApiResult<MessageResponse>;
    async fn reset_password(&self, request: &ResetPasswordRequest) -> ApiResult<MessageResponse>;

    // Conversations
    async fn list_conversations(&self, auth: &Authorization) -> ApiResult<Vec<Conversation>>;
    async fn create_conversation(&self, auth: &Authorization) -> ApiResult<Conversation>;
    async fn delete_conversation(&self, auth: &Authorization, id: &ConversationId)
    -> ApiResult<()>;

    // Messages
    async fn list_messages(
        &self,
        auth: &Authorization,
        id: &ConversationId,
    ) -> ApiResult<Vec<MessageDto>>;

    /// Send user content; the backend answers with the assistant's reply.
    async fn send_message(
        &self,
        auth: &Authorization,
        request: &SendMessageRequest,
    ) -> ApiResult<MessageDto>;
}
