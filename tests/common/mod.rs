//! Scripted in-process backend for engine tests.
//!
//! Calls can be made to fail (`fail_next`) or to wait until released
//! (`hold_next`), which is how the tests reproduce races deterministically
//! on a single-threaded runtime.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chat_sync_client::api::{
    ApiError, ApiResult, Authorization, ChatBackend, Credentials, ForgotPasswordRequest,
    LoginResponse, MessageDto, MessageResponse, RegisterResponse, ResetPasswordRequest,
    SendMessageRequest,
};
use chat_sync_client::{
    Conversation, ConversationId, KeyValueStore, MemoryStore, MessageId, Role, SessionStore,
    SyncController,
};
use tokio::sync::oneshot;

pub const EMAIL: &str = "u@x.com";
pub const PASSWORD: &str = "secret";
pub const DEFAULT_TITLE: &str = "New";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Register,
    Login,
    ForgotPassword,
    ResetPassword,
    ListConversations,
    CreateConversation,
    DeleteConversation,
    ListMessages,
    SendMessage,
}

#[derive(Debug, Default)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
}

#[derive(Debug, Default)]
struct FakeState {
    conversations: Vec<Conversation>,
    messages: HashMap<ConversationId, Vec<MessageDto>>,
    next_conversation_id: u64,
    next_message_id: u64,
    issued_tokens: u64,
    revoked: bool,
    store_user_turn_first: bool,
    failures: HashMap<Op, VecDeque<ApiError>>,
    holds: HashMap<Op, VecDeque<oneshot::Receiver<()>>>,
    calls: Vec<(Op, Option<String>)>,
}

impl FakeState {
    fn dto(&mut self, conversation: &ConversationId, role: Role, content: &str) -> MessageDto {
        self.next_message_id += 1;
        MessageDto {
            id: MessageId::Remote(format!("m{}", self.next_message_id)),
            conversation_id: Some(conversation.clone()),
            role,
            content: content.to_string(),
            created_at: None,
        }
    }
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scripting
    // ─────────────────────────────────────────────────────────────────────────

    /// Add a conversation on the server side (listed first).
    pub fn seed_conversation(&self, title: &str) -> ConversationId {
        let mut state = self.state();
        state.next_conversation_id += 1;
        let conversation = Conversation::new(state.next_conversation_id, title);
        let id = conversation.id.clone();
        state.conversations.insert(0, conversation);
        id
    }

    /// Add a message on the server side, as if written from another device.
    pub fn seed_message(&self, conversation: &ConversationId, role: Role, content: &str) {
        let mut state = self.state();
        let dto = state.dto(conversation, role, content);
        state
            .messages
            .entry(conversation.clone())
            .or_default()
            .push(dto);
    }

    /// Make the next call of `op` fail with `err`.
    pub fn fail_next(&self, op: Op, err: ApiError) {
        self.state()
            .failures
            .entry(op)
            .or_default()
            .push_back(err);
    }

    /// Make the next call of `op` wait until the returned sender fires (or drops).
    pub fn hold_next(&self, op: Op) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.state().holds.entry(op).or_default().push_back(rx);
        tx
    }

    /// Store the user turn of each send before the reply is produced (and
    /// before any hold), like a backend waiting on a slow model.
    pub fn store_user_turn_first(&self) {
        self.state().store_user_turn_first = true;
    }

    /// Reject every token issued so far with 401.
    pub fn revoke_tokens(&self) {
        self.state().revoked = true;
    }

    pub fn calls(&self) -> Vec<(Op, Option<String>)> {
        self.state().calls.clone()
    }

    pub fn call_count(&self, op: Op) -> usize {
        self.state().calls.iter().filter(|(o, _)| *o == op).count()
    }

    pub fn server_conversations(&self) -> Vec<Conversation> {
        self.state().conversations.clone()
    }

    pub fn server_messages(&self, conversation: &ConversationId) -> Vec<MessageDto> {
        self.state()
            .messages
            .get(conversation)
            .cloned()
            .unwrap_or_default()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Call plumbing
    // ─────────────────────────────────────────────────────────────────────────

    async fn enter(&self, op: Op, auth: Option<&Authorization>) -> ApiResult<()> {
        let hold = {
            let mut state = self.state();
            state
                .calls
                .push((op, auth.and_then(|a| a.token().map(str::to_string))));
            state.holds.get_mut(&op).and_then(VecDeque::pop_front)
        };
        if let Some(hold) = hold {
            let _ = hold.await;
        }

        let mut state = self.state();
        if let Some(err) = state.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            return Err(err);
        }
        if let Some(auth) = auth {
            let valid = auth.token().is_some_and(|t| t.starts_with("token-")) && !state.revoked;
            if !valid {
                return Err(ApiError::Unauthorized {
                    message: Some("Token expired".into()),
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ChatBackend for FakeBackend {
    async fn register(&self, credentials: &Credentials) -> ApiResult<RegisterResponse> {
        self.enter(Op::Register, None).await?;
        Ok(RegisterResponse {
            email: Some(credentials.email.clone()),
            token: None,
            message: Some("Registered".into()),
        })
    }

    async fn login(&self, credentials: &Credentials) -> ApiResult<LoginResponse> {
        self.enter(Op::Login, None).await?;
        if credentials.password != PASSWORD {
            return Err(ApiError::Unauthorized {
                message: Some("Invalid credentials".into()),
            });
        }
        let mut state = self.state();
        state.issued_tokens += 1;
        state.revoked = false;
        Ok(LoginResponse {
            token: format!("token-{}", state.issued_tokens),
            email: credentials.email.clone(),
        })
    }

    async fn forgot_password(&self, _request: &ForgotPasswordRequest) -> ApiResult<MessageResponse> {
        self.enter(Op::ForgotPassword, None).await?;
        Ok(MessageResponse { message: None })
    }

    async fn reset_password(&self, _request: &ResetPasswordRequest) -> ApiResult<MessageResponse> {
        self.enter(Op::ResetPassword, None).await?;
        Ok(MessageResponse {
            message: Some("Password updated".into()),
        })
    }

    async fn list_conversations(&self, auth: &Authorization) -> ApiResult<Vec<Conversation>> {
        self.enter(Op::ListConversations, Some(auth)).await?;
        Ok(self.server_conversations())
    }

    async fn create_conversation(&self, auth: &Authorization) -> ApiResult<Conversation> {
        self.enter(Op::CreateConversation, Some(auth)).await?;
        let id = self.seed_conversation(DEFAULT_TITLE);
        Ok(Conversation::new(id.as_str(), DEFAULT_TITLE))
    }

    async fn delete_conversation(&self, auth: &Authorization, id: &ConversationId) -> ApiResult<()> {
        self.enter(Op::DeleteConversation, Some(auth)).await?;
        let mut state = self.state();
        let before = state.conversations.len();
        state.conversations.retain(|c| &c.id != id);
        if state.conversations.len() == before {
            return Err(ApiError::Api {
                status: 404,
                message: Some("Conversation not found".into()),
            });
        }
        state.messages.remove(id);
        Ok(())
    }

    async fn list_messages(
        &self,
        auth: &Authorization,
        id: &ConversationId,
    ) -> ApiResult<Vec<MessageDto>> {
        self.enter(Op::ListMessages, Some(auth)).await?;
        Ok(self.server_messages(id))
    }

    async fn send_message(
        &self,
        auth: &Authorization,
        request: &SendMessageRequest,
    ) -> ApiResult<MessageDto> {
        let conversation = request.conversation_id.clone();
        let stored_early = {
            let mut state = self.state();
            let early = state.store_user_turn_first;
            if early {
                let user = state.dto(&conversation, Role::User, &request.content);
                state.messages.entry(conversation.clone()).or_default().push(user);
            }
            early
        };
        self.enter(Op::SendMessage, Some(auth)).await?;
        let mut state = self.state();
        if !stored_early {
            let user = state.dto(&conversation, Role::User, &request.content);
            state.messages.entry(conversation.clone()).or_default().push(user);
        }
        let reply = state.dto(&conversation, Role::Assistant, &format!("echo: {}", request.content));
        state
            .messages
            .entry(conversation.clone())
            .or_default()
            .push(reply.clone());
        // The server derives a title from the first exchange.
        if let Some(c) = state
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation && c.title == DEFAULT_TITLE)
        {
            c.title = request.content.clone();
        }
        Ok(reply)
    }
}

// =============================================================================
// Fixtures
// =============================================================================

pub fn controller_with(backend: &Arc<FakeBackend>, storage: Arc<MemoryStore>) -> SyncController {
    let backend = Arc::clone(backend) as Arc<dyn ChatBackend>;
    let storage: Arc<dyn KeyValueStore> = storage;
    SyncController::new(SessionStore::new(backend, storage))
}

pub fn controller(backend: &Arc<FakeBackend>) -> SyncController {
    controller_with(backend, Arc::new(MemoryStore::new()))
}

/// A controller that has already signed in and loaded its list.
pub async fn signed_in(backend: &Arc<FakeBackend>) -> SyncController {
    let controller = controller(backend);
    controller.login(EMAIL, PASSWORD).await.unwrap();
    controller
}

pub fn network_down() -> ApiError {
    ApiError::Network("connection refused".into())
}

pub fn server_error(message: &str) -> ApiError {
    ApiError::Api {
        status: 500,
        message: Some(message.into()),
    }
}
