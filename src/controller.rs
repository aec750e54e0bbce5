//! Synchronization controller: the single entry point for the renderer.
//!
//! Sequences directory and timeline operations, owns the one error slot the
//! renderer displays, and hands out immutable [`Snapshot`]s.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::task::JoinHandle;

use crate::api::RegisterResponse;
use crate::directory::ConversationDirectory;
use crate::error::{ClientError, Result, ValidationError};
use crate::model::{Conversation, ConversationId, Message, Theme};
use crate::session::{Session, SessionStore};
use crate::timeline::MessageTimeline;

/// Heading shown when no conversation is active.
pub const DEFAULT_HEADING: &str = "Gemini Chat";

/// Which top-level view the renderer should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Signed out: login / register / password recovery.
    SignIn,
    /// Signed in: sidebar plus chat area.
    Chat,
}

/// Immutable copy of everything the renderer displays.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub view: View,
    pub identity: Option<String>,
    pub theme: Theme,
    pub conversations: Vec<Conversation>,
    pub active: Option<ConversationId>,
    pub messages: Vec<Message>,
    /// A send is in flight for the active conversation.
    pub sending: bool,
    /// Latest human-readable failure.
    pub error: Option<String>,
}

impl Snapshot {
    /// Title of the active conversation, or the default heading.
    #[must_use]
    pub fn heading(&self) -> &str {
        self.active
            .as_ref()
            .and_then(|id| self.conversations.iter().find(|c| &c.id == id))
            .map_or(DEFAULT_HEADING, |c| c.title.as_str())
    }
}

/// Clears the lazy-creation flag when dropped, also when the send is cancelled.
struct CreationClaim<'a>(&'a Mutex<bool>);

impl Drop for CreationClaim<'_> {
    fn drop(&mut self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = false;
    }
}

/// Orchestrates the session, directory and timeline.
///
/// Every operation records its outcome in the error slot: failures set it,
/// successes clear it. Results that arrive after the session ended are
/// dropped silently.
#[derive(Debug, Clone)]
pub struct SyncController {
    session: SessionStore,
    directory: ConversationDirectory,
    timeline: MessageTimeline,
    error: Arc<RwLock<Option<String>>>,
    /// Set while a send is waiting for its conversation to be created.
    creating: Arc<Mutex<bool>>,
    refresh: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SyncController {
    /// Wire a directory and timeline to `session`.
    pub fn new(session: SessionStore) -> Self {
        let timeline = MessageTimeline::new(session.clone());
        let directory = ConversationDirectory::new(session.clone(), timeline.clone());
        let error: Arc<RwLock<Option<String>>> = Arc::default();

        let weak = Arc::downgrade(&error);
        session.on_teardown(move || {
            if let Some(error) = weak.upgrade() {
                *error.write().unwrap_or_else(PoisonError::into_inner) = None;
            }
        });

        Self {
            session,
            directory,
            timeline,
            error,
            creating: Arc::default(),
            refresh: Arc::default(),
        }
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    #[must_use]
    pub fn directory(&self) -> &ConversationDirectory {
        &self.directory
    }

    #[must_use]
    pub fn timeline(&self) -> &MessageTimeline {
        &self.timeline
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Error slot
    // ─────────────────────────────────────────────────────────────────────────

    /// Latest failure, cleared by the next successful operation.
    #[must_use]
    pub fn error_state(&self) -> Option<String> {
        self.error
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear_error(&self) {
        self.set_error(None);
    }

    fn set_error(&self, message: Option<String>) {
        *self.error.write().unwrap_or_else(PoisonError::into_inner) = message;
    }

    /// Record an operation's outcome in the error slot and pass it through.
    fn settle_outcome<T>(&self, outcome: Result<T>) -> Result<T> {
        match &outcome {
            Ok(_) => self.clear_error(),
            Err(err) if err.is_displayable() => self.set_error(Some(err.to_string())),
            Err(_) => {}
        }
        outcome
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Session
    // ─────────────────────────────────────────────────────────────────────────

    /// Sign in, then load the conversation list.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let session = self.settle_outcome(self.session.login(email, password).await)?;
        self.directory.list().await;
        Ok(session)
    }

    /// Sign out and drop all client state.
    pub fn logout(&self) {
        self.session.logout();
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        confirm: &str,
    ) -> Result<RegisterResponse> {
        self.settle_outcome(self.session.register(email, password, confirm).await)
    }

    pub async fn forgot_password(&self, email: &str) -> Result<String> {
        self.settle_outcome(self.session.forgot_password(email).await)
    }

    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
        confirm: &str,
    ) -> Result<String> {
        self.settle_outcome(
            self.session
                .reset_password(token, new_password, confirm)
                .await,
        )
    }

    pub fn toggle_theme(&self) -> Theme {
        self.session.toggle_theme()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Conversations
    // ─────────────────────────────────────────────────────────────────────────

    /// Refresh the conversation list. Failures are logged, never shown.
    pub async fn refresh_conversations(&self) -> Vec<Conversation> {
        self.directory.list().await
    }

    /// Start an empty conversation and make it active.
    pub async fn new_conversation(&self) -> Result<Conversation> {
        self.settle_outcome(self.directory.create().await)
    }

    pub async fn select_conversation(&self, id: &ConversationId) -> Result<Vec<Message>> {
        self.settle_outcome(self.directory.select(id).await)
    }

    pub async fn delete_conversation(&self, id: &ConversationId) -> Result<()> {
        self.settle_outcome(self.directory.delete(id).await)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Messages
    // ─────────────────────────────────────────────────────────────────────────

    /// Send `content` to the active conversation, creating one first if
    /// none is active.
    ///
    /// If creation fails nothing is sent and nothing is appended. After a
    /// successful send the conversation list is refreshed in the background
    /// (titles may change after the first exchange); see [`Self::settle`].
    pub async fn send_message(&self, content: &str) -> Result<Message> {
        let outcome = self.deliver(content).await;
        let outcome = self.settle_outcome(outcome);
        if outcome.is_ok() {
            self.spawn_refresh();
        }
        outcome
    }

    async fn deliver(&self, content: &str) -> Result<Message> {
        if content.trim().is_empty() {
            return Err(ValidationError::EmptyMessage.into());
        }

        if self.directory.active().is_none() {
            let claim = {
                let mut creating = self.creating.lock().unwrap_or_else(PoisonError::into_inner);
                if *creating {
                    return Err(ClientError::SendInProgress);
                }
                *creating = true;
                CreationClaim(&self.creating)
            };
            let created = self.directory.create().await;
            drop(claim);
            let created = created?;
            tracing::debug!(
                name: "controller.lazy_create",
                conversation_id = %created.id,
                "Created conversation for first message"
            );
        }

        self.timeline.send(content).await
    }

    /// Best-effort list refresh; never blocks or rolls back the send.
    fn spawn_refresh(&self) {
        let directory = self.directory.clone();
        let handle = tokio::spawn(async move {
            directory.list().await;
        });
        let previous = self
            .refresh
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        // An older refresh still running is simply superseded.
        drop(previous);
    }

    /// Wait for the background refresh started by the last send, if any.
    pub async fn settle(&self) {
        let handle = self
            .refresh
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!(name: "controller.refresh.join_failed", error = %e, "Background refresh task failed");
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Snapshot
    // ─────────────────────────────────────────────────────────────────────────

    /// Copy of the current state for rendering.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let session = self.session.session();
        let active = self.directory.active();
        let sending = active
            .as_ref()
            .is_some_and(|id| self.timeline.is_sending(id));
        Snapshot {
            view: if session.is_authenticated() {
                View::Chat
            } else {
                View::SignIn
            },
            identity: session.identity,
            theme: self.session.theme(),
            conversations: self.directory.conversations(),
            active,
            messages: self.timeline.messages(),
            sending,
            error: self.error_state(),
        }
    }
}
