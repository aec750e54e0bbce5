//! Message timeline for the active conversation.
//!
//! The timeline shows exactly one conversation at a time. User messages are
//! appended optimistically with a client-assigned [`MessageId::Local`] and
//! then either committed when the assistant reply arrives or removed (by
//! that id, never by position) when the send fails.
//!
//! Every reset bumps a generation counter. A reload only applies its result
//! if the generation it was issued under is still current, so a slow reload
//! for a conversation the user has already left is discarded.
//!
//! A send is tagged with its origin conversation and local id. Its reply is
//! applied only while that local message is still in the timeline; after a
//! switch the reply is dropped here and shows up on the next reload instead.
//! A send whose future is dropped before the backend answers releases its
//! conversation and removes its pending message.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::api::SendMessageRequest;
use crate::error::{ClientError, Result, ValidationError};
use crate::model::{ConversationId, Message, MessageId, MessageStatus, Role};
use crate::session::SessionStore;

/// Ordered messages of the active conversation.
///
/// Cheap to clone; all clones share the same state.
#[derive(Debug, Clone)]
pub struct MessageTimeline {
    inner: Arc<TimelineInner>,
}

#[derive(Debug)]
struct TimelineInner {
    session: SessionStore,
    state: RwLock<TimelineState>,
}

#[derive(Debug, Default)]
struct TimelineState {
    conversation: Option<ConversationId>,
    messages: Vec<Message>,
    generation: u64,
    /// Last local id handed out. Never reset, so ids stay unique for the
    /// lifetime of the timeline.
    last_local_id: u64,
    /// In-flight sends: conversation -> local id of the pending user message.
    sending: HashMap<ConversationId, u64>,
}

impl TimelineState {
    /// Drop the in-flight claim of `local_id` on `conversation`, if it still holds it.
    fn release(&mut self, conversation: &ConversationId, local_id: u64) {
        if self.sending.get(conversation) == Some(&local_id) {
            self.sending.remove(conversation);
        }
    }
}

/// Claim on a conversation held for the duration of one send.
///
/// Dropped unsettled (the send future was cancelled), it releases the claim
/// and removes the pending message.
struct InFlight {
    inner: Arc<TimelineInner>,
    conversation: ConversationId,
    local_id: u64,
    settled: bool,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.inner.state_mut();
        state.release(&self.conversation, self.local_id);
        let local = MessageId::Local(self.local_id);
        state.messages.retain(|m| m.id != local);
        tracing::debug!(
            name: "timeline.send.abandoned",
            conversation_id = %self.conversation,
            local_id = self.local_id,
            "Send cancelled before completion; optimistic message removed"
        );
    }
}

impl TimelineInner {
    fn state(&self) -> RwLockReadGuard<'_, TimelineState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_mut(&self) -> RwLockWriteGuard<'_, TimelineState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Show `conversation` with no committed messages; returns the new
    /// generation. Pending sends survive a reset to the same conversation.
    fn reset(&self, conversation: Option<ConversationId>) -> u64 {
        let mut state = self.state_mut();
        if state.conversation == conversation {
            state.messages.retain(Message::is_pending);
        } else {
            state.messages.clear();
        }
        state.conversation = conversation;
        state.generation += 1;
        state.generation
    }

    fn teardown(&self) {
        self.reset(None);
        let mut state = self.state_mut();
        state.messages.clear();
        state.sending.clear();
    }
}

impl MessageTimeline {
    /// Create an empty timeline bound to `session`.
    ///
    /// The timeline clears itself whenever the session is torn down.
    pub fn new(session: SessionStore) -> Self {
        let inner = Arc::new(TimelineInner {
            session: session.clone(),
            state: RwLock::new(TimelineState::default()),
        });
        let weak = Arc::downgrade(&inner);
        session.on_teardown(move || {
            if let Some(inner) = weak.upgrade() {
                inner.teardown();
            }
        });
        Self { inner }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Snapshots
    // ─────────────────────────────────────────────────────────────────────────

    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.inner.state().messages.clone()
    }

    /// Conversation currently shown, if any.
    #[must_use]
    pub fn conversation(&self) -> Option<ConversationId> {
        self.inner.state().conversation.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.state().messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a send is in flight for `conversation`.
    #[must_use]
    pub fn is_sending(&self, conversation: &ConversationId) -> bool {
        self.inner.state().sending.contains_key(conversation)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Loading
    // ─────────────────────────────────────────────────────────────────────────

    /// Show `conversation` with an empty timeline, without fetching.
    ///
    /// Used for a conversation that was just created.
    pub fn show_empty(&self, conversation: ConversationId) {
        self.inner.reset(Some(conversation));
    }

    /// Show nothing.
    pub fn clear(&self) {
        self.inner.reset(None);
    }

    /// Replace the timeline with the backend's messages for `conversation`.
    ///
    /// The timeline switches to `conversation` immediately, keeping only its
    /// pending sends, which end up after the fetched messages. A pending
    /// message the backend has already stored is shown once. Messages with
    /// an unknown role are skipped. If another reset happens before the
    /// fetch resolves, the fetched messages are discarded and the current
    /// timeline is returned unchanged.
    pub async fn reload(&self, conversation: &ConversationId) -> Result<Vec<Message>> {
        let ticket = self.inner.reset(Some(conversation.clone()));

        let backend = self.inner.session.backend();
        let id = conversation.clone();
        let outcome = self
            .inner
            .session
            .call(move |auth| async move { backend.list_messages(&auth, &id).await })
            .await;

        let mut state = self.inner.state_mut();
        let fetched = match outcome {
            // Session-level failures are reported even for a stale reload.
            Err(err) if err.is_auth() || matches!(err, ClientError::SessionEnded) => return Err(err),
            _ if state.generation != ticket => {
                tracing::debug!(
                    name: "timeline.reload.stale",
                    conversation_id = %conversation,
                    "Discarding reload for a conversation no longer shown"
                );
                return Ok(state.messages.clone());
            }
            Err(err) => {
                tracing::warn!(
                    name: "timeline.reload.failed",
                    conversation_id = %conversation,
                    error = %err,
                    "Failed to load messages"
                );
                return Err(err);
            }
            Ok(fetched) => fetched,
        };

        let pending: Vec<Message> = state
            .messages
            .drain(..)
            .filter(Message::is_pending)
            .collect();
        let mut history: Vec<Message> = fetched
            .into_iter()
            .filter(|dto| dto.role != Role::Other)
            .map(|dto| dto.into_message(conversation))
            .collect();
        // The backend may store the user turn before it replies; the local
        // copy stays so the send can still commit or roll back by id.
        for message in pending.iter().rev() {
            if history
                .last()
                .is_some_and(|last| last.role == Role::User && last.content == message.content)
            {
                history.pop();
            }
        }
        history.extend(pending);
        state.messages = history;

        tracing::debug!(
            name: "timeline.reloaded",
            conversation_id = %conversation,
            message_count = state.messages.len(),
            "Timeline reloaded"
        );
        Ok(state.messages.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Optimistic delivery
    // ─────────────────────────────────────────────────────────────────────────

    /// Send `content` to the conversation currently shown.
    ///
    /// 1. A pending user message with a fresh local id is appended at once.
    /// 2. On success it is marked committed and the assistant reply is
    ///    appended after it; the reply is returned.
    /// 3. On failure exactly that message is removed and
    ///    [`ClientError::AiResponse`] is returned.
    ///
    /// Only one send per conversation may be in flight.
    pub async fn send(&self, content: &str) -> Result<Message> {
        if content.trim().is_empty() {
            return Err(ValidationError::EmptyMessage.into());
        }

        let (conversation, local_id) = {
            let mut state = self.inner.state_mut();
            let Some(conversation) = state.conversation.clone() else {
                return Err(ValidationError::NoConversation.into());
            };
            if state.sending.contains_key(&conversation) {
                return Err(ClientError::SendInProgress);
            }
            state.last_local_id += 1;
            let local_id = state.last_local_id;
            state.sending.insert(conversation.clone(), local_id);
            state
                .messages
                .push(Message::pending_user(local_id, conversation.clone(), content));
            (conversation, local_id)
        };
        let mut in_flight = InFlight {
            inner: Arc::clone(&self.inner),
            conversation: conversation.clone(),
            local_id,
            settled: false,
        };

        tracing::debug!(
            name: "timeline.send.started",
            conversation_id = %conversation,
            local_id = local_id,
            "Optimistic message appended"
        );

        let backend = self.inner.session.backend();
        let request = SendMessageRequest {
            conversation_id: conversation.clone(),
            content: content.to_string(),
        };
        let outcome = self
            .inner
            .session
            .call(move |auth| async move { backend.send_message(&auth, &request).await })
            .await;
        in_flight.settled = true;

        let mut state = self.inner.state_mut();
        state.release(&conversation, local_id);
        let local = MessageId::Local(local_id);
        let position = state
            .messages
            .iter()
            .position(|m| m.id == local && m.conversation_id == conversation);

        match outcome {
            Ok(dto) => {
                let reply = dto.into_message(&conversation);
                if let Some(index) = position {
                    state.messages[index].status = MessageStatus::Committed;
                    state.messages.push(reply.clone());
                    tracing::debug!(
                        name: "timeline.send.committed",
                        conversation_id = %conversation,
                        local_id = local_id,
                        "Reply received"
                    );
                } else {
                    tracing::info!(
                        name: "timeline.send.detached",
                        conversation_id = %conversation,
                        local_id = local_id,
                        "Reply arrived after the timeline moved on; not displayed"
                    );
                }
                Ok(reply)
            }
            Err(err) => {
                if let Some(index) = position {
                    state.messages.remove(index);
                }
                tracing::warn!(
                    name: "timeline.send.rolled_back",
                    conversation_id = %conversation,
                    local_id = local_id,
                    error = %err,
                    "Send failed; optimistic message removed"
                );
                match err {
                    ClientError::SessionEnded => Err(err),
                    other => Err(ClientError::AiResponse(Box::new(other))),
                }
            }
        }
    }
}
