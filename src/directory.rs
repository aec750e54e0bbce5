//! Conversation directory: the conversation list and the active selection.
//!
//! Membership always reflects the last successful fetch. `create` splices
//! the new conversation in front once the backend has acknowledged it;
//! `delete` is not optimistic and only touches the list after the backend
//! confirms.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{ClientError, Result};
use crate::model::{Conversation, ConversationId, Message};
use crate::session::SessionStore;
use crate::timeline::MessageTimeline;

/// Ordered conversation list plus the active selection.
///
/// Cheap to clone; all clones share the same state.
#[derive(Debug, Clone)]
pub struct ConversationDirectory {
    inner: Arc<DirectoryInner>,
}

#[derive(Debug)]
struct DirectoryInner {
    session: SessionStore,
    timeline: MessageTimeline,
    state: RwLock<DirectoryState>,
}

#[derive(Debug, Default)]
struct DirectoryState {
    conversations: Vec<Conversation>,
    active: Option<ConversationId>,
    /// Tags list fetches so an older response never overwrites a newer one.
    list_generation: u64,
}

impl DirectoryInner {
    fn state(&self) -> RwLockReadGuard<'_, DirectoryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_mut(&self) -> RwLockWriteGuard<'_, DirectoryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ConversationDirectory {
    /// Create an empty directory driving `timeline`.
    ///
    /// The directory clears itself whenever the session is torn down.
    pub fn new(session: SessionStore, timeline: MessageTimeline) -> Self {
        let inner = Arc::new(DirectoryInner {
            session: session.clone(),
            timeline,
            state: RwLock::new(DirectoryState::default()),
        });
        let weak = Arc::downgrade(&inner);
        session.on_teardown(move || {
            if let Some(inner) = weak.upgrade() {
                let mut state = inner.state_mut();
                state.conversations.clear();
                state.active = None;
                state.list_generation += 1;
            }
        });
        Self { inner }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Snapshots
    // ─────────────────────────────────────────────────────────────────────────

    #[must_use]
    pub fn conversations(&self) -> Vec<Conversation> {
        self.inner.state().conversations.clone()
    }

    #[must_use]
    pub fn active(&self) -> Option<ConversationId> {
        self.inner.state().active.clone()
    }

    /// The active conversation's full record, if it is in the list.
    #[must_use]
    pub fn active_conversation(&self) -> Option<Conversation> {
        let state = self.inner.state();
        let active = state.active.as_ref()?;
        state
            .conversations
            .iter()
            .find(|c| &c.id == active)
            .cloned()
    }

    #[must_use]
    pub fn timeline(&self) -> &MessageTimeline {
        &self.inner.timeline
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Fetch the conversation list and replace the local one.
    ///
    /// Failure is not fatal: it is logged and the previous list is kept.
    /// Returns the list as it stands afterwards.
    pub async fn list(&self) -> Vec<Conversation> {
        let ticket = {
            let mut state = self.inner.state_mut();
            state.list_generation += 1;
            state.list_generation
        };

        let backend = self.inner.session.backend();
        let outcome = self
            .inner
            .session
            .call(move |auth| async move { backend.list_conversations(&auth).await })
            .await;

        let mut state = self.inner.state_mut();
        match outcome {
            Ok(conversations) if state.list_generation == ticket => {
                tracing::debug!(
                    name: "directory.listed",
                    count = conversations.len(),
                    "Conversation list refreshed"
                );
                state.conversations = conversations;
            }
            Ok(_) => {
                tracing::debug!(name: "directory.list.stale", "Discarding superseded conversation list");
            }
            Err(ClientError::SessionEnded) => {}
            Err(err) => {
                tracing::warn!(
                    name: "directory.list.failed",
                    error = %err,
                    "Failed to refresh conversations; keeping previous list"
                );
            }
        }
        state.conversations.clone()
    }

    /// Create a conversation and make it active with an empty timeline.
    ///
    /// Nothing changes locally unless the backend acknowledges the creation.
    pub async fn create(&self) -> Result<Conversation> {
        let backend = self.inner.session.backend();
        let created = self
            .inner
            .session
            .call(move |auth| async move { backend.create_conversation(&auth).await })
            .await
            .map_err(|err| match err {
                ClientError::SessionEnded => err,
                other => ClientError::Creation(Box::new(other)),
            })?;

        {
            let mut state = self.inner.state_mut();
            state.conversations.retain(|c| c.id != created.id);
            state.conversations.insert(0, created.clone());
            state.active = Some(created.id.clone());
            // Any list fetched before this point predates the new conversation.
            state.list_generation += 1;
        }
        self.inner.timeline.show_empty(created.id.clone());

        tracing::info!(
            name: "directory.created",
            conversation_id = %created.id,
            "Conversation created"
        );
        Ok(created)
    }

    /// Make `id` the active conversation and reload its timeline.
    ///
    /// If another selection happens before the reload resolves, this reload's
    /// result is discarded.
    pub async fn select(&self, id: &ConversationId) -> Result<Vec<Message>> {
        self.inner.state_mut().active = Some(id.clone());
        tracing::debug!(name: "directory.selected", conversation_id = %id, "Conversation selected");
        self.inner.timeline.reload(id).await
    }

    /// Delete a conversation on the backend, then locally.
    ///
    /// Deleting the active conversation clears the selection and the
    /// timeline. On failure the list is left untouched.
    pub async fn delete(&self, id: &ConversationId) -> Result<()> {
        let backend = self.inner.session.backend();
        let target = id.clone();
        self.inner
            .session
            .call(move |auth| async move { backend.delete_conversation(&auth, &target).await })
            .await?;

        let was_active = {
            let mut state = self.inner.state_mut();
            state.conversations.retain(|c| &c.id != id);
            state.list_generation += 1;
            let was_active = state.active.as_ref() == Some(id);
            if was_active {
                state.active = None;
            }
            was_active
        };
        if was_active {
            self.inner.timeline.clear();
        }

        tracing::info!(
            name: "directory.deleted",
            conversation_id = %id,
            was_active = was_active,
            "Conversation deleted"
        );
        Ok(())
    }
}
