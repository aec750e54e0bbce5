//! Chat Sync Client
//!
//! Client-side engine for conversing with a remote AI chat backend. It keeps
//! the conversation list, the message timeline of the active conversation,
//! and a session bound to a bearer token, and reconciles optimistic local
//! state with the backend across asynchronous round trips.
//!
//! # Architecture
//!
//! - **Session Store**: holds the token, authenticates every protected call,
//!   tears all state down on logout or a 401
//! - **Conversation Directory**: conversation list, creation, deletion, active selection
//! - **Message Timeline**: optimistic delivery with precise rollback
//! - **Synchronization Controller**: single entry point and error slot for a renderer
//!
//! Every component is a cheap `Clone` handle over shared state. Mutations
//! happen between suspension points, so the engine behaves the same on a
//! single-threaded runtime as on a multi-threaded one.
//!
//! # Modules
//!
//! - [`api`]: backend interface, wire types and the `reqwest` client
//! - [`session`]: session lifecycle and account operations
//! - [`directory`]: conversation directory
//! - [`timeline`]: message timeline
//! - [`controller`]: synchronization controller and render snapshots
//! - [`storage`]: durable key/value storage for client state
//! - [`config`]: CLI and layered configuration
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chat_sync_client::{HttpBackend, MemoryStore, SessionStore, SyncController};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = Arc::new(HttpBackend::new("http://localhost:8080/api")?);
//! let session = SessionStore::new(backend, Arc::new(MemoryStore::new()));
//! let controller = SyncController::new(session);
//!
//! controller.login("u@x.com", "secret").await?;
//! controller.send_message("hi").await?;
//! assert_eq!(controller.snapshot().messages.len(), 2);
//! # Ok(())
//! # }
//! ```

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]

pub mod api;
pub mod config;
pub mod controller;
pub mod directory;
pub mod error;
pub mod model;
pub mod session;
pub mod storage;
pub mod timeline;

pub use api::{ApiError, ChatBackend, HttpBackend};
pub use controller::{Snapshot, SyncController, View};
pub use directory::ConversationDirectory;
pub use error::{ClientError, ValidationError};
pub use model::{Conversation, ConversationId, Message, MessageId, MessageStatus, Role, Theme};
pub use session::{Session, SessionStore};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore};
pub use timeline::MessageTimeline;
