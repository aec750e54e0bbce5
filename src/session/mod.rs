//! Session lifecycle: the authentication credential and everything tied to it.
//!
//! The [`SessionStore`] is the single holder of the bearer token. Every
//! protected backend call goes through [`SessionStore::call`], which attaches
//! the token, tears the whole client state down on a 401, and drops results
//! that resolve after the session they were issued under has ended.
//!
//! # Architecture
//!
//! - [`Session`]: token and identity snapshot
//! - [`SessionStore`]: cloneable handle shared by the directory, timeline and controller
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use chat_sync_client::api::HttpBackend;
//! use chat_sync_client::session::SessionStore;
//! use chat_sync_client::storage::{MemoryStore, TOKEN_KEY, EMAIL_KEY};
//!
//! let backend = Arc::new(HttpBackend::new("http://localhost:8080/api").unwrap());
//! let storage = Arc::new(MemoryStore::with_entries([(TOKEN_KEY, "t"), (EMAIL_KEY, "u@x.com")]));
//! let session = SessionStore::new(backend, storage);
//!
//! assert!(session.is_authenticated());
//! assert_eq!(session.authorize().token(), Some("t"));
//! ```

mod account;
mod store;

pub use store::{Session, SessionStore};
