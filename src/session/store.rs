//! Session store: credential holder and gate for protected calls.

use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::api::{ApiError, ApiResult, Authorization, ChatBackend, Credentials};
use crate::error::{
    ClientError, INVALID_CREDENTIALS, NOT_SIGNED_IN, Result, ValidationError,
};
use crate::model::Theme;
use crate::storage::{EMAIL_KEY, KeyValueStore, THEME_KEY, TOKEN_KEY};

/// Token and identity of the signed-in user.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
    pub identity: Option<String>,
}

impl Session {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("identity", &self.identity)
            .finish()
    }
}

type TeardownHook = Box<dyn Fn() + Send + Sync>;

/// Process-wide holder of the authentication credential.
///
/// Cheap to clone; all clones share the same state. Other components
/// register teardown hooks with [`SessionStore::on_teardown`] so that a
/// logout or a rejected call clears everything derived from the session.
#[derive(Clone)]
pub struct SessionStore {
    pub(super) inner: Arc<SessionStoreInner>,
}

pub(super) struct SessionStoreInner {
    pub(super) backend: Arc<dyn ChatBackend>,
    storage: Arc<dyn KeyValueStore>,
    state: RwLock<SessionState>,
    teardown_hooks: RwLock<Vec<TeardownHook>>,
}

#[derive(Debug, Default)]
struct SessionState {
    session: Session,
    theme: Theme,
    /// Bumped on every login and teardown; tags in-flight calls.
    epoch: u64,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &*self.state())
            .field("backend", &self.inner.backend)
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Create the store, re-deriving the session from persisted values.
    pub fn new(backend: Arc<dyn ChatBackend>, storage: Arc<dyn KeyValueStore>) -> Self {
        let token = storage.get(TOKEN_KEY).filter(|t| !t.is_empty());
        // An identity without a token is meaningless.
        let identity = token.as_ref().and_then(|_| storage.get(EMAIL_KEY));
        let theme = storage
            .get(THEME_KEY)
            .map_or_else(Theme::default, |raw| Theme::parse(&raw));

        if token.is_some() {
            tracing::info!(
                name: "session.restored",
                identity = identity.as_deref().unwrap_or("<unknown>"),
                "Restored session from storage"
            );
        }

        Self {
            inner: Arc::new(SessionStoreInner {
                backend,
                storage,
                state: RwLock::new(SessionState {
                    session: Session { token, identity },
                    theme,
                    epoch: 0,
                }),
                teardown_hooks: RwLock::new(Vec::new()),
            }),
        }
    }

    fn state(&self) -> RwLockReadGuard<'_, SessionState> {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn state_mut(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// The backend every component talks to.
    #[must_use]
    pub fn backend(&self) -> Arc<dyn ChatBackend> {
        Arc::clone(&self.inner.backend)
    }

    /// Snapshot of the current session.
    #[must_use]
    pub fn session(&self) -> Session {
        self.state().session.clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state().session.is_authenticated()
    }

    #[must_use]
    pub fn identity(&self) -> Option<String> {
        self.state().session.identity.clone()
    }

    /// Counter identifying the current session; changes on login and teardown.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.state().epoch
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Login / logout
    // ─────────────────────────────────────────────────────────────────────────

    /// Sign in and persist the credential.
    ///
    /// On failure the backend's message is returned as an auth error, or a
    /// generic network message if the backend could not be reached.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let email = email.trim();
        if email.is_empty() {
            return Err(ValidationError::EmptyEmail.into());
        }

        let credentials = Credentials {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self.inner.backend.login(&credentials).await.map_err(|err| {
            tracing::info!(name: "session.login.failed", error = %err, "Login failed");
            match ClientError::from_account_api(&err, INVALID_CREDENTIALS) {
                ClientError::Application { message, .. } => ClientError::Auth { message },
                other => other,
            }
        })?;

        if self.is_authenticated() {
            // Switching users: nothing from the previous session may leak through.
            self.run_teardown_hooks();
        }

        let session = Session {
            token: Some(response.token),
            identity: Some(response.email),
        };
        {
            let mut state = self.state_mut();
            state.session = session.clone();
            state.epoch += 1;
        }
        self.persist(TOKEN_KEY, session.token.as_deref());
        self.persist(EMAIL_KEY, session.identity.as_deref());

        tracing::info!(
            name: "session.login.succeeded",
            identity = session.identity.as_deref().unwrap_or_default(),
            "Signed in"
        );
        Ok(session)
    }

    /// Clear the session, persisted state and all dependent state.
    ///
    /// Unconditional: safe to call when already signed out.
    pub fn logout(&self) {
        {
            let mut state = self.state_mut();
            state.session = Session::default();
            state.theme = Theme::default();
            state.epoch += 1;
        }
        if let Err(e) = self.inner.storage.clear() {
            tracing::warn!(name: "storage.clear.failed", error = %e, "Failed to clear stored state");
        }
        self.run_teardown_hooks();
        tracing::info!(name: "session.teardown", "Session cleared");
    }

    /// React to an authentication-rejected response from any protected call.
    pub fn on_unauthorized(&self) {
        tracing::warn!(name: "session.unauthorized", "Backend rejected credentials; signing out");
        self.logout();
    }

    /// Register a callback run whenever the session is torn down.
    pub fn on_teardown(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.inner
            .teardown_hooks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(hook));
    }

    fn run_teardown_hooks(&self) {
        let hooks = self
            .inner
            .teardown_hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        for hook in hooks.iter() {
            hook();
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Protected calls
    // ─────────────────────────────────────────────────────────────────────────

    /// Credentials for an outbound request; empty when signed out.
    #[must_use]
    pub fn authorize(&self) -> Authorization {
        self.state()
            .session
            .token
            .as_ref()
            .map_or_else(Authorization::none, Authorization::bearer)
    }

    /// Run a protected backend call under the current session.
    ///
    /// - Signed out: fails with an auth error without calling `op`.
    /// - 401: tears the session down, then returns the auth error.
    /// - Session changed while `op` was in flight: the result is dropped and
    ///   [`ClientError::SessionEnded`] is returned.
    pub async fn call<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: FnOnce(Authorization) -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let (auth, epoch) = {
            let state = self.state();
            match &state.session.token {
                Some(token) => (Authorization::bearer(token.clone()), state.epoch),
                None => return Err(ClientError::auth(NOT_SIGNED_IN)),
            }
        };

        let outcome = op(auth).await;

        if self.epoch() != epoch {
            tracing::debug!(
                name: "session.call.stale",
                issued_epoch = epoch,
                "Dropping result from an ended session"
            );
            return Err(ClientError::SessionEnded);
        }

        outcome.map_err(|err| {
            let unauthorized = matches!(err, ApiError::Unauthorized { .. });
            let classified = ClientError::from_api(err);
            if unauthorized {
                self.on_unauthorized();
            }
            classified
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Preferences
    // ─────────────────────────────────────────────────────────────────────────

    #[must_use]
    pub fn theme(&self) -> Theme {
        self.state().theme
    }

    pub fn set_theme(&self, theme: Theme) {
        self.state_mut().theme = theme;
        self.persist(THEME_KEY, Some(theme.as_str()));
    }

    /// Flip between light and dark, returning the new theme.
    pub fn toggle_theme(&self) -> Theme {
        let theme = self.theme().toggled();
        self.set_theme(theme);
        theme
    }

    /// Write or remove a stored value. Storage failures are logged, not fatal.
    fn persist(&self, key: &str, value: Option<&str>) {
        let result = match value {
            Some(value) => self.inner.storage.set(key, value),
            None => self.inner.storage.remove(key),
        };
        if let Err(e) = result {
            tracing::warn!(name: "storage.write.failed", key = key, error = %e, "Failed to persist state");
        }
    }
}
