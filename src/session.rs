//! Session store: the signed-in user for the lifetime of the tab
//!
//! The user record lives as JSON under [`SESSION_KEY`] in a tab-scoped
//! [`KeyValueStore`]. The store starts `Unknown`, resolves to `Authenticated`
//! or `Anonymous` on the first [`SessionStore::load`], and drops back to
//! `Anonymous` on [`SessionStore::clear_session`].

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::gateway::AuthGateway;
use crate::models::User;
use crate::storage::KeyValueStore;

pub const SESSION_KEY: &str = "userSession";

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Storage has not been read yet; views show a placeholder.
    Unknown,
    Authenticated(User),
    Anonymous,
}

/// Result of a logout. Local state is cleared even when `success` is false.
#[derive(Debug, Clone, PartialEq)]
pub struct LogoutOutcome {
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn KeyValueStore>,
    auth: Arc<dyn AuthGateway>,
    state: Arc<Mutex<SessionState>>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn KeyValueStore>, auth: Arc<dyn AuthGateway>) -> Self {
        Self {
            storage,
            auth,
            state: Arc::new(Mutex::new(SessionState::Unknown)),
        }
    }

    fn state_guard(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Resolve the session from storage on first use. Absent or malformed data
    /// means "no session".
    pub fn load(&self) -> SessionState {
        let mut state = self.state_guard();
        if *state != SessionState::Unknown {
            return state.clone();
        }

        *state = match self.storage.get(SESSION_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<User>(&raw) {
                Ok(user) => {
                    debug!("Restored session for {}", user.id);
                    SessionState::Authenticated(user)
                }
                Err(e) => {
                    warn!("Error parsing user session: {}", e);
                    SessionState::Anonymous
                }
            },
            Ok(None) => SessionState::Anonymous,
            Err(e) => {
                warn!("Error loading session: {:#}", e);
                SessionState::Anonymous
            }
        };
        state.clone()
    }

    pub fn state(&self) -> SessionState {
        self.state_guard().clone()
    }

    pub fn is_loading(&self) -> bool {
        matches!(*self.state_guard(), SessionState::Unknown)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(*self.state_guard(), SessionState::Authenticated(_))
    }

    pub fn current_user(&self) -> Option<User> {
        match &*self.state_guard() {
            SessionState::Authenticated(user) => Some(user.clone()),
            _ => None,
        }
    }

    /// Store a freshly signed-in user.
    pub fn persist(&self, user: User) {
        match serde_json::to_string(&user) {
            Ok(raw) => {
                if let Err(e) = self.storage.set(SESSION_KEY, &raw) {
                    warn!("Error saving user session: {:#}", e);
                }
            }
            Err(e) => warn!("Error serializing user session: {}", e),
        }
        info!("Session started for {}", user.id);
        *self.state_guard() = SessionState::Authenticated(user);
    }

    /// Sign out from the gateway, then clear local state whatever the
    /// gateway answered.
    pub async fn clear_session(&self) -> LogoutOutcome {
        let result = self.auth.sign_out().await;

        if let Err(e) = self.storage.remove(SESSION_KEY) {
            warn!("Error clearing stored session: {:#}", e);
        }
        *self.state_guard() = SessionState::Anonymous;

        match result {
            Ok(()) => {
                info!("Session cleared");
                LogoutOutcome {
                    success: true,
                    error: None,
                }
            }
            Err(e) => {
                warn!("Error logging out: {:#}", e);
                LogoutOutcome {
                    success: false,
                    error: Some(format!("{e:#}")),
                }
            }
        }
    }
}
