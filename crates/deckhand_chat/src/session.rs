//! Per-user session state.
//!
//! A session is one user in one chat. It holds the API key set by `/login`
//! and the prompts that are still waiting for a reply. Nothing is persisted:
//! a restart logs everyone out and forgets every pending prompt.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use deckhand_api::ApiToken;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use crate::pending::{PendingAction, PendingKind};
use crate::types::{MessageId, SessionKey};

/// Default lifetime of a pending prompt.
pub const DEFAULT_PENDING_TTL_SECS: u64 = 600;

/// Source of the current time.
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Lifetimes applied by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Seconds a prompt waits for its reply
    pub pending_ttl_secs: u64,
    /// Seconds a stored key stays valid; `None` keeps it until logout
    pub token_ttl_secs: Option<u64>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            pending_ttl_secs: DEFAULT_PENDING_TTL_SECS,
            token_ttl_secs: None,
        }
    }
}

/// Result of looking up the prompt a reply points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingLookup {
    /// The record was live; it has now been consumed
    Found(PendingAction),
    /// The record existed but its time ran out; it has been dropped
    Expired,
    /// No record: the parent is not part of any flow
    Missing,
}

struct Credential {
    token: ApiToken,
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct SessionState {
    credential: Option<Credential>,
    pending: HashMap<MessageId, PendingAction>,
}

/// In-memory session store shared by all handlers.
pub struct SessionStore {
    clock: Arc<dyn Clock>,
    settings: SessionSettings,
    sessions: RwLock<HashMap<SessionKey, SessionState>>,
    locks: Mutex<HashMap<SessionKey, Arc<AsyncMutex<()>>>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(SessionSettings::default())
    }
}

impl SessionStore {
    pub fn new(settings: SessionSettings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    pub fn with_clock(settings: SessionSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            settings,
            sessions: RwLock::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> SessionSettings {
        self.settings
    }

    /// Serialize handling for one session. Hold the guard for the whole event.
    pub async fn lock(&self, key: SessionKey) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock();
            // Guards and waiters hold their own reference.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(key).or_default())
        };
        lock.lock_owned().await
    }

    /// Store a key that has already been validated.
    pub fn set_token(&self, key: SessionKey, token: ApiToken) {
        let expires_at = self
            .settings
            .token_ttl_secs
            .map(|secs| self.clock.now() + seconds(secs));
        self.sessions.write().entry(key).or_default().credential =
            Some(Credential { token, expires_at });
        debug!("Stored API key for session {}", key);
    }

    /// The session's key, if one is stored and not expired.
    pub fn token(&self, key: SessionKey) -> Option<ApiToken> {
        let now = self.clock.now();
        let mut sessions = self.sessions.write();
        let state = sessions.get_mut(&key)?;
        let credential = state.credential.as_ref()?;
        if credential.expires_at.is_some_and(|at| now >= at) {
            debug!("API key for session {} expired", key);
            state.credential = None;
            return None;
        }
        Some(credential.token.clone())
    }

    pub fn is_logged_in(&self, key: SessionKey) -> bool {
        self.token(key).is_some()
    }

    /// Logout: forget the key and every pending prompt.
    pub fn clear(&self, key: SessionKey) {
        self.sessions.write().remove(&key);
        debug!("Cleared session {}", key);
    }

    /// Record that the prompt `prompt` waits for a reply of the given kind.
    pub fn register_pending(
        &self,
        key: SessionKey,
        prompt: MessageId,
        kind: PendingKind,
    ) -> PendingAction {
        let now = self.clock.now();
        let action = PendingAction {
            kind,
            prompt,
            created_at: now,
            expires_at: now + seconds(self.settings.pending_ttl_secs),
        };
        // Expired records are kept for one more lifetime so late replies
        // still get the expiry notice.
        let horizon = now - seconds(self.settings.pending_ttl_secs);
        let mut sessions = self.sessions.write();
        let mut pruned = 0;
        sessions.retain(|_, state| {
            let before = state.pending.len();
            state.pending.retain(|_, pending| !pending.is_expired(horizon));
            pruned += before - state.pending.len();
            state.credential.is_some() || !state.pending.is_empty()
        });
        if pruned > 0 {
            debug!("Pruned {} expired prompt(s)", pruned);
        }
        sessions
            .entry(key)
            .or_default()
            .pending
            .insert(prompt, action.clone());
        action
    }

    /// Remove and return the record for `prompt`.
    pub fn take_pending(&self, key: SessionKey, prompt: MessageId) -> PendingLookup {
        let now = self.clock.now();
        let mut sessions = self.sessions.write();
        let Some(action) = sessions
            .get_mut(&key)
            .and_then(|state| state.pending.remove(&prompt))
        else {
            return PendingLookup::Missing;
        };
        if action.is_expired(now) {
            PendingLookup::Expired
        } else {
            PendingLookup::Found(action)
        }
    }

    /// Drop every pending prompt of the session. Returns how many were dropped.
    pub fn clear_pending(&self, key: SessionKey) -> usize {
        let mut sessions = self.sessions.write();
        match sessions.get_mut(&key) {
            Some(state) => {
                let dropped = state.pending.len();
                state.pending.clear();
                dropped
            }
            None => 0,
        }
    }

    pub fn pending_count(&self, key: SessionKey) -> usize {
        self.sessions
            .read()
            .get(&key)
            .map_or(0, |state| state.pending.len())
    }
}

/// Upper bound for configured lifetimes (about a century).
const MAX_TTL_SECS: u64 = 100 * 365 * 24 * 3600;

fn seconds(secs: u64) -> Duration {
    Duration::seconds(secs.min(MAX_TTL_SECS) as i64)
}
