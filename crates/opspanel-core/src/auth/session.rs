//! In-memory session storage for the admin panel.
//!
//! The server issues an opaque access token bound to the credentials and
//! the device identifier submitted at login. The token lives only as long
//! as the process (the browser original kept it in tab-scoped storage);
//! nothing is written to disk.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Token type applied when the server omits one
const DEFAULT_TOKEN_TYPE: &str = "Bearer";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub token_type: String,
}

impl Session {
    /// Value for the `Authorization` header of an authenticated request
    pub fn authorization_value(&self) -> String {
        format!("{} {}", self.token_type, self.token)
    }
}

/// Process-wide store holding at most one [`Session`].
///
/// Clones share the same underlying slot, so the API client and the auth
/// flow observe a single session. The auth flow is the only writer; the
/// 401 handling path in the API client is the only other place that
/// clears it.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<Option<Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a token and its type, replacing any previous session.
    ///
    /// Both fields are written in one step so no caller can observe a
    /// token without a type. An empty token type falls back to `Bearer`.
    pub fn save(&self, token: impl Into<String>, token_type: impl Into<String>) {
        let token_type = token_type.into();
        let token_type = if token_type.is_empty() {
            DEFAULT_TOKEN_TYPE.to_string()
        } else {
            token_type
        };
        let session = Session {
            token: token.into(),
            token_type,
        };
        *self.inner.lock().expect("session store lock poisoned") = Some(session);
        debug!("Session stored");
    }

    /// Current session, if one exists
    pub fn load(&self) -> Option<Session> {
        self.inner.lock().expect("session store lock poisoned").clone()
    }

    /// Drop the current session. Safe to call when none exists.
    pub fn clear(&self) {
        let mut slot = self.inner.lock().expect("session store lock poisoned");
        if slot.take().is_some() {
            debug!("Session cleared");
        }
    }

    /// Whether a session is currently held
    pub fn is_authenticated(&self) -> bool {
        self.inner
            .lock()
            .expect("session store lock poisoned")
            .is_some()
    }
}
