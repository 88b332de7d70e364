//! Login orchestration.
//!
//! A submission moves through `Idle -> Submitting` and resolves to one of
//! three outcomes: the session is saved (authenticated), the server
//! rejected the attempt, or the attempt never completed (transport
//! failure or a malformed response). Each failure maps to exactly one
//! user-visible message, and the flow always returns to `Idle` so the
//! form can be re-enabled.
//!
//! Submissions are serialized: while one is in flight, further submits
//! are refused without touching the network.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::auth::SessionStore;
use crate::fingerprint::{DeviceIdSource, FingerprintProvider};

/// Pause before navigating onward after a successful login, long enough
/// for the success message to be read
pub const LOGIN_REDIRECT_DELAY: Duration = Duration::from_millis(1000);

/// Pause before forcing navigation back to the login view after a
/// session teardown on 401
pub const REAUTH_REDIRECT_DELAY: Duration = Duration::from_millis(3000);

/// Pause between logout and navigation back to the login view
pub const LOGOUT_REDIRECT_DELAY: Duration = Duration::from_millis(500);

/// Why a login submission did not authenticate. The `Display` text of
/// each variant is the user-facing message.
#[derive(Error, Debug)]
pub enum LoginError {
    #[error("Username and password are required")]
    MissingCredentials,

    #[error("Device identifier could not be obtained. Try again or contact support")]
    DeviceIdUnavailable,

    #[error("A login attempt is already in progress")]
    InProgress,

    /// The server turned the attempt down; the message is the server's
    /// `detail` or a generic one carrying the status code
    #[error("{0}")]
    Rejected(String),

    #[error("A network error occurred or the server is unavailable. Try again later")]
    Communication(String),

    #[error("Unexpected response from the server after login")]
    UnexpectedResponse,
}

/// Resets the submitting flag when the attempt resolves, whichever way
struct SubmitGuard<'a>(&'a AtomicBool);

impl<'a> SubmitGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Orchestrates login: credentials plus device identifier in, saved
/// session out. The only writer of the [`SessionStore`].
pub struct AuthFlow<S> {
    api: ApiClient,
    store: SessionStore,
    fingerprint: FingerprintProvider<S>,
    submitting: AtomicBool,
}

impl<S: DeviceIdSource> AuthFlow<S> {
    pub fn new(api: ApiClient, store: SessionStore, fingerprint: FingerprintProvider<S>) -> Self {
        Self {
            api,
            store,
            fingerprint,
            submitting: AtomicBool::new(false),
        }
    }

    /// The device identifier provider, for eager initialization at
    /// startup. The submit path re-reads it itself.
    pub fn fingerprint(&self) -> &FingerprintProvider<S> {
        &self.fingerprint
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::SeqCst)
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    /// Attempt a login. On success the session has been saved; the
    /// caller should show its success message for
    /// [`LOGIN_REDIRECT_DELAY`] before navigating on.
    ///
    /// The device identifier is read at submit time, never from a value
    /// captured earlier, so a slow page-load prefetch cannot race the
    /// submission.
    pub async fn submit(&self, username: &str, password: &str) -> Result<(), LoginError> {
        let _guard = SubmitGuard::acquire(&self.submitting).ok_or(LoginError::InProgress)?;

        // Usernames are trimmed; passwords are taken verbatim
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            debug!("Login submission missing credentials");
            return Err(LoginError::MissingCredentials);
        }

        let identifier = match self.fingerprint.identifier().await {
            Ok(identifier) => identifier,
            Err(e) => {
                warn!(sentinel = %e.sentinel, "Refusing login without a usable device identifier");
                return Err(LoginError::DeviceIdUnavailable);
            }
        };

        info!(username, "Submitting login");
        let grant = self
            .api
            .authenticate(username, password, &identifier)
            .await
            .map_err(|e| match e {
                ApiError::HttpStatus { detail, .. } => LoginError::Rejected(detail),
                ApiError::Unauthorized => LoginError::Rejected("HTTP error 401".to_string()),
                ApiError::Network(e) => {
                    warn!(error = %e, "Login request did not complete");
                    LoginError::Communication(e.to_string())
                }
                ApiError::UnexpectedShape(reason) => {
                    warn!(reason = %reason, "Token endpoint response was malformed");
                    LoginError::UnexpectedResponse
                }
            })?;

        if grant.access_token.is_empty() {
            warn!("Token endpoint returned success without an access token");
            return Err(LoginError::UnexpectedResponse);
        }

        self.store
            .save(grant.access_token, grant.token_type.unwrap_or_default());
        info!("Login successful");
        Ok(())
    }

    /// Drop the session. Tokens are stateless, so there is nothing to
    /// invalidate server-side.
    pub fn logout(&self) {
        self.store.clear();
        info!("Logged out");
    }
}
