//! Authentication module for the panel session lifecycle.
//!
//! This module provides:
//! - `SessionStore`: the single in-memory slot for the access token
//! - `AuthFlow`: the login state machine (credentials + device id -> session)
//!
//! Sessions live for the process only; a 401 from the API or an explicit
//! logout destroys them.

pub mod flow;
pub mod session;

pub use flow::{
    AuthFlow, LoginError, LOGIN_REDIRECT_DELAY, LOGOUT_REDIRECT_DELAY, REAUTH_REDIRECT_DELAY,
};
pub use session::{Session, SessionStore};
