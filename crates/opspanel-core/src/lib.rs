//! opspanel-core - client library for the admin panel API.
//!
//! The panel binds administrator sessions to a device identifier: login
//! submits credentials plus the identifier, the server answers with a
//! bearer token, and every later call carries that token until a 401 or
//! a logout tears the session down. This crate owns that lifecycle:
//!
//! - [`fingerprint::FingerprintProvider`] resolves the device identifier
//!   once per process, with sentinel values for degraded mode
//! - [`auth::SessionStore`] holds the one live session
//! - [`api::ApiClient`] attaches it, enforces the status-code contract,
//!   and surfaces failures through a single hook
//! - [`auth::AuthFlow`] runs the login state machine

pub mod api;
pub mod auth;
pub mod config;
pub mod fingerprint;
pub mod models;

pub use api::{ApiClient, ApiError};
pub use auth::{AuthFlow, LoginError, Session, SessionStore};
pub use config::Config;
pub use fingerprint::{DeviceIdSource, FingerprintProvider, MachineIdSource};
