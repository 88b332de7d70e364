//! REST API client module for the admin panel service.
//!
//! The panel API issues bearer tokens through its token endpoint and
//! expects them on every subsequent call. [`ApiClient`] owns that
//! plumbing: header attachment, the status-code contract, and error
//! surfacing.

pub mod client;
pub mod error;

pub use client::{ApiClient, ApiResponse, ErrorHook, TokenGrant};
pub use error::ApiError;
