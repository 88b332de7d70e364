//! Device identifier acquisition.
//!
//! The server binds admin sessions to a client device identifier
//! (the "HWID") submitted alongside the credentials at login. The
//! underlying capability is opaque and may fail to load; this module
//! wraps it behind [`FingerprintProvider`], which resolves the identifier
//! exactly once per process and caches the outcome.
//!
//! A failed acquisition yields a *sentinel* identifier instead of a null:
//! a recognizable placeholder string that downstream code can detect by
//! shape. Login refuses to proceed with any sentinel, since the server
//! treats the identifier as a security-relevant device binding.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use anyhow::Result;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Sentinel reported when the capability never produced an identifier
pub const UNAVAILABLE_IDENTIFIER: &str = "unavailable_hwid";

/// Prefix of sentinels generated when acquisition failed with an error
pub const ERROR_IDENTIFIER_PREFIX: &str = "error-generating-fp-";

/// Prefix of weak fallback identifiers some clients emitted historically.
/// Treated as a sentinel: the server must never see one from us.
const WEAK_FALLBACK_PREFIX: &str = "fallback|";

/// True if `identifier` is a placeholder rather than a real device id
pub fn is_sentinel(identifier: &str) -> bool {
    identifier == UNAVAILABLE_IDENTIFIER
        || identifier.starts_with(ERROR_IDENTIFIER_PREFIX)
        || identifier.starts_with(WEAK_FALLBACK_PREFIX)
}

/// Sentinel for a failed acquisition. The suffix is derived from the
/// failure reason so repeated failures of the same kind are recognizable
/// in server logs.
fn error_sentinel(reason: &str) -> String {
    let mut hasher = DefaultHasher::new();
    reason.hash(&mut hasher);
    format!("{}{:08x}", ERROR_IDENTIFIER_PREFIX, hasher.finish() as u32)
}

#[derive(Error, Debug, Clone)]
#[error("Device identifier unavailable: {reason}")]
pub struct FingerprintError {
    /// Placeholder identifier describing the failure, never sent at login
    pub sentinel: String,
    pub reason: String,
}

/// The opaque device-identifier capability.
///
/// `acquire` is called at most once per process by the provider; it may
/// take arbitrarily long and may fail.
pub trait DeviceIdSource {
    fn acquire(&self) -> impl std::future::Future<Output = Result<String>> + Send;
}

/// Reads the host machine id, the closest native analogue of a browser
/// fingerprint: stable across runs, unique per installation.
pub struct MachineIdSource;

const MACHINE_ID_PATHS: &[&str] = &["/etc/machine-id", "/var/lib/dbus/machine-id"];

impl DeviceIdSource for MachineIdSource {
    async fn acquire(&self) -> Result<String> {
        for path in MACHINE_ID_PATHS {
            match tokio::fs::read_to_string(path).await {
                Ok(contents) => {
                    let id = contents.trim();
                    if !id.is_empty() {
                        debug!(path = %path, "Machine id read");
                        return Ok(id.to_string());
                    }
                }
                Err(e) => {
                    debug!(path = %path, error = %e, "Machine id path unreadable");
                }
            }
        }
        anyhow::bail!("no machine identifier is available on this host")
    }
}

/// Resolved outcome of the one-time acquisition
#[derive(Debug, Clone)]
enum Resolved {
    Ready(String),
    Failed(FingerprintError),
}

/// Lazily resolves the device identifier and caches the outcome.
///
/// The first caller triggers acquisition; concurrent callers join the
/// in-flight resolution rather than starting another. Whatever resolves
/// (value or failure) is what every later call observes.
pub struct FingerprintProvider<S> {
    source: S,
    resolved: OnceCell<Resolved>,
}

impl<S: DeviceIdSource> FingerprintProvider<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            resolved: OnceCell::new(),
        }
    }

    async fn resolve(&self) -> &Resolved {
        self.resolved
            .get_or_init(|| async {
                match self.source.acquire().await {
                    Ok(value) if !value.trim().is_empty() && !is_sentinel(&value) => {
                        debug!("Device identifier resolved");
                        Resolved::Ready(value)
                    }
                    Ok(value) => {
                        warn!(value = %value, "Device identifier source returned an unusable value");
                        Resolved::Failed(FingerprintError {
                            sentinel: UNAVAILABLE_IDENTIFIER.to_string(),
                            reason: "identifier source returned an unusable value".to_string(),
                        })
                    }
                    Err(e) => {
                        warn!(error = %e, "Device identifier acquisition failed");
                        let reason = e.to_string();
                        Resolved::Failed(FingerprintError {
                            sentinel: error_sentinel(&reason),
                            reason,
                        })
                    }
                }
            })
            .await
    }

    /// Trigger acquisition without reading the value. Idempotent: the
    /// underlying capability is exercised at most once, and a failure is
    /// reported on every call thereafter.
    pub async fn initialize(&self) -> Result<(), FingerprintError> {
        match self.resolve().await {
            Resolved::Ready(_) => Ok(()),
            Resolved::Failed(e) => Err(e.clone()),
        }
    }

    /// The device identifier, acquiring it first if needed.
    ///
    /// Fails when acquisition failed; the error carries the sentinel so
    /// callers that only display the value can still show something.
    pub async fn identifier(&self) -> Result<String, FingerprintError> {
        match self.resolve().await {
            Resolved::Ready(value) => Ok(value.clone()),
            Resolved::Failed(e) => Err(e.clone()),
        }
    }

    /// The identifier, or the sentinel describing why there isn't one.
    /// For display only; [`identifier`](Self::identifier) is the one to
    /// use before anything security-relevant.
    pub async fn identifier_or_sentinel(&self) -> String {
        match self.resolve().await {
            Resolved::Ready(value) => value.clone(),
            Resolved::Failed(e) => e.sentinel.clone(),
        }
    }
}
