use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account status of a panel administrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminStatus {
    Active,
    Inactive,
}

impl AdminStatus {
    pub fn display_name(&self) -> &'static str {
        match self {
            AdminStatus::Active => "active",
            AdminStatus::Inactive => "inactive",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, AdminStatus::Active)
    }
}

/// An administrator account as returned by the API.
///
/// The device identifier is stored server-side only as a hash; the raw
/// value never comes back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Administrator {
    pub id: String,
    pub username: String,
    pub status: AdminStatus,
    #[serde(default)]
    pub client_hwid_identifier_hash: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_login_at: Option<DateTime<Utc>>,
}

impl Administrator {
    /// Short form of the id for list displays
    pub fn short_id(&self) -> &str {
        let end = self
            .id
            .char_indices()
            .nth(8)
            .map(|(i, _)| i)
            .unwrap_or(self.id.len());
        &self.id[..end]
    }

    pub fn has_device_binding(&self) -> bool {
        self.client_hwid_identifier_hash
            .as_deref()
            .is_some_and(|h| !h.is_empty())
    }
}

/// Payload for creating an administrator. The device identifier is
/// optional at creation; the server hashes it when present.
#[derive(Debug, Clone, Serialize)]
pub struct NewAdministrator {
    pub username: String,
    pub password: String,
    pub client_hwid_identifier: Option<String>,
}

/// Partial update for an administrator.
///
/// `status` is always sent. `username` and `password` are sent only when
/// set. The device identifier is tri-state: absent keeps the current
/// binding, an explicit null clears it, a string replaces it.
#[derive(Debug, Clone, Serialize)]
pub struct AdministratorUpdate {
    pub status: AdminStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_hwid_identifier: Option<Option<String>>,
}

impl AdministratorUpdate {
    /// Update that only touches the status field
    pub fn status_only(status: AdminStatus) -> Self {
        Self {
            status,
            username: None,
            password: None,
            client_hwid_identifier: None,
        }
    }
}
