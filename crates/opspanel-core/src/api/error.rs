use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized - session is no longer valid")]
    Unauthorized,

    #[error("{detail}")]
    HttpStatus { code: u16, detail: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    UnexpectedShape(String),
}

/// Maximum length for a server-supplied detail message surfaced to the user
const MAX_DETAIL_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a detail string to avoid surfacing excessive data
    fn truncate_detail(detail: &str) -> String {
        if detail.len() <= MAX_DETAIL_LENGTH {
            detail.to_string()
        } else {
            format!("{}... (truncated)", &detail[..MAX_DETAIL_LENGTH])
        }
    }

    /// Build an error from a non-2xx response. The server puts its error
    /// message in a JSON `detail` field; when the body has no usable
    /// `detail`, a generic message carrying the status code is used.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let detail = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| {
                v.get("detail")
                    .and_then(|d| d.as_str())
                    .map(Self::truncate_detail)
            })
            .unwrap_or_else(|| format!("HTTP error {}", status.as_u16()));
        ApiError::HttpStatus {
            code: status.as_u16(),
            detail,
        }
    }

    /// Status code of the response that produced this error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::HttpStatus { code, .. } => Some(*code),
            ApiError::Unauthorized => Some(401),
            _ => None,
        }
    }
}
