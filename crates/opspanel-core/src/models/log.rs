use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Default page size for log queries, matching the server default
const DEFAULT_LOG_LIMIT: usize = 50;

/// One request record from the server's API access log
#[derive(Debug, Clone, Deserialize)]
pub struct ApiLogEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    pub method: String,
    pub path: String,
    pub status_code: u16,
    #[serde(default)]
    pub client_host: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub admin_id: Option<String>,
    #[serde(default)]
    pub processing_time_ms: Option<f64>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ApiLogEntry {
    pub fn is_error(&self) -> bool {
        self.status_code >= 400
    }
}

/// Filters for the paginated log endpoint.
///
/// Serialized as query parameters; the server ignores absent filters.
#[derive(Debug, Clone)]
pub struct LogQuery {
    pub skip: usize,
    pub limit: usize,
    pub method: Option<String>,
    pub status_code: Option<u16>,
    pub path_contains: Option<String>,
}

impl Default for LogQuery {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_LOG_LIMIT,
            method: None,
            status_code: None,
            path_contains: None,
        }
    }
}

impl LogQuery {
    /// Query string for the log endpoint, `?` included.
    /// User-supplied filter values are percent-encoded.
    pub fn to_query_string(&self) -> String {
        let mut pairs = vec![
            format!("skip={}", self.skip),
            format!("limit={}", self.limit),
        ];
        if let Some(ref method) = self.method {
            pairs.push(format!(
                "method={}",
                urlencoding::encode(&method.to_uppercase())
            ));
        }
        if let Some(status_code) = self.status_code {
            pairs.push(format!("status_code_filter={}", status_code));
        }
        if let Some(ref fragment) = self.path_contains {
            pairs.push(format!("path_contains={}", urlencoding::encode(fragment)));
        }
        format!("?{}", pairs.join("&"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_entry() {
        let json = r#"{
            "id": "log-1",
            "timestamp": "2025-11-03T12:30:05Z",
            "method": "POST",
            "path": "/api/v1/admin-panel/auth/token",
            "status_code": 401,
            "client_host": "203.0.113.9",
            "user_agent": "Mozilla/5.0",
            "admin_id": null,
            "processing_time_ms": 12.44,
            "tags": ["api_request", "admin_panel"]
        }"#;

        let entry: ApiLogEntry = serde_json::from_str(json).expect("log entry should parse");
        assert_eq!(entry.method, "POST");
        assert_eq!(entry.status_code, 401);
        assert!(entry.is_error());
        assert_eq!(entry.tags.len(), 2);
        assert!(entry.user_id.is_none());
    }

    #[test]
    fn test_query_string_defaults() {
        let query = LogQuery::default();
        assert_eq!(query.to_query_string(), "?skip=0&limit=50");
    }

    #[test]
    fn test_query_string_with_filters() {
        let query = LogQuery {
            skip: 20,
            limit: 10,
            method: Some("get".to_string()),
            status_code: Some(500),
            path_contains: Some("/admin panel".to_string()),
        };
        assert_eq!(
            query.to_query_string(),
            "?skip=20&limit=10&method=GET&status_code_filter=500&path_contains=%2Fadmin%20panel"
        );
    }
}
