//! HTTP client for the admin panel API.
//!
//! Every authenticated call reads the current session from the
//! [`SessionStore`] immediately before sending, interprets the response
//! per the panel's status-code contract, and reports failures through a
//! single error hook so the caller can surface feedback. A `401` tears
//! the session down; the caller is expected to force a re-login.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::SessionStore;
use crate::models::{Administrator, AdministratorUpdate, ApiLogEntry, LogQuery, NewAdministrator};

use super::ApiError;

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Hook invoked with every failed call before the error is returned.
/// The client performs no rendering of its own.
pub type ErrorHook = Arc<dyn Fn(&ApiError) + Send + Sync>;

/// Raw response of the token endpoint
#[derive(Debug, Deserialize)]
pub struct TokenGrant {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Successful outcome of a raw request
#[derive(Debug)]
pub enum ApiResponse {
    Json(Value),
    /// 204 - the call succeeded and the body is intentionally empty
    NoContent,
}

impl ApiResponse {
    pub fn into_json(self) -> Result<Value, ApiError> {
        match self {
            ApiResponse::Json(value) => Ok(value),
            ApiResponse::NoContent => Err(ApiError::UnexpectedShape(
                "expected a JSON body, got 204 No Content".to_string(),
            )),
        }
    }
}

/// API client for the admin panel.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: SessionStore,
    error_hook: Option<ErrorHook>,
}

impl ApiClient {
    /// Create a new API client against `base_url` (e.g.
    /// `http://localhost:8000/api/v1`), reading credentials from `session`.
    pub fn new(base_url: impl Into<String>, session: SessionStore) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Ok(Self {
            client,
            base_url,
            session,
            error_hook: None,
        })
    }

    /// Register the error-surfacing hook. There is exactly one; setting
    /// a new hook replaces the previous one.
    pub fn set_error_hook(&mut self, hook: impl Fn(&ApiError) + Send + Sync + 'static) {
        self.error_hook = Some(Arc::new(hook));
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn report(&self, error: &ApiError) {
        if let Some(ref hook) = self.error_hook {
            hook(error);
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Exchange credentials and device identifier for an access token.
    ///
    /// This is the one call that must not run through the authenticated
    /// path: a `401` here means the submitted credentials were rejected
    /// and must not disturb any session that already exists. Failures are
    /// surfaced by the login flow itself, not the error hook.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
        client_hwid_identifier: &str,
    ) -> Result<TokenGrant, ApiError> {
        let url = self.url("/admin-panel/auth/token");
        let body = serde_json::json!({
            "username": username,
            "password": password,
            "client_hwid_identifier": client_hwid_identifier,
        });

        debug!("Requesting access token");
        let response = self.client.post(&url).json(&body).send().await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::from_status(status, &text));
        }

        serde_json::from_str(&text)
            .map_err(|e| ApiError::UnexpectedShape(format!("token response did not parse: {e}")))
    }

    /// Perform a request against the panel API.
    ///
    /// The current session, when one exists, is attached as the
    /// `Authorization` header; without one the call goes out
    /// unauthenticated. Any failure is passed to the error hook before
    /// being returned.
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> Result<ApiResponse, ApiError> {
        let result = self.dispatch(method, endpoint, body).await;
        if let Err(ref e) = result {
            self.report(e);
        }
        result
    }

    async fn dispatch(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> Result<ApiResponse, ApiError> {
        let url = self.url(endpoint);
        let mut request = self.client.request(method, &url);

        if let Some(session) = self.session.load() {
            let value = header::HeaderValue::from_str(&session.authorization_value())
                .map_err(|_| {
                    ApiError::UnexpectedShape(
                        "stored token is not usable as a header value".to_string(),
                    )
                })?;
            request = request.header(header::AUTHORIZATION, value);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            warn!(endpoint, "Request rejected with 401, dropping session");
            self.session.clear();
            return Err(ApiError::Unauthorized);
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(ApiResponse::NoContent);
        }

        let text = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::from_status(status, &text));
        }

        let value = serde_json::from_str(&text).map_err(|e| {
            debug!(endpoint, "Response body did not parse as JSON");
            ApiError::UnexpectedShape(format!("response body did not parse: {e}"))
        })?;
        Ok(ApiResponse::Json(value))
    }

    /// Typed request: dispatch, demand a JSON body, decode into `T`.
    /// Reports through the error hook exactly once on any failure.
    async fn typed<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> Result<T, ApiError> {
        let result = async {
            let response = self.dispatch(method, endpoint, body.as_ref()).await?;
            let value = response.into_json()?;
            serde_json::from_value(value)
                .map_err(|e| ApiError::UnexpectedShape(format!("response did not decode: {e}")))
        }
        .await;
        if let Err(ref e) = result {
            self.report(e);
        }
        result
    }

    fn encode<B: Serialize>(body: &B) -> Result<Value, ApiError> {
        serde_json::to_value(body)
            .map_err(|e| ApiError::UnexpectedShape(format!("request body did not serialize: {e}")))
    }

    // ===== Panel endpoints =====

    /// The administrator account behind the current session
    pub async fn fetch_current_admin(&self) -> Result<Administrator, ApiError> {
        self.typed(Method::GET, "/admin-panel/me", None).await
    }

    /// Page through the administrator accounts
    pub async fn list_administrators(
        &self,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Administrator>, ApiError> {
        let endpoint = format!("/admin-panel/administrators?skip={skip}&limit={limit}");
        self.typed(Method::GET, &endpoint, None).await
    }

    pub async fn fetch_administrator(&self, admin_id: &str) -> Result<Administrator, ApiError> {
        let endpoint = format!("/admin-panel/administrators/{admin_id}");
        self.typed(Method::GET, &endpoint, None).await
    }

    pub async fn create_administrator(
        &self,
        admin: &NewAdministrator,
    ) -> Result<Administrator, ApiError> {
        let body = Self::encode(admin)?;
        self.typed(Method::POST, "/admin-panel/administrators", Some(body))
            .await
    }

    pub async fn update_administrator(
        &self,
        admin_id: &str,
        update: &AdministratorUpdate,
    ) -> Result<Administrator, ApiError> {
        let body = Self::encode(update)?;
        let endpoint = format!("/admin-panel/administrators/{admin_id}");
        self.typed(Method::PUT, &endpoint, Some(body)).await
    }

    /// Query the server's API access log
    pub async fn fetch_api_logs(&self, query: &LogQuery) -> Result<Vec<ApiLogEntry>, ApiError> {
        let endpoint = format!("/admin-panel/logs/api{}", query.to_query_string());
        self.typed(Method::GET, &endpoint, None).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn admin_body() -> Value {
        serde_json::json!({
            "id": "7f9c2ba4-33fd-4b66-8d57-10a9f4f4b1c1",
            "username": "root-admin",
            "status": "active"
        })
    }

    async fn client_with_session(server: &MockServer) -> (ApiClient, SessionStore) {
        let store = SessionStore::new();
        store.save("abc", "Bearer");
        let client = ApiClient::new(server.uri(), store.clone()).unwrap();
        (client, store)
    }

    #[tokio::test]
    async fn test_attaches_authorization_header() {
        let server = MockServer::start().await;
        let (client, _store) = client_with_session(&server).await;

        Mock::given(method("GET"))
            .and(path("/admin-panel/me"))
            .and(header("Authorization", "Bearer abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(admin_body()))
            .expect(1)
            .mount(&server)
            .await;

        let admin = client.fetch_current_admin().await.unwrap();
        assert_eq!(admin.username, "root-admin");
    }

    #[tokio::test]
    async fn test_proceeds_unauthenticated_without_session() {
        let server = MockServer::start().await;
        let client = ApiClient::new(server.uri(), SessionStore::new()).unwrap();

        Mock::given(method("GET"))
            .and(path("/admin-panel/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(admin_body()))
            .mount(&server)
            .await;

        client.fetch_current_admin().await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(!requests[0].headers.contains_key("authorization"));
    }

    #[tokio::test]
    async fn test_401_clears_session_and_reports() {
        let server = MockServer::start().await;
        let (mut client, store) = client_with_session(&server).await;

        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        client.set_error_hook(move |e| sink.lock().unwrap().push(e.to_string()));

        Mock::given(method("GET"))
            .and(path("/admin-panel/administrators"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client.list_administrators(0, 20).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
        assert!(store.load().is_none(), "401 must tear the session down");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("Unauthorized"));
    }

    #[tokio::test]
    async fn test_204_returns_success_without_parsing() {
        let server = MockServer::start().await;
        let (client, store) = client_with_session(&server).await;

        Mock::given(method("POST"))
            .and(path("/admin-panel/administrators/x/reset"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let response = client
            .request(Method::POST, "/admin-panel/administrators/x/reset", None)
            .await
            .unwrap();
        assert!(matches!(response, ApiResponse::NoContent));
        assert!(store.load().is_some());
    }

    #[tokio::test]
    async fn test_error_body_detail_is_surfaced() {
        let server = MockServer::start().await;
        let (client, _store) = client_with_session(&server).await;

        Mock::given(method("GET"))
            .and(path("/admin-panel/me"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_json(serde_json::json!({"detail": "Conta de administrador inativa."})),
            )
            .mount(&server)
            .await;

        let err = client.fetch_current_admin().await.unwrap_err();
        assert_eq!(err.status_code(), Some(403));
        assert_eq!(err.to_string(), "Conta de administrador inativa.");
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_unexpected_shape() {
        let server = MockServer::start().await;
        let (client, _store) = client_with_session(&server).await;

        Mock::given(method("GET"))
            .and(path("/admin-panel/me"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<!doctype html>"))
            .mount(&server)
            .await;

        let err = client.fetch_current_admin().await.unwrap_err();
        assert!(matches!(err, ApiError::UnexpectedShape(_)));
    }

    #[tokio::test]
    async fn test_authenticate_rejection_keeps_existing_session() {
        let server = MockServer::start().await;
        let (client, store) = client_with_session(&server).await;

        Mock::given(method("POST"))
            .and(path("/admin-panel/auth/token"))
            .respond_with(ResponseTemplate::new(401).set_body_json(
                serde_json::json!({"detail": "Nome de usuário, senha ou identificador de dispositivo incorreto."}),
            ))
            .mount(&server)
            .await;

        let err = client
            .authenticate("root-admin", "wrong", "f3a9c0d1e5b24f68")
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(401));
        assert!(
            store.load().is_some(),
            "a login rejection must not disturb the existing session"
        );
    }

    #[tokio::test]
    async fn test_authenticate_parses_grant() {
        let server = MockServer::start().await;
        let client = ApiClient::new(server.uri(), SessionStore::new()).unwrap();

        Mock::given(method("POST"))
            .and(path("/admin-panel/auth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"access_token": "abc", "token_type": "bearer"}),
            ))
            .mount(&server)
            .await;

        let grant = client
            .authenticate("root-admin", "secret", "f3a9c0d1e5b24f68")
            .await
            .unwrap();
        assert_eq!(grant.access_token, "abc");
        assert_eq!(grant.token_type.as_deref(), Some("bearer"));
    }

    #[tokio::test]
    async fn test_update_sends_partial_body() {
        let server = MockServer::start().await;
        let (client, _store) = client_with_session(&server).await;

        Mock::given(method("PUT"))
            .and(path("/admin-panel/administrators/x1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(admin_body()))
            .mount(&server)
            .await;

        let update = crate::models::AdministratorUpdate::status_only(
            crate::models::AdminStatus::Inactive,
        );
        client.update_administrator("x1", &update).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body, serde_json::json!({"status": "inactive"}));
    }
}
