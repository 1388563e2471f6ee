//! HTTP client for the Azure Resource Manager REST API

use super::auth::{Authorizer, authorizer_for_profile, token_prefix};
use crate::config::{DEFAULT_ARM_ENDPOINT, Profile};
use crate::error::{CoreError, Result};
use chrono::{DateTime, Utc};
use reqwest::header::{CONTENT_TYPE, HeaderMap, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

/// User agent string for armctl HTTP requests
pub const USER_AGENT: &str = concat!("armctl/", env!("CARGO_PKG_VERSION"));

/// Client bound to one subscription with an authorizer attached
#[derive(Clone)]
pub struct ArmClient {
    http: reqwest::Client,
    base_url: Url,
    subscription_id: String,
    authorizer: Arc<dyn Authorizer>,
}

impl std::fmt::Debug for ArmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArmClient")
            .field("base_url", &self.base_url.as_str())
            .field("subscription_id", &self.subscription_id)
            .field("authorizer", &self.authorizer.name())
            .finish()
    }
}

/// Builder for [`ArmClient`]
pub struct ArmClientBuilder {
    base_url: String,
    subscription_id: Option<String>,
    authorizer: Option<Arc<dyn Authorizer>>,
    user_agent: String,
    request_timeout: Option<Duration>,
}

impl Default for ArmClientBuilder {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ARM_ENDPOINT.to_string(),
            subscription_id: None,
            authorizer: None,
            user_agent: USER_AGENT.to_string(),
            request_timeout: None,
        }
    }
}

impl ArmClientBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn subscription_id(mut self, subscription_id: impl Into<String>) -> Self {
        self.subscription_id = Some(subscription_id.into());
        self
    }

    pub fn authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = Some(authorizer);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Per-request timeout (no timeout by default)
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<ArmClient> {
        let subscription_id = self
            .subscription_id
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CoreError::Config("subscription id is required".to_string()))?;
        let authorizer = self
            .authorizer
            .ok_or_else(|| CoreError::Config("an authorizer is required".to_string()))?;
        let base_url = Url::parse(&self.base_url)
            .map_err(|e| CoreError::Config(format!("invalid base URL '{}': {e}", self.base_url)))?;

        let mut http = reqwest::Client::builder().user_agent(self.user_agent);
        if let Some(timeout) = self.request_timeout {
            http = http.timeout(timeout);
        }
        let http = http
            .build()
            .map_err(|e| CoreError::Config(format!("failed to build HTTP client: {e}")))?;

        debug!(
            base_url = %base_url,
            subscription = %subscription_id,
            authorizer = authorizer.name(),
            "ARM client created"
        );

        Ok(ArmClient {
            http,
            base_url,
            subscription_id,
            authorizer,
        })
    }
}

/// A successful (2xx) ARM response
#[derive(Debug, Clone)]
pub struct ArmResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl ArmResponse {
    /// Header value as a string, if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// `Retry-After` as delay-seconds or an HTTP-date
    pub fn retry_after(&self) -> Option<Duration> {
        self.header(RETRY_AFTER.as_str())
            .and_then(|value| parse_retry_after(value, Utc::now()))
    }

    /// Decode the body; an empty body decodes as JSON `null`
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        decode_body(&self.body)
    }
}

/// A date already in the past means "retry now"
fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}

/// Decode a response body, treating an empty body as `null`
pub(crate) fn decode_body<T: DeserializeOwned>(body: &str) -> Result<T> {
    if body.trim().is_empty() {
        Ok(serde_json::from_value(Value::Null)?)
    } else {
        Ok(serde_json::from_str(body)?)
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Turn a non-2xx response into [`CoreError::Api`]
pub(crate) fn api_error(status: StatusCode, body: &str) -> CoreError {
    let (mut code, mut message) = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| (e.error.code, e.error.message))
        .or_else(|_| serde_json::from_str::<ErrorDetail>(body).map(|e| (e.code, e.message)))
        .unwrap_or_default();

    if code.is_empty() {
        code = status.canonical_reason().unwrap_or("Unknown").to_string();
    }
    if message.is_empty() {
        message = body.trim().to_string();
    }

    CoreError::Api {
        status: status.as_u16(),
        code,
        message,
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Page<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
    #[serde(default)]
    next_link: Option<String>,
}

impl ArmClient {
    pub fn builder() -> ArmClientBuilder {
        ArmClientBuilder::default()
    }

    /// Build a client from a configured profile
    pub fn from_profile(profile: &Profile) -> Result<Self> {
        Self::builder()
            .base_url(profile.base_url.as_str())
            .subscription_id(profile.subscription_id.as_str())
            .authorizer(authorizer_for_profile(profile)?)
            .build()
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `/subscriptions/{id}` followed by `suffix`
    pub fn subscription_path(&self, suffix: &str) -> String {
        format!("/subscriptions/{}{}", self.subscription_id, suffix)
    }

    /// Resolve a path (relative to the endpoint) or absolute URL
    ///
    /// `api-version` is appended unless the URL already carries one, which is
    /// the case for the status URLs ARM hands back.
    pub fn url(&self, path_or_url: &str, api_version: Option<&str>) -> Result<Url> {
        let mut url = if path_or_url.starts_with("https://") || path_or_url.starts_with("http://")
        {
            Url::parse(path_or_url)
        } else if path_or_url.starts_with('/') {
            self.base_url.join(path_or_url)
        } else {
            self.base_url.join(&format!("/{path_or_url}"))
        }
        .map_err(|e| CoreError::Validation(format!("invalid URL '{path_or_url}': {e}")))?;

        if let Some(version) = api_version
            && !url.query_pairs().any(|(k, _)| k == "api-version")
        {
            url.query_pairs_mut().append_pair("api-version", version);
        }
        Ok(url)
    }

    /// Send a request; non-2xx statuses become [`CoreError::Api`]
    pub(crate) async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<ArmResponse> {
        let token = self.authorizer.token().await?;
        trace!("Using token {}...", token_prefix(&token));
        debug!(method = %method, url = %url, "ARM request");

        let mut request = self.http.request(method.clone(), url.clone()).bearer_auth(token);
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;
        debug!(method = %method, url = %url, status = status.as_u16(), "ARM response");

        if !status.is_success() {
            trace!("Error body: {}", body);
            return Err(api_error(status, &body));
        }

        Ok(ArmResponse {
            status,
            headers,
            body,
        })
    }

    /// Raw request against a path or URL
    pub async fn request(
        &self,
        method: Method,
        path_or_url: &str,
        api_version: Option<&str>,
        body: Option<&Value>,
    ) -> Result<ArmResponse> {
        let url = self.url(path_or_url, api_version)?;
        self.send(method, url, body).await
    }

    /// GET a resource and decode it
    pub async fn get<T: DeserializeOwned>(&self, path: &str, api_version: &str) -> Result<T> {
        self.request(Method::GET, path, Some(api_version), None)
            .await?
            .json()
    }

    /// GET a collection, following `nextLink` until exhausted
    pub async fn list<T: DeserializeOwned>(&self, path: &str, api_version: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(self.url(path, Some(api_version))?);

        while let Some(url) = next.take() {
            let page: Page<T> = self.send(Method::GET, url, None).await?.json()?;
            items.extend(page.value);
            if let Some(link) = page.next_link.filter(|l| !l.is_empty()) {
                next = Some(self.url(&link, None)?);
            }
        }

        debug!(path = %path, count = items.len(), "Listed resources");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::auth::StaticTokenAuthorizer;

    fn client() -> ArmClient {
        ArmClient::builder()
            .subscription_id("sub-1")
            .authorizer(Arc::new(StaticTokenAuthorizer::new("tok")))
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_requires_subscription() {
        let err = ArmClient::builder()
            .authorizer(Arc::new(StaticTokenAuthorizer::new("tok")))
            .build()
            .unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn test_builder_requires_authorizer() {
        let err = ArmClient::builder()
            .subscription_id("sub")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("authorizer"));
    }

    #[test]
    fn test_builder_rejects_bad_url() {
        let err = ArmClient::builder()
            .subscription_id("sub")
            .authorizer(Arc::new(StaticTokenAuthorizer::new("tok")))
            .base_url("not a url")
            .build()
            .unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn test_url_appends_api_version() {
        let url = client()
            .url("/subscriptions/sub-1/resourceGroups/rg", Some("2021-04-01"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://management.azure.com/subscriptions/sub-1/resourceGroups/rg?api-version=2021-04-01"
        );
    }

    #[test]
    fn test_url_keeps_existing_api_version() {
        let url = client()
            .url(
                "https://management.azure.com/providers/Microsoft.Storage/locations/westeurope/asyncoperations/abc?api-version=2023-05-01",
                Some("2099-01-01"),
            )
            .unwrap();
        assert_eq!(
            url.query_pairs().filter(|(k, _)| k == "api-version").count(),
            1
        );
        assert!(url.as_str().contains("2023-05-01"));
    }

    #[test]
    fn test_url_without_leading_slash() {
        let url = client().url("subscriptions/sub-1", None).unwrap();
        assert_eq!(url.path(), "/subscriptions/sub-1");
    }

    #[test]
    fn test_subscription_path() {
        assert_eq!(
            client().subscription_path("/resourceGroups/rg"),
            "/subscriptions/sub-1/resourceGroups/rg"
        );
    }

    #[test]
    fn test_api_error_envelope() {
        let body = r#"{"error":{"code":"StorageAccountAlreadyTaken","message":"The storage account named foo is already taken."}}"#;
        match api_error(StatusCode::CONFLICT, body) {
            CoreError::Api {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 409);
                assert_eq!(code, "StorageAccountAlreadyTaken");
                assert!(message.contains("already taken"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_api_error_flat_body() {
        let body = r#"{"code":"InvalidApiVersionParameter","message":"bad version"}"#;
        let err = api_error(StatusCode::BAD_REQUEST, body);
        assert!(err.to_string().contains("InvalidApiVersionParameter"));
    }

    #[test]
    fn test_api_error_plain_text() {
        let err = api_error(StatusCode::BAD_GATEWAY, "upstream reset\n");
        match err {
            CoreError::Api { code, message, .. } => {
                assert_eq!(code, "Bad Gateway");
                assert_eq!(message, "upstream reset");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_decode_empty_body() {
        let _unit: () = decode_body("").unwrap();
        let value: Value = decode_body("  ").unwrap();
        assert!(value.is_null());
    }

    #[test]
    fn test_debug_hides_token() {
        let dbg = format!("{:?}", client());
        assert!(dbg.contains("static-token"));
        assert!(!dbg.contains("tok\""));
    }

    #[test]
    fn test_retry_after_forms() {
        let now = DateTime::parse_from_rfc2822("Wed, 21 Oct 2026 07:28:00 GMT")
            .unwrap()
            .with_timezone(&Utc);

        assert_eq!(parse_retry_after("10", now), Some(Duration::from_secs(10)));
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2026 07:28:30 GMT", now),
            Some(Duration::from_secs(30))
        );
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2026 07:00:00 GMT", now),
            Some(Duration::ZERO)
        );
        assert_eq!(parse_retry_after("soon", now), None);
    }
}
