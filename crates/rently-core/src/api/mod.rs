//! HTTP client wrapper for the rently backend API.
//!
//! Single point of outbound request construction: owns the one
//! `reqwest::Client` and the current bearer token, and resolves the base
//! address from environment, config or default.

mod error;

pub use error::{ApiError, ApiErrorKind};

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::{Config, Deployment};

/// Default base address: the dev reverse-proxy origin.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Fixed prefix carried by API paths, stripped in direct mode.
const API_PREFIX: &str = "/api";

/// Backend API client.
///
/// The bearer token is only ever written by the auth controller; every
/// request carries it as `Authorization: Bearer <token>` while set.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    deployment: Deployment,
    token: Option<String>,
}

impl ApiClient {
    /// Creates a client for an explicit base address and deployment mode.
    pub fn new(base_url: &str, deployment: Deployment) -> Result<Self> {
        validate_url(base_url)?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            deployment,
            token: None,
        })
    }

    /// Creates a client from config and environment.
    ///
    /// Base address resolution order:
    /// 1. `RENTLY_API_URL` env var (if set and non-empty)
    /// 2. `api_url` from config (if set and non-empty)
    /// 3. Default: `http://localhost:3000`
    ///
    /// An explicit override implies direct mode (the backend is addressed
    /// without the reverse proxy) unless config pins a deployment mode.
    pub fn from_config(config: &Config) -> Result<Self> {
        let (base_url, overridden) = resolve_base_url(config)?;
        let inferred = if overridden {
            Deployment::Direct
        } else {
            Deployment::Proxied
        };
        Self::new(&base_url, config.deployment.unwrap_or(inferred))
    }

    /// Installs the current bearer token.
    pub fn set_token(&mut self, token: &str) {
        self.token = Some(token.to_string());
    }

    /// Removes the current bearer token.
    pub fn clear_token(&mut self) {
        self.token = None;
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds the full request URL for an API path.
    fn url_for(&self, path: &str) -> String {
        let effective = match self.deployment {
            Deployment::Proxied => path,
            Deployment::Direct => strip_api_prefix(path),
        };
        format!("{}{}", self.base_url, effective)
    }

    /// GET a JSON document.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let url = self.url_for(path);
        tracing::debug!(%url, "GET");
        let mut request = self.http.get(&url);
        if !query.is_empty() {
            request = request.query(query);
        }
        let response = self.send(request).await?;
        Self::read_json(path, response).await
    }

    /// POST a JSON body, expecting a JSON response.
    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url_for(path);
        tracing::debug!(%url, "POST");
        let response = self.send(self.http.post(&url).json(body)).await?;
        Self::read_json(path, response).await
    }

    /// POST a multipart form, expecting a JSON response.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<T, ApiError> {
        let url = self.url_for(path);
        tracing::debug!(%url, "POST (multipart)");
        let response = self.send(self.http.post(&url).multipart(form)).await?;
        Self::read_json(path, response).await
    }

    /// DELETE a resource; 2xx with or without a body is success.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let url = self.url_for(path);
        tracing::debug!(%url, "DELETE");
        self.send(self.http.delete(&url)).await?;
        Ok(())
    }

    /// GET raw bytes (e.g. a listing image).
    pub async fn get_bytes(&self, path: &str) -> Result<Vec<u8>, ApiError> {
        let url = self.url_for(path);
        tracing::debug!(%url, "GET (bytes)");
        let response = self.send(self.http.get(&url)).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::from_reqwest(&e))?;
        Ok(bytes.to_vec())
    }

    /// Sends the request with the bearer token attached and maps
    /// non-success statuses into the error taxonomy.
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ApiError> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(&e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ApiError::http_status(status.as_u16(), &body))
    }

    async fn read_json<T: DeserializeOwned>(
        path: &str,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::parse(format!("Failed to parse response from {}: {}", path, e)))
    }
}

/// Strips a literal leading `/api` segment.
///
/// Only a whole segment is stripped (`/api/x` → `/x`, `/api` → `/`);
/// a partial match like `/apix` is left untouched.
fn strip_api_prefix(path: &str) -> &str {
    match path.strip_prefix(API_PREFIX) {
        Some("") => "/",
        Some(rest) if rest.starts_with('/') => rest,
        _ => path,
    }
}

/// Resolves the base address with precedence: env > config > default.
/// The bool reports whether an explicit override was found.
fn resolve_base_url(config: &Config) -> Result<(String, bool)> {
    if let Ok(env_url) = std::env::var("RENTLY_API_URL") {
        let trimmed = env_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed)?;
            return Ok((trimmed.to_string(), true));
        }
    }

    if let Some(config_url) = config.api_url.as_deref() {
        let trimmed = config_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed)?;
            return Ok((trimmed.to_string(), true));
        }
    }

    Ok((DEFAULT_BASE_URL.to_string(), false))
}

/// Validates that a URL is well-formed.
fn validate_url(url: &str) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("Invalid API base URL: {}", url))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Test: only a whole leading /api segment is stripped.
    #[test]
    fn test_strip_api_prefix() {
        assert_eq!(strip_api_prefix("/api/houses/search"), "/houses/search");
        assert_eq!(strip_api_prefix("/api"), "/");
        assert_eq!(strip_api_prefix("/apix/houses"), "/apix/houses");
        assert_eq!(strip_api_prefix("/houses"), "/houses");
    }

    /// Test: proxied mode leaves paths untouched, direct mode rewrites.
    #[test]
    fn test_url_for_deployment_modes() {
        let proxied = ApiClient::new("http://localhost:3000", Deployment::Proxied).unwrap();
        assert_eq!(
            proxied.url_for("/api/houses/search"),
            "http://localhost:3000/api/houses/search"
        );

        let direct = ApiClient::new("http://backend:8080/", Deployment::Direct).unwrap();
        assert_eq!(
            direct.url_for("/api/houses/search"),
            "http://backend:8080/houses/search"
        );
    }

    /// Test: a malformed base address is rejected at construction.
    #[test]
    fn test_invalid_base_url() {
        assert!(ApiClient::new("not a url", Deployment::Proxied).is_err());
    }

    /// Test: the bearer token is attached once set, and dropped once cleared.
    #[tokio::test]
    async fn test_bearer_token_attached() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/houses/my"))
            .and(header("authorization", "Bearer tok-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = ApiClient::new(&server.uri(), Deployment::Proxied).unwrap();
        client.set_token("tok-123");

        let _: serde_json::Value = client.get_json("/api/houses/my", &[]).await.unwrap();
    }

    /// Test: no authorization header is sent without a token.
    #[tokio::test]
    async fn test_no_token_no_header() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/houses/search"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/houses/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri(), Deployment::Proxied).unwrap();
        let _: serde_json::Value = client.get_json("/api/houses/search", &[]).await.unwrap();
    }

    /// Test: query parameters are forwarded.
    #[tokio::test]
    async fn test_query_params() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/houses/search"))
            .and(query_param("district", "Hyderabad"))
            .and(query_param("city", "Kukatpally"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri(), Deployment::Proxied).unwrap();
        let _: serde_json::Value = client
            .get_json(
                "/api/houses/search",
                &[("district", "Hyderabad"), ("city", "Kukatpally")],
            )
            .await
            .unwrap();
    }

    /// Test: error bodies surface the backend message and the 401 kind.
    #[tokio::test]
    async fn test_error_mapping() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/houses/my"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({"error": "User not found"})),
            )
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri(), Deployment::Proxied).unwrap();
        let err = client
            .get_json::<serde_json::Value>("/api/houses/my", &[])
            .await
            .unwrap_err();

        assert!(err.is_unauthorized());
        assert_eq!(err.status, Some(401));
        assert_eq!(err.server_message.as_deref(), Some("User not found"));
    }
}
