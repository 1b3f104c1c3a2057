//! HTTP utilities for the service clients.
//!
//! This module wraps `reqwest` with endpoint joining, token injection,
//! microversion headers and the mapping of HTTP status codes onto
//! [`ServiceError`]. Every request is sent exactly once.

use crate::identity::Session;
use crate::secure_string::SecureString;
use crate::traits::{ServiceConfig, ServiceError, ServiceResult};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Header carrying the Keystone token.
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Header carrying the requested microversion.
pub const MICROVERSION_HEADER: &str = "OpenStack-API-Version";

/// Maximum number of body characters kept in error messages.
const ERROR_BODY_LIMIT: usize = 500;

/// How requests are authenticated.
#[derive(Clone, Default)]
pub enum RequestAuth {
    /// No authentication header.
    #[default]
    None,
    /// A fixed, pre-issued token.
    Token(SecureString),
    /// A Keystone session that issues and refreshes tokens.
    Session(Arc<Session>),
}

impl std::fmt::Debug for RequestAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestAuth::None => f.write_str("None"),
            RequestAuth::Token(_) => f.write_str("Token([REDACTED])"),
            RequestAuth::Session(_) => f.write_str("Session"),
        }
    }
}

/// Builds the underlying `reqwest` client.
pub(crate) fn build_client(timeout_secs: u64, verify_tls: bool, endpoint: &str) -> ServiceResult<Client> {
    if !verify_tls {
        warn!(
            endpoint = %endpoint,
            "TLS certificate verification disabled"
        );
    }

    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .danger_accept_invalid_certs(!verify_tls)
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .map_err(|e| ServiceError::ConfigError(e.to_string()))
}

/// Maps a transport error onto a service error.
pub(crate) fn map_transport_error(e: reqwest::Error) -> ServiceError {
    if e.is_timeout() {
        ServiceError::Timeout(e.to_string())
    } else if e.is_connect() {
        ServiceError::ConnectionFailed(e.to_string())
    } else {
        ServiceError::RequestFailed(e.to_string())
    }
}

/// Maps a non-success status onto a service error.
pub(crate) fn map_status_error(
    status: StatusCode,
    method: &Method,
    url: &str,
    body: &str,
) -> ServiceError {
    let body: String = body.chars().take(ERROR_BODY_LIMIT).collect();
    let request = format!("[{} {}]", method, url);
    match status {
        StatusCode::UNAUTHORIZED => {
            ServiceError::AuthenticationFailed(format!("{}, error message: {}", request, body))
        }
        StatusCode::FORBIDDEN => {
            ServiceError::AuthorizationDenied(format!("{}, error message: {}", request, body))
        }
        StatusCode::NOT_FOUND => {
            ServiceError::NotFound(format!("{}, error message: {}", request, body))
        }
        StatusCode::CONFLICT => {
            ServiceError::Conflict(format!("{}, error message: {}", request, body))
        }
        StatusCode::BAD_REQUEST => {
            ServiceError::InvalidRequest(format!("{}, error message: {}", request, body))
        }
        _ => ServiceError::RequestFailed(format!(
            "Expected HTTP response code [200 201 202 204] when accessing {}, but got {} instead: {}",
            request,
            status.as_u16(),
            body
        )),
    }
}

/// HTTP client bound to one service endpoint.
pub struct HttpClient {
    client: Client,
    config: ServiceConfig,
    auth: RequestAuth,
}

impl HttpClient {
    /// Creates a new HTTP client for a service endpoint.
    pub fn new(config: ServiceConfig, auth: RequestAuth) -> ServiceResult<Self> {
        let client = build_client(config.timeout_secs, config.verify_tls, &config.base_url)?;
        Self::with_client(client, config, auth)
    }

    /// Creates an HTTP client on top of an existing connection pool.
    pub fn with_client(client: Client, config: ServiceConfig, auth: RequestAuth) -> ServiceResult<Self> {
        if config.base_url.is_empty() {
            return Err(ServiceError::ConfigError(format!(
                "empty endpoint for service '{}'",
                config.service_type
            )));
        }
        Ok(Self {
            client,
            config,
            auth,
        })
    }

    /// Builds a URL from a path.
    pub fn build_url(&self, path: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }

    /// Gets the base URL.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Gets the service type this client talks to.
    pub fn service_type(&self) -> &str {
        &self.config.service_type
    }

    /// Executes a GET request and deserializes the JSON response.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ServiceResult<T> {
        let request = self.client.get(self.build_url(path));
        let response = self.send(request).await?;
        parse_json_response(response).await
    }

    /// Executes a GET request with query parameters.
    pub async fn get_json_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ServiceResult<T> {
        let request = self.client.get(self.build_url(path)).query(query);
        let response = self.send(request).await?;
        parse_json_response(response).await
    }

    /// Executes a POST request and deserializes the JSON response.
    pub async fn post_json<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ServiceResult<R> {
        let request = self.client.post(self.build_url(path)).json(body);
        let response = self.send(request).await?;
        parse_json_response(response).await
    }

    /// Executes a PUT request and deserializes the JSON response.
    pub async fn put_json<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ServiceResult<R> {
        let request = self.client.put(self.build_url(path)).json(body);
        let response = self.send(request).await?;
        parse_json_response(response).await
    }

    /// Executes a PATCH request and deserializes the JSON response.
    pub async fn patch_json<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ServiceResult<R> {
        let request = self.client.patch(self.build_url(path)).json(body);
        let response = self.send(request).await?;
        parse_json_response(response).await
    }

    /// Executes a DELETE request, discarding any response body.
    pub async fn delete(&self, path: &str) -> ServiceResult<()> {
        let request = self.client.delete(self.build_url(path));
        self.send(request).await.map(|_| ())
    }

    /// Sends a request once with authentication and error mapping.
    async fn send(&self, request: RequestBuilder) -> ServiceResult<Response> {
        let mut request = request.header(reqwest::header::ACCEPT, "application/json");
        if let Some(version) = &self.config.microversion {
            request = request.header(
                MICROVERSION_HEADER,
                format!("{} {}", self.config.service_type, version),
            );
        }
        for (key, value) in &self.config.headers {
            request = request.header(key.as_str(), value.as_str());
        }
        request = self.add_auth(request).await?;

        let request = request
            .build()
            .map_err(|e| ServiceError::InvalidRequest(e.to_string()))?;
        let method = request.method().clone();
        let url = request.url().to_string();

        debug!(method = %method, url = %url, "Sending request");

        let response = self
            .client
            .execute(request)
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!(method = %method, url = %url, status = %status, "Request failed");
        Err(map_status_error(status, &method, &url, &body))
    }

    /// Adds authentication to a request.
    async fn add_auth(&self, request: RequestBuilder) -> ServiceResult<RequestBuilder> {
        match &self.auth {
            RequestAuth::None => Ok(request),
            RequestAuth::Token(token) => Ok(request.header(AUTH_TOKEN_HEADER, token.expose_secret())),
            RequestAuth::Session(session) => {
                let token = session.token().await?;
                Ok(request.header(AUTH_TOKEN_HEADER, token.expose_secret()))
            }
        }
    }
}

/// Parses a JSON response body.
async fn parse_json_response<T: DeserializeOwned>(response: Response) -> ServiceResult<T> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| ServiceError::InvalidResponse(e.to_string()))?;

    serde_json::from_str(&text).map_err(|e| {
        ServiceError::InvalidResponse(format!(
            "Failed to parse response (status {}): {} - Body: {}",
            status,
            e,
            text.chars().take(ERROR_BODY_LIMIT).collect::<String>()
        ))
    })
}
