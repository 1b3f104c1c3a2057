//! Keystone v3 authentication and service catalog lookup.

use crate::http::{build_client, map_status_error, map_transport_error};
use crate::secure_string::SecureString;
use crate::traits::{ServiceError, ServiceResult};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

/// Header Keystone returns the issued token in.
const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";

/// Tokens this close to expiry are renewed before use.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// Endpoint interface to select from the catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interface {
    #[default]
    Public,
    Internal,
    Admin,
}

impl Interface {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interface::Public => "public",
            Interface::Internal => "internal",
            Interface::Admin => "admin",
        }
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interface {
    type Err = ServiceError;

    /// Accepts both v3 names and the legacy `*URL` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "" | "public" | "publicurl" => Ok(Interface::Public),
            "internal" | "internalurl" => Ok(Interface::Internal),
            "admin" | "adminurl" => Ok(Interface::Admin),
            other => Err(ServiceError::ConfigError(format!(
                "invalid endpoint type: {}",
                other
            ))),
        }
    }
}

/// A catalog endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    #[serde(default)]
    pub id: String,
    pub url: String,
    pub interface: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub region_id: Option<String>,
}

/// A catalog service entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogService {
    pub r#type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

/// The service catalog returned with a token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog(pub Vec<CatalogService>);

impl Catalog {
    /// Finds the URL of a service endpoint.
    ///
    /// An empty region matches any endpoint region.
    pub fn endpoint_for(
        &self,
        service_type: &str,
        region: &str,
        interface: Interface,
    ) -> ServiceResult<String> {
        self.0
            .iter()
            .filter(|service| service.r#type == service_type)
            .flat_map(|service| service.endpoints.iter())
            .find(|endpoint| {
                endpoint.interface.eq_ignore_ascii_case(interface.as_str())
                    && (region.is_empty()
                        || endpoint.region.as_deref() == Some(region)
                        || endpoint.region_id.as_deref() == Some(region))
            })
            .map(|endpoint| endpoint.url.clone())
            .ok_or_else(|| {
                ServiceError::EndpointNotFound(format!(
                    "service type '{}', region '{}', interface '{}'",
                    service_type, region, interface
                ))
            })
    }
}

/// Credentials used to obtain a token.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Password method, user identified by name within a domain.
    Password {
        username: String,
        password: SecureString,
        user_domain_name: String,
    },
    /// Re-scope an existing token.
    Token { token: SecureString },
}

/// Project scope of the requested token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectScope {
    pub project_name: String,
    pub project_domain_name: String,
}

/// Keystone connection settings.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub auth_url: String,
    pub credentials: Credentials,
    pub scope: Option<ProjectScope>,
    pub timeout_secs: u64,
    pub verify_tls: bool,
}

/// An issued token with its catalog.
#[derive(Clone)]
struct AuthToken {
    value: SecureString,
    expires_at: DateTime<Utc>,
    catalog: Catalog,
}

impl AuthToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now + ChronoDuration::seconds(TOKEN_REFRESH_MARGIN_SECS)
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    token: TokenBody,
}

#[derive(Deserialize)]
struct TokenBody {
    expires_at: DateTime<Utc>,
    #[serde(default)]
    catalog: Catalog,
}

/// An authenticated Keystone session shared by the service clients.
pub struct Session {
    client: Client,
    config: IdentityConfig,
    token: RwLock<Option<AuthToken>>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("auth_url", &self.config.auth_url)
            .finish()
    }
}

impl Session {
    pub fn new(config: IdentityConfig) -> ServiceResult<Self> {
        if config.auth_url.is_empty() {
            return Err(ServiceError::ConfigError("auth_url is required".into()));
        }
        let client = build_client(config.timeout_secs, config.verify_tls, &config.auth_url)?;
        Ok(Self {
            client,
            config,
            token: RwLock::new(None),
        })
    }

    /// URL of the token issuing endpoint.
    pub fn tokens_url(&self) -> String {
        let base = self.config.auth_url.trim_end_matches('/');
        if base.ends_with("/v3") {
            format!("{}/auth/tokens", base)
        } else {
            format!("{}/v3/auth/tokens", base)
        }
    }

    /// Returns a valid token, authenticating when needed.
    pub async fn token(&self) -> ServiceResult<SecureString> {
        Ok(self.current().await?.value)
    }

    /// Returns the catalog of the current token.
    pub async fn catalog(&self) -> ServiceResult<Catalog> {
        Ok(self.current().await?.catalog)
    }

    async fn current(&self) -> ServiceResult<AuthToken> {
        {
            let token = self.token.read().await;
            if let Some(t) = &*token {
                if t.is_fresh(Utc::now()) {
                    return Ok(t.clone());
                }
            }
        }

        let mut token = self.token.write().await;
        // Another caller may have authenticated while we waited for the lock.
        if let Some(t) = &*token {
            if t.is_fresh(Utc::now()) {
                return Ok(t.clone());
            }
        }
        let fresh = self.authenticate().await?;
        *token = Some(fresh.clone());
        Ok(fresh)
    }

    #[instrument(skip(self), fields(auth_url = %self.config.auth_url))]
    async fn authenticate(&self) -> ServiceResult<AuthToken> {
        info!("Requesting Keystone token");

        let url = self.tokens_url();
        let response = self
            .client
            .post(&url)
            .json(&auth_request_body(&self.config))
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, &Method::POST, &url, &body));
        }

        let value = response
            .headers()
            .get(SUBJECT_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(SecureString::from)
            .ok_or_else(|| {
                ServiceError::AuthenticationFailed(format!(
                    "response did not carry {}",
                    SUBJECT_TOKEN_HEADER
                ))
            })?;

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::InvalidResponse(e.to_string()))?;

        debug!(
            expires_at = %body.token.expires_at,
            services = body.token.catalog.0.len(),
            "Keystone token issued"
        );

        Ok(AuthToken {
            value,
            expires_at: body.token.expires_at,
            catalog: body.token.catalog,
        })
    }
}

/// Builds the `POST /v3/auth/tokens` request body.
fn auth_request_body(config: &IdentityConfig) -> serde_json::Value {
    let identity = match &config.credentials {
        Credentials::Password {
            username,
            password,
            user_domain_name,
        } => serde_json::json!({
            "methods": ["password"],
            "password": {
                "user": {
                    "name": username,
                    "domain": {"name": user_domain_name},
                    "password": password.expose_secret(),
                }
            }
        }),
        Credentials::Token { token } => serde_json::json!({
            "methods": ["token"],
            "token": {"id": token.expose_secret()}
        }),
    };

    let mut auth = serde_json::json!({ "identity": identity });
    if let Some(scope) = &config.scope {
        auth["scope"] = serde_json::json!({
            "project": {
                "name": scope.project_name,
                "domain": {"name": scope.project_domain_name},
            }
        });
    }

    serde_json::json!({ "auth": auth })
}
