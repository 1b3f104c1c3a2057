//! Provider configuration and the runtime client access built from it.

use crate::error::{ProviderError, ProviderResult};
use crate::resource_data::ResourceData;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tfos_client::{
    ClientFactory, ClientOptions, Credentials, IdentityConfig, Interface, KeyManagerService,
    OpenStackClientFactory, PlacementService, ProjectScope, RequestAuth, SecureString, Session,
};
use tracing::{debug, info};

/// User-facing provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Keystone URL.
    pub auth_url: String,
    /// Default region for every object.
    pub region: String,
    pub username: String,
    pub password: SecureString,
    /// Pre-issued token, used instead of username and password.
    pub token: SecureString,
    pub user_domain_name: String,
    pub project_name: String,
    pub project_domain_name: String,
    /// Catalog interface: `public`, `internal` or `admin`.
    pub endpoint_type: String,
    /// Endpoint URLs keyed by service type, bypassing the catalog.
    pub endpoint_overrides: HashMap<String, String>,
    /// Skip TLS certificate verification.
    pub insecure: bool,
    pub timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            auth_url: String::new(),
            region: String::new(),
            username: String::new(),
            password: SecureString::default(),
            token: SecureString::default(),
            user_domain_name: default_domain(),
            project_name: String::new(),
            project_domain_name: default_domain(),
            endpoint_type: "public".to_string(),
            endpoint_overrides: HashMap::new(),
            insecure: false,
            timeout_secs: 30,
        }
    }
}

fn default_domain() -> String {
    "Default".to_string()
}

impl ProviderSettings {
    /// Parses settings from YAML.
    pub fn from_yaml_str(content: &str) -> ProviderResult<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| ProviderError::InvalidConfig(format!("failed to parse settings: {}", e)))
    }

    /// Fills unset fields from the process environment (`OS_*` variables).
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Fills unset fields from `lookup`.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.is_empty());

        fill(&mut self.auth_url, lookup("OS_AUTH_URL"));
        fill(&mut self.region, lookup("OS_REGION_NAME"));
        fill(&mut self.username, lookup("OS_USERNAME"));
        fill(&mut self.project_name, lookup("OS_PROJECT_NAME"));
        if let Some(domain) = lookup("OS_USER_DOMAIN_NAME") {
            if self.user_domain_name == default_domain() {
                self.user_domain_name = domain;
            }
        }
        if let Some(domain) = lookup("OS_PROJECT_DOMAIN_NAME") {
            if self.project_domain_name == default_domain() {
                self.project_domain_name = domain;
            }
        }
        if let Some(interface) = lookup("OS_INTERFACE") {
            if self.endpoint_type == "public" {
                self.endpoint_type = interface;
            }
        }
        if self.password.is_empty() {
            if let Some(password) = lookup("OS_PASSWORD") {
                self.password = SecureString::new(password);
            }
        }
        if self.token.is_empty() {
            if let Some(token) = lookup("OS_TOKEN") {
                self.token = SecureString::new(token);
            }
        }
        if let Some(insecure) = lookup("OS_INSECURE") {
            if !self.insecure {
                self.insecure = matches!(insecure.to_lowercase().as_str(), "1" | "true" | "yes");
            }
        }
    }

    /// Checks that the settings are usable.
    pub fn validate(&self) -> ProviderResult<()> {
        if self.auth_url.is_empty() {
            return Err(ProviderError::InvalidConfig(
                "auth_url is required (or set OS_AUTH_URL)".into(),
            ));
        }
        if self.token.is_empty() && (self.username.is_empty() || self.password.is_empty()) {
            return Err(ProviderError::InvalidConfig(
                "either token or username and password must be provided".into(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ProviderError::InvalidConfig(
                "timeout_secs must be greater than zero".into(),
            ));
        }
        self.interface()?;
        Ok(())
    }

    /// The parsed endpoint interface.
    pub fn interface(&self) -> ProviderResult<Interface> {
        self.endpoint_type
            .parse()
            .map_err(|e: tfos_client::ServiceError| ProviderError::InvalidConfig(e.to_string()))
    }

    /// Keystone settings derived from these settings.
    pub fn identity_config(&self) -> IdentityConfig {
        let credentials = if !self.token.is_empty() {
            Credentials::Token {
                token: self.token.clone(),
            }
        } else {
            Credentials::Password {
                username: self.username.clone(),
                password: self.password.clone(),
                user_domain_name: self.user_domain_name.clone(),
            }
        };
        let scope = (!self.project_name.is_empty()).then(|| ProjectScope {
            project_name: self.project_name.clone(),
            project_domain_name: self.project_domain_name.clone(),
        });

        IdentityConfig {
            auth_url: self.auth_url.clone(),
            credentials,
            scope,
            timeout_secs: self.timeout_secs,
            verify_tls: !self.insecure,
        }
    }
}

fn fill(field: &mut String, value: Option<String>) {
    if field.is_empty() {
        if let Some(value) = value {
            *field = value;
        }
    }
}

/// Runtime configuration shared by all handlers.
#[derive(Clone)]
pub struct Config {
    /// Default region.
    pub region: String,
    clients: Arc<dyn ClientFactory>,
}

impl Config {
    pub fn new(region: impl Into<String>, clients: Arc<dyn ClientFactory>) -> Self {
        Self {
            region: region.into(),
            clients,
        }
    }

    /// Builds a configuration talking to real endpoints.
    ///
    /// No request is made here; the first client call authenticates.
    pub fn from_settings(settings: &ProviderSettings) -> ProviderResult<Self> {
        settings.validate()?;

        let session = Session::new(settings.identity_config())
            .map_err(|e| ProviderError::InvalidConfig(e.to_string()))?;
        let options = ClientOptions {
            interface: settings.interface()?,
            endpoint_overrides: settings.endpoint_overrides.clone(),
            timeout_secs: settings.timeout_secs,
            verify_tls: !settings.insecure,
        };
        debug!(?options, "Client options");
        info!(
            auth_url = %settings.auth_url,
            region = %settings.region,
            "OpenStack provider configured"
        );

        let factory = OpenStackClientFactory::new(RequestAuth::Session(Arc::new(session)), options)
            .map_err(|e| ProviderError::InvalidConfig(e.to_string()))?;
        Ok(Self::new(settings.region.clone(), Arc::new(factory)))
    }

    /// Placement v1 client for a region.
    pub async fn placement_v1_client(
        &self,
        region: &str,
    ) -> ProviderResult<Arc<dyn PlacementService>> {
        self.clients
            .placement_v1(region)
            .await
            .map_err(|source| ProviderError::Client {
                service: "placement",
                source,
            })
    }

    /// Key Manager v1 client for a region.
    pub async fn key_manager_v1_client(
        &self,
        region: &str,
    ) -> ProviderResult<Arc<dyn KeyManagerService>> {
        self.clients
            .key_manager_v1(region)
            .await
            .map_err(|source| ProviderError::Client {
                service: "KeyManager",
                source,
            })
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config").field("region", &self.region).finish()
    }
}

/// The region of an object: its own `region` attribute if set, otherwise
/// the provider default.
pub fn get_region(d: &ResourceData, config: &Config) -> String {
    match d.get_string("region") {
        region if !region.is_empty() => region,
        _ => config.region.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfos_client::MockClientFactory;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_yaml_parsing_with_defaults() {
        let settings = ProviderSettings::from_yaml_str(
            r#"
auth_url: https://keystone.example.com:5000/v3
region: RegionOne
username: admin
password: secret
project_name: admin
endpoint_overrides:
  placement: http://127.0.0.1:8778
"#,
        )
        .unwrap();

        assert_eq!(settings.region, "RegionOne");
        assert_eq!(settings.password.expose_secret(), "secret");
        assert_eq!(settings.user_domain_name, "Default");
        assert_eq!(settings.endpoint_type, "public");
        assert_eq!(settings.timeout_secs, 30);
        assert_eq!(settings.endpoint_overrides["placement"], "http://127.0.0.1:8778");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_env_fills_only_unset_fields() {
        let mut settings = ProviderSettings {
            region: "FromFile".into(),
            ..Default::default()
        };
        settings.apply_env_from(env(&[
            ("OS_AUTH_URL", "https://keystone.example.com"),
            ("OS_REGION_NAME", "FromEnv"),
            ("OS_USERNAME", "demo"),
            ("OS_PASSWORD", "pw"),
            ("OS_PROJECT_NAME", "demo"),
            ("OS_USER_DOMAIN_NAME", "ldap"),
            ("OS_INTERFACE", "internal"),
            ("OS_INSECURE", "true"),
        ]));

        assert_eq!(settings.auth_url, "https://keystone.example.com");
        assert_eq!(settings.region, "FromFile");
        assert_eq!(settings.username, "demo");
        assert_eq!(settings.password.expose_secret(), "pw");
        assert_eq!(settings.user_domain_name, "ldap");
        assert_eq!(settings.interface().unwrap(), Interface::Internal);
        assert!(settings.insecure);
    }

    #[test]
    fn test_validation_errors() {
        let settings = ProviderSettings::default();
        assert!(matches!(
            settings.validate(),
            Err(ProviderError::InvalidConfig(_))
        ));

        let settings = ProviderSettings {
            auth_url: "https://keystone.example.com".into(),
            username: "admin".into(),
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        let settings = ProviderSettings {
            auth_url: "https://keystone.example.com".into(),
            token: SecureString::from("gAAAA"),
            endpoint_type: "private".into(),
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_token_credentials_preferred() {
        let settings = ProviderSettings {
            auth_url: "https://keystone.example.com".into(),
            username: "admin".into(),
            password: SecureString::from("pw"),
            token: SecureString::from("gAAAA"),
            ..Default::default()
        };
        assert!(matches!(
            settings.identity_config().credentials,
            Credentials::Token { .. }
        ));
        assert!(settings.identity_config().scope.is_none());
    }

    #[test]
    fn test_from_settings_does_not_contact_keystone() {
        let settings = ProviderSettings {
            auth_url: "https://keystone.invalid".into(),
            token: SecureString::from("gAAAA"),
            region: "RegionOne".into(),
            ..Default::default()
        };
        let config = Config::from_settings(&settings).unwrap();
        assert_eq!(config.region, "RegionOne");
    }

    #[test]
    fn test_get_region() {
        let config = Config::new("RegionOne", Arc::new(MockClientFactory::new()));
        let mut d = ResourceData::default();
        assert_eq!(get_region(&d, &config), "RegionOne");
        d.set("region", "RegionTwo");
        assert_eq!(get_region(&d, &config), "RegionTwo");
    }

    #[tokio::test]
    async fn test_client_errors_name_the_service() {
        let config = Config::new(
            "RegionOne",
            Arc::new(MockClientFactory::failing(
                tfos_client::ServiceError::EndpointNotFound("placement".into()),
            )),
        );
        let err = config.placement_v1_client("RegionOne").await.err().unwrap();
        assert!(err
            .to_string()
            .starts_with("Error creating OpenStack placement client"));
        let err = config.key_manager_v1_client("RegionOne").await.err().unwrap();
        assert!(err
            .to_string()
            .starts_with("Error creating OpenStack KeyManager client"));
    }
}
