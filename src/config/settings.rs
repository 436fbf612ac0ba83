//! # Configuration Settings
//!
//! Defines the configuration structure for the edgeplane convergence engine.
//!
//! Global settings (TLS policy, templates, toggles) are an explicit value handed
//! to the builder and the reconciler at construction time. Nothing in the
//! engine reads process-wide state after startup.

use crate::errors::{EdgeplaneError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use validator::Validate;

/// Environment variable prefix for layered configuration (`EDGEPLANE__TLS__ENABLED`)
pub const ENV_PREFIX: &str = "EDGEPLANE";

/// Placeholder substituted with the group name in the description template
pub const GROUP_PLACEHOLDER: &str = "{group}";

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct EngineConfig {
    /// Viewer TLS configuration
    #[validate(nested)]
    pub tls: TlsSettings,

    /// Access logging configuration
    #[validate(nested)]
    pub logging: AccessLogSettings,

    /// Serve the distribution over IPv6 and publish AAAA aliases
    pub ipv6_enabled: bool,

    /// Tags applied last, overriding every other tag source
    pub custom_tags: BTreeMap<String, String>,

    /// Distribution description; `{group}` is replaced by the group name
    #[validate(length(min = 1, message = "Description template cannot be empty"))]
    pub description_template: String,

    /// Host of the catch-all origin behind the default behavior
    #[validate(length(min = 1, message = "Default origin host cannot be empty"))]
    pub default_origin_host: String,

    /// DNS alias management
    #[validate(nested)]
    pub alias: AliasSettings,

    /// Allow creating a distribution for a group that has none
    pub creation_enabled: bool,

    /// Allow deleting the distribution of a group that became empty
    pub deletion_enabled: bool,

    /// Tag key marking resources as managed by this engine
    #[validate(length(min = 1, message = "Managed tag key cannot be empty"))]
    pub managed_tag_key: String,

    /// Tag key carrying the group name
    #[validate(length(min = 1, message = "Group tag key cannot be empty"))]
    pub group_tag_key: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tls: TlsSettings::default(),
            logging: AccessLogSettings::default(),
            ipv6_enabled: true,
            custom_tags: BTreeMap::new(),
            description_template: "Serve contents for {group} group.".to_string(),
            default_origin_host: "default.origin.invalid".to_string(),
            alias: AliasSettings::default(),
            creation_enabled: true,
            deletion_enabled: true,
            managed_tag_key: "edgeplane.io/managed-by".to_string(),
            group_tag_key: "edgeplane.io/group".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load configuration in layers: defaults, optional file, then
    /// `EDGEPLANE__*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            if !path.exists() {
                return Err(EdgeplaneError::config(format!(
                    "Configuration file '{}' does not exist",
                    path.display()
                )));
            }
            builder = builder.add_source(config::File::from(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(EdgeplaneError::from)?;
        self.validate_custom()
    }

    /// Cross-field rules the validator derive cannot express
    fn validate_custom(&self) -> Result<()> {
        if self.logging.enabled && self.logging.bucket.trim().is_empty() {
            return Err(EdgeplaneError::validation_field(
                "Access logging is enabled but no bucket is configured",
                "logging.bucket",
            ));
        }

        if self.alias.enabled && self.alias.ownership_token.contains('"') {
            return Err(EdgeplaneError::validation_field(
                "Ownership token must not contain quotes",
                "alias.ownership_token",
            ));
        }

        Ok(())
    }

    /// Render the distribution description for a group
    pub fn description_for(&self, group: &str) -> String {
        self.description_template.replace(GROUP_PLACEHOLDER, group)
    }

    /// Render the access log prefix for a group
    pub fn log_prefix_for(&self, group: &str) -> String {
        self.logging.prefix.replace(GROUP_PLACEHOLDER, group)
    }
}

/// Viewer TLS configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TlsSettings {
    /// Resolve a certificate and serve alternate domains over TLS
    pub enabled: bool,

    /// Minimum protocol version / cipher policy
    #[validate(length(min = 1, message = "Security policy cannot be empty"))]
    pub security_policy: String,

    /// How the CDN serves HTTPS requests
    #[validate(length(min = 1, message = "SSL support method cannot be empty"))]
    pub ssl_support_method: String,
}

impl Default for TlsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            security_policy: "TLSv1.2_2021".to_string(),
            ssl_support_method: "sni-only".to_string(),
        }
    }
}

/// Access logging target
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AccessLogSettings {
    pub enabled: bool,

    /// Bucket receiving access logs
    pub bucket: String,

    /// Key prefix; `{group}` is replaced by the group name
    pub prefix: String,
}

/// DNS alias management
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AliasSettings {
    /// Publish alias records for alternate domains
    pub enabled: bool,

    /// Value written to TXT records to claim DNS names
    #[validate(length(min = 1, message = "Ownership token cannot be empty"))]
    pub ownership_token: String,
}

impl Default for AliasSettings {
    fn default() -> Self {
        Self { enabled: false, ownership_token: "heritage=edgeplane".to_string() }
    }
}

/// Logging configuration for the binary
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ObservabilityConfig {
    /// Log level or `EnvFilter` directive (trace, debug, info, warn, error)
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string(), json_logging: false }
    }
}

impl ObservabilityConfig {
    /// Create observability configuration from environment variables
    pub fn from_env() -> Self {
        let log_level = std::env::var("EDGEPLANE_LOG_LEVEL")
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| "info".to_string());

        let json_logging = std::env::var("EDGEPLANE_JSON_LOGS")
            .map(|s| s.to_lowercase() == "true" || s == "1")
            .unwrap_or(false);

        Self { log_level, json_logging }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.tls.enabled);
        assert!(config.creation_enabled);
        assert!(config.deletion_enabled);
    }

    #[test]
    fn test_description_template() {
        let config = EngineConfig::default();
        assert_eq!(config.description_for("public"), "Serve contents for public group.");
    }

    #[test]
    fn test_logging_requires_bucket() {
        let mut config = EngineConfig::default();
        config.logging.enabled = true;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, EdgeplaneError::Validation { .. }));

        config.logging.bucket = "logs.example.com".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_ownership_token_rejected() {
        let mut config = EngineConfig::default();
        config.alias.ownership_token = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
ipv6_enabled = false
deletion_enabled = false

[tls]
enabled = true

[alias]
enabled = true
ownership_token = "heritage=edgeplane,owner=prod"

[custom_tags]
team = "edge"
"#
        )
        .unwrap();

        let config = EngineConfig::load(Some(file.path())).unwrap();
        assert!(!config.ipv6_enabled);
        assert!(!config.deletion_enabled);
        assert!(config.tls.enabled);
        assert_eq!(config.tls.security_policy, "TLSv1.2_2021");
        assert!(config.alias.enabled);
        assert_eq!(config.alias.ownership_token, "heritage=edgeplane,owner=prod");
        assert_eq!(config.custom_tags.get("team").map(String::as_str), Some("edge"));
    }

    #[test]
    fn test_load_missing_file_fails() {
        let err = EngineConfig::load(Some(Path::new("/nonexistent/edgeplane.toml"))).unwrap_err();
        assert!(matches!(err, EdgeplaneError::Config { .. }));
    }
}
