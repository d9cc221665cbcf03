//! Poller configuration surface.
//!
//! The YAML document lists the devices to poll, the feature collectors to
//! run, optional per-device overrides and an optional replacement for the
//! default interface-description label pattern. Everything that can fail
//! (host patterns, the label pattern, auth material presence) is validated
//! when the document is loaded, so a bad config stops startup instead of
//! surfacing mid-poll.
//!
//! A loaded [`Config`] doubles as the process's [`CredentialSource`]: the
//! session manager hands it a device identity and gets back the username
//! plus password or key material from the matching entry.

use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::auth::{CredentialSource, Credentials};
use crate::device::{Device, TransportMode, normalize_addr};
use crate::error::{ConfigError, ConnectError};
use crate::labels::{DEFAULT_DESCRIPTION_PATTERN, LabelRegistry};
use crate::session::{SecurityLevel, SessionSettings};

/// Feature collectors that can be toggled globally or per device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct FeatureFlags {
    /// Interface description scanning (feeds the dynamic label schema).
    pub descriptions: bool,
    /// Per-interface status gauges.
    pub interfaces: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            descriptions: true,
            interfaces: true,
        }
    }
}

/// One device entry as written in the YAML document.
///
/// An entry either names one host exactly, or carries a `host_pattern`
/// regex and serves as the settings template for every host the pattern
/// matches.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DeviceSettings {
    /// Host name or address; also the display name of the entry.
    pub host: String,

    /// When set, these settings apply to any polled host matching this
    /// regex instead of only the exact `host`.
    #[serde(default)]
    pub host_pattern: Option<String>,

    pub username: String,

    #[serde(default)]
    pub password: Option<String>,

    /// Path to an OpenSSH/PEM private key; takes precedence over
    /// `password` when both are set.
    #[serde(default)]
    pub key_file: Option<PathBuf>,

    #[serde(default)]
    pub key_passphrase: Option<String>,

    #[serde(default)]
    pub mode: TransportMode,

    #[serde(default)]
    pub security: SecurityLevel,

    /// Per-device feature toggles; absent fields fall back to the global
    /// flags.
    #[serde(default)]
    pub features: Option<FeatureFlags>,
}

/// Session timeouts in seconds, as written in YAML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TimeoutSettings {
    pub connect_timeout_secs: u64,
    pub reconnect_interval_secs: u64,
    pub keepalive_timeout_secs: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        let defaults = SessionSettings::default();
        Self {
            connect_timeout_secs: defaults.connect_timeout.as_secs(),
            reconnect_interval_secs: defaults.reconnect_interval.as_secs(),
            keepalive_timeout_secs: defaults.keepalive_timeout.as_secs(),
        }
    }
}

impl From<TimeoutSettings> for SessionSettings {
    fn from(timeouts: TimeoutSettings) -> Self {
        Self {
            connect_timeout: Duration::from_secs(timeouts.connect_timeout_secs),
            reconnect_interval: Duration::from_secs(timeouts.reconnect_interval_secs),
            keepalive_timeout: Duration::from_secs(timeouts.keepalive_timeout_secs),
        }
    }
}

/// Root of the YAML document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Settings {
    pub devices: Vec<DeviceSettings>,
    pub features: FeatureFlags,
    /// Override for the `[name]` / `[name=value]` description pattern.
    pub interface_description_pattern: Option<String>,
    pub timeouts: TimeoutSettings,
}

/// Validated configuration with every pattern compiled.
pub struct Config {
    settings: Settings,
    /// Parallel to `settings.devices`; `Some` where the entry carries a
    /// host_pattern.
    host_patterns: Vec<Option<Regex>>,
    label_pattern: Regex,
}

impl Config {
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_yaml::from_str(text)?;
        Self::from_settings(settings)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        Self::from_yaml(&std::fs::read_to_string(path)?)
    }

    /// Validates and compiles a parsed settings document.
    pub fn from_settings(settings: Settings) -> Result<Self, ConfigError> {
        let mut host_patterns = Vec::with_capacity(settings.devices.len());
        for device in &settings.devices {
            if device.password.is_none() && device.key_file.is_none() {
                return Err(ConfigError::MissingAuth(device.host.clone()));
            }
            let pattern = match &device.host_pattern {
                Some(pattern) => Some(Regex::new(pattern).map_err(|source| {
                    ConfigError::HostPattern {
                        pattern: pattern.clone(),
                        source,
                    }
                })?),
                None => None,
            };
            host_patterns.push(pattern);
        }

        let label_pattern = settings
            .interface_description_pattern
            .as_deref()
            .unwrap_or(DEFAULT_DESCRIPTION_PATTERN);
        let label_pattern =
            Regex::new(label_pattern).map_err(|source| ConfigError::LabelPattern {
                pattern: label_pattern.to_string(),
                source,
            })?;

        Ok(Self {
            settings,
            host_patterns,
            label_pattern,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn session_settings(&self) -> SessionSettings {
        self.settings.timeouts.into()
    }

    /// A fresh label registry using the configured (or default) pattern.
    pub fn label_registry(&self) -> LabelRegistry {
        LabelRegistry::with_regex(self.label_pattern.clone())
    }

    /// The settings entry responsible for a host: first exact match, then
    /// first matching host_pattern, in document order.
    pub fn resolve(&self, host: &str) -> Option<&DeviceSettings> {
        let normalized = normalize_addr(host);
        self.settings
            .devices
            .iter()
            .zip(&self.host_patterns)
            .find_map(|(device, pattern)| match pattern {
                Some(pattern) if pattern.is_match(host) => Some(device),
                Some(_) => None,
                None if device.host == host || normalize_addr(&device.host) == normalized => {
                    Some(device)
                }
                None => None,
            })
    }

    /// Builds the device identity for a host from its matching entry.
    pub fn device(&self, host: &str) -> Option<Device> {
        self.resolve(host)
            .map(|settings| Device::new(host, settings.mode).with_security(settings.security))
    }

    /// Identities for every exactly-named device entry, i.e. the poll
    /// targets. Pattern entries only contribute settings for hosts named
    /// elsewhere.
    pub fn targets(&self) -> Vec<Device> {
        self.settings
            .devices
            .iter()
            .filter(|device| device.host_pattern.is_none())
            .map(|settings| Device::new(&settings.host, settings.mode).with_security(settings.security))
            .collect()
    }

    /// Effective feature flags for a host (entry override or global).
    pub fn features_for(&self, host: &str) -> FeatureFlags {
        self.resolve(host)
            .and_then(|device| device.features)
            .unwrap_or(self.settings.features)
    }
}

impl CredentialSource for Config {
    fn credentials(&self, device: &Device) -> Result<Credentials, ConnectError> {
        let settings = self.resolve(device.host()).ok_or_else(|| {
            ConnectError::Credentials(format!("no config entry matches {device}"))
        })?;
        if let Some(key_file) = &settings.key_file {
            return Credentials::from_key_file(
                &settings.username,
                key_file,
                settings.key_passphrase.clone(),
            );
        }
        if let Some(password) = &settings.password {
            return Ok(Credentials::with_password(&settings.username, password));
        }
        // from_settings rejects entries with neither; only a hand-built
        // Settings can get here.
        Err(ConnectError::Credentials(format!(
            "device {device} has no usable auth method"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, FeatureFlags};
    use crate::auth::{AuthKind, CredentialSource};
    use crate::device::TransportMode;
    use crate::error::ConfigError;
    use crate::session::{SecurityLevel, SessionSettings};
    use std::time::Duration;

    const BASIC_YAML: &str = r#"
devices:
  - host: edge1.example.net
    username: metrics
    password: hunter2
    mode: netconf
    security: legacy_compatible
  - host: lab-template
    host_pattern: "^lab-.*"
    username: lab
    password: lab
    features:
      descriptions: false
      interfaces: true
features:
  descriptions: true
  interfaces: true
timeouts:
  connect_timeout_secs: 3
  reconnect_interval_secs: 10
  keepalive_timeout_secs: 7
"#;

    #[test]
    fn basic_document_parses_and_resolves_exact_host() {
        let config = Config::from_yaml(BASIC_YAML).expect("config should load");

        let device = config.device("edge1.example.net").expect("entry matches");
        assert_eq!(device.addr(), "edge1.example.net:22");
        assert_eq!(device.mode(), TransportMode::Netconf);
        assert_eq!(device.security(), SecurityLevel::LegacyCompatible);

        let creds = config.credentials(&device).expect("password credentials");
        assert_eq!(creds.username, "metrics");
        assert!(matches!(creds.auth, AuthKind::Password(_)));
    }

    #[test]
    fn host_pattern_entry_serves_a_class_of_devices() {
        let config = Config::from_yaml(BASIC_YAML).expect("config should load");

        let device = config.device("lab-7").expect("pattern matches");
        assert_eq!(device.addr(), "lab-7:22");
        assert_eq!(
            config.features_for("lab-7"),
            FeatureFlags {
                descriptions: false,
                interfaces: true
            }
        );

        assert!(config.resolve("prod-7").is_none());
    }

    #[test]
    fn pattern_entries_are_not_poll_targets() {
        let config = Config::from_yaml(BASIC_YAML).expect("config should load");
        let targets = config.targets();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].addr(), "edge1.example.net:22");
    }

    #[test]
    fn timeouts_map_to_session_settings() {
        let config = Config::from_yaml(BASIC_YAML).expect("config should load");
        assert_eq!(
            config.session_settings(),
            SessionSettings {
                connect_timeout: Duration::from_secs(3),
                reconnect_interval: Duration::from_secs(10),
                keepalive_timeout: Duration::from_secs(7),
            }
        );
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config = Config::from_yaml("{}").expect("empty config is valid");
        assert_eq!(config.session_settings(), SessionSettings::default());
        assert_eq!(config.features_for("anything"), FeatureFlags::default());
        assert!(config.targets().is_empty());
    }

    #[test]
    fn entry_without_auth_material_fails_at_load() {
        let err = match Config::from_yaml(
            "devices:\n  - host: r1\n    username: metrics\n",
        ) {
            Ok(_) => panic!("entry without password or key should fail"),
            Err(err) => err,
        };
        match err {
            ConfigError::MissingAuth(host) => assert_eq!(host, "r1"),
            other => panic!("unexpected error type: {other}"),
        }
    }

    #[test]
    fn malformed_host_pattern_fails_at_load() {
        let yaml = "devices:\n  - host: t\n    host_pattern: '['\n    username: u\n    password: p\n";
        assert!(matches!(
            Config::from_yaml(yaml),
            Err(ConfigError::HostPattern { .. })
        ));
    }

    #[test]
    fn malformed_label_pattern_fails_at_load() {
        let yaml = "interface_description_pattern: '[unclosed'\n";
        assert!(matches!(
            Config::from_yaml(yaml),
            Err(ConfigError::LabelPattern { .. })
        ));
    }

    #[test]
    fn label_registry_uses_configured_pattern() {
        let yaml = r#"interface_description_pattern: '\{([^=}]+)(=[^}]+)?\}'"#;
        let config = Config::from_yaml(yaml).expect("config should load");
        let registry = config.label_registry();
        registry.observe_descriptions(
            "r1:22",
            &[("ge-0/0/0".to_string(), "uplink {site=fra1} {core}".to_string())],
        );
        assert_eq!(registry.label_names(), vec!["site", "core"]);
    }

    #[test]
    fn settings_schema_names_the_top_level_sections() {
        let schema = schemars::schema_for!(super::Settings);
        let json = serde_json::to_value(&schema).expect("schema serializes");
        let properties = json
            .get("properties")
            .and_then(|value| value.as_object())
            .expect("schema has properties");
        for section in ["devices", "features", "interface_description_pattern", "timeouts"] {
            assert!(properties.contains_key(section), "missing {section}");
        }
    }
}
