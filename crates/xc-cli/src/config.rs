//! xc configuration
//!
//! Loaded with figment, lowest to highest priority:
//! defaults, the JSON file (`~/.xc.conf` unless `--config` is given),
//! `XC_*` environment variables, then command-line overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Json, Serialized},
    Figment,
};
use serde::{Deserialize, Serialize};

use xc_core::{Address, Contact, PresenceStatus, Subscription};

const CONFIG_FILE_NAME: &str = ".xc.conf";
const SEED_RESOURCE: &str = "loopback";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XcConfig {
    /// Local account address; required
    #[serde(default)]
    pub jid: String,

    /// Service trust material, handed to the transport as-is
    #[serde(default)]
    pub trust: Option<PathBuf>,

    /// How long to wait for the session before giving up
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,

    /// Contacts known to the loopback transport
    #[serde(default)]
    pub contacts: Vec<SeedContact>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedContact {
    pub jid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub subscription: Subscription,
    #[serde(default)]
    pub online: bool,
}

fn default_startup_timeout_secs() -> u64 {
    30
}

impl Default for XcConfig {
    fn default() -> Self {
        Self {
            jid: String::new(),
            trust: None,
            startup_timeout_secs: default_startup_timeout_secs(),
            contacts: Vec::new(),
        }
    }
}

impl XcConfig {
    /// Load from `path` (or the default location) with an optional address override
    pub fn load(path: Option<&Path>, jid_override: Option<String>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };

        let mut figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Json::file(&path))
            .merge(Env::prefixed("XC_"));
        if let Some(jid) = jid_override {
            figment = figment.merge(("jid", jid));
        }

        let config: XcConfig = figment
            .extract()
            .map_err(|e| ConfigError::Loading(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(CONFIG_FILE_NAME))
            .ok_or_else(|| ConfigError::Environment("no home directory".to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let jid = self.jid.trim();
        if jid.is_empty() {
            return Err(ConfigError::MissingJid);
        }
        if jid.contains(char::is_whitespace) || jid.contains('/') {
            return Err(ConfigError::Validation(format!(
                "jid must be a bare address, got {:?}",
                self.jid
            )));
        }
        if self.startup_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "startup_timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn address(&self) -> Address {
        Address::new(self.jid.trim())
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    /// Seed contacts as roster entries; online ones get one available resource
    pub fn seed_contacts(&self) -> Vec<Contact> {
        self.contacts
            .iter()
            .map(|seed| {
                let contact = Contact::new(seed.jid.as_str(), seed.name.as_str())
                    .with_subscription(seed.subscription);
                if seed.online {
                    contact.with_resource(SEED_RESOURCE, PresenceStatus::Available)
                } else {
                    contact
                }
            })
            .collect()
    }

    /// Example file content shown when configuration is unusable
    pub fn example_config() -> &'static str {
        r#"{"jid": "foo@bar.com"}"#
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No JID")]
    MissingJid,

    #[error("Configuration loading error: {0}")]
    Loading(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment error: {0}")]
    Environment(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_load_from_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "xc.conf",
                r#"{
                    "jid": "me@example.com",
                    "startup_timeout_secs": 5,
                    "contacts": [{"jid": "bob@example.com", "name": "Bob", "online": true}]
                }"#,
            )?;
            let config =
                XcConfig::load(Some(Path::new("xc.conf")), None).map_err(|e| e.to_string())?;
            assert_eq!(config.address(), Address::new("me@example.com"));
            assert_eq!(config.startup_timeout(), Duration::from_secs(5));

            let seeds = config.seed_contacts();
            assert_eq!(seeds.len(), 1);
            assert_eq!(seeds[0].display_name, "Bob");
            assert!(seeds[0].is_online());
            Ok(())
        });
    }

    #[test]
    fn test_missing_jid_is_fatal() {
        Jail::expect_with(|jail| {
            jail.create_file("xc.conf", r#"{"trust": "/etc/ssl/ca.pem"}"#)?;
            let err = XcConfig::load(Some(Path::new("xc.conf")), None).unwrap_err();
            assert!(matches!(err, ConfigError::MissingJid));

            let err = XcConfig::load(Some(Path::new("absent.conf")), None).unwrap_err();
            assert!(matches!(err, ConfigError::MissingJid));
            Ok(())
        });
    }

    #[test]
    fn test_malformed_file_is_fatal() {
        Jail::expect_with(|jail| {
            jail.create_file("xc.conf", "{ not json")?;
            let err = XcConfig::load(Some(Path::new("xc.conf")), None).unwrap_err();
            assert!(matches!(err, ConfigError::Loading(_)));
            Ok(())
        });
    }

    #[test]
    fn test_env_and_override_priority() {
        Jail::expect_with(|jail| {
            jail.create_file("xc.conf", r#"{"jid": "file@example.com"}"#)?;
            jail.set_env("XC_JID", "env@example.com");
            let config =
                XcConfig::load(Some(Path::new("xc.conf")), None).map_err(|e| e.to_string())?;
            assert_eq!(config.jid, "env@example.com");

            let jid = Some("cli@example.com".to_string());
            let config =
                XcConfig::load(Some(Path::new("xc.conf")), jid).map_err(|e| e.to_string())?;
            assert_eq!(config.jid, "cli@example.com");
            Ok(())
        });
    }

    #[test]
    fn test_validation() {
        let mut config = XcConfig {
            jid: "me@example.com/desktop".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        config.jid = "me@example.com".to_string();
        config.startup_timeout_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }
}
