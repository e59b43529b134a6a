//! Profile configuration and credential resolution
//!
//! Profiles live in a TOML file at `~/.config/rescale/apiconfig`, one table per
//! profile:
//!
//! ```toml
//! [default]
//! apikey = "${RESCALE_KEY_FROM_VAULT}"
//! apiurl = "https://platform.rescale.com/api/v3/"
//!
//! [eu]
//! apikey = "..."
//! apiurl = "https://eu.rescale.com/api/v3/"
//! ```
//!
//! Each of the API key and URL is resolved independently: environment
//! variable first, then the profile value, then (URL only) the platform
//! default.

use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

use super::error::{ConfigError, Result};
use super::settings::ClientSettings;

/// Platform endpoint used when neither the environment nor the profile names one
pub const DEFAULT_API_URL: &str = "https://platform.rescale.com/api/v3/";

/// Profile used when the caller does not name one
pub const DEFAULT_PROFILE: &str = "default";

/// Environment variable overriding the API key of every profile
pub const API_KEY_ENV: &str = "RESCALE_API_KEY";

/// Environment variable overriding the API URL of every profile
pub const API_URL_ENV: &str = "RESCALE_API_URL";

/// Map of profile name -> profile
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
#[serde(transparent)]
pub struct Config {
    pub profiles: HashMap<String, Profile>,
}

/// Individual profile configuration
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Profile {
    /// API token sent as `Authorization: Token <apikey>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apikey: Option<String>,
    /// Base URL of the REST API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apiurl: Option<String>,
    /// Client behaviour overrides for this profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientSettings>,
}

/// Resolved connection credentials, immutable for the life of a client
#[derive(Clone, PartialEq)]
pub struct Credentials {
    api_key: Option<String>,
    base_url: Url,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

impl Credentials {
    /// Build credentials from explicit values.
    ///
    /// A base URL without a trailing slash gets one, so relative paths such as
    /// `jobs/` resolve underneath it rather than replacing its last segment.
    pub fn new(api_key: Option<String>, base_url: &str) -> Result<Self> {
        Ok(Self {
            api_key,
            base_url: parse_base_url(base_url)?,
        })
    }

    /// Resolve credentials for `profile` from the standard config file and
    /// the process environment
    pub fn resolve(profile: Option<&str>) -> Result<Self> {
        Config::load()?.resolve_credentials(profile, |var| std::env::var(var).ok())
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    Url::parse(&normalized).map_err(|source| ConfigError::InvalidUrl {
        url: raw.to_string(),
        source,
    })
}

impl Config {
    /// Resolve credentials for a profile using `lookup` for environment access.
    ///
    /// Fails only when the profile is absent from the file and no API key is
    /// provided through the environment. A key missing everywhere resolves to
    /// `None`; the server rejects such requests at call time.
    ///
    /// An empty `RESCALE_API_KEY` or `RESCALE_API_URL` counts as unset: it
    /// neither overrides the profile nor stands in for a missing one, so
    /// `RESCALE_API_KEY=""` with an unknown profile is still
    /// [`ConfigError::ProfileNotFound`].
    pub fn resolve_credentials<F>(&self, profile: Option<&str>, lookup: F) -> Result<Credentials>
    where
        F: Fn(&str) -> Option<String>,
    {
        let name = profile.unwrap_or(DEFAULT_PROFILE);
        let env_key = lookup(API_KEY_ENV).filter(|v| !v.is_empty());
        let env_url = lookup(API_URL_ENV).filter(|v| !v.is_empty());

        let stored = match self.profiles.get(name) {
            Some(p) => Some(p),
            None if env_key.is_some() => {
                debug!(
                    "Profile '{}' not found, using {} from environment",
                    name, API_KEY_ENV
                );
                None
            }
            None => {
                return Err(ConfigError::ProfileNotFound {
                    name: name.to_string(),
                });
            }
        };

        if env_key.is_some() {
            debug!("Found {} environment variable", API_KEY_ENV);
        }
        if env_url.is_some() {
            debug!("Found {} environment variable", API_URL_ENV);
        }

        let api_key = env_key.or_else(|| {
            stored
                .and_then(|p| p.apikey.clone())
                .filter(|k| !k.is_empty())
        });
        let api_url = env_url
            .or_else(|| {
                stored
                    .and_then(|p| p.apiurl.clone())
                    .filter(|u| !u.is_empty())
            })
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        info!("Using Rescale profile '{}' at {}", name, api_url);
        Credentials::new(api_key, &api_url)
    }

    /// Client settings for a profile, falling back to defaults
    pub fn settings_for(&self, profile: Option<&str>) -> ClientSettings {
        self.profiles
            .get(profile.unwrap_or(DEFAULT_PROFILE))
            .and_then(|p| p.client.clone())
            .unwrap_or_default()
    }

    /// Load configuration from the standard location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path; a missing file is an empty config
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            debug!("No config file at {}", config_path.display());
            return Ok(Config::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::LoadError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        let expanded_content = Self::expand_env_vars(&content);
        let config: Config = toml::from_str(&expanded_content)?;

        Ok(config)
    }

    /// Save configuration to the standard location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to_path(&config_path)
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::SaveError {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let content = toml::to_string_pretty(self)?;

        fs::write(config_path, content).map_err(|e| ConfigError::SaveError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        Ok(())
    }

    /// Set or update a profile
    pub fn set_profile(&mut self, name: String, profile: Profile) {
        self.profiles.insert(name, profile);
    }

    /// Remove a profile by name
    pub fn remove_profile(&mut self, name: &str) -> Option<Profile> {
        self.profiles.remove(name)
    }

    /// List all profiles sorted by name
    pub fn list_profiles(&self) -> Vec<(&String, &Profile)> {
        let mut profiles: Vec<_> = self.profiles.iter().collect();
        profiles.sort_by_key(|(name, _)| *name);
        profiles
    }

    /// `~/.config/rescale/apiconfig` on every platform
    pub fn config_path() -> Result<PathBuf> {
        let base_dirs = BaseDirs::new().ok_or(ConfigError::ConfigDirError)?;
        Ok(base_dirs
            .home_dir()
            .join(".config")
            .join("rescale")
            .join("apiconfig"))
    }

    /// Expand `${VAR}` and `${VAR:-default}` references in the raw file.
    ///
    /// Unset variables are left as-is so profiles that are never used do not
    /// break loading.
    fn expand_env_vars(content: &str) -> String {
        let expanded =
            shellexpand::env_with_context_no_errors(content, |var| std::env::var(var).ok());
        expanded.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn config_with(name: &str, profile: Profile) -> Config {
        let mut config = Config::default();
        config.set_profile(name.to_string(), profile);
        config
    }

    #[test]
    fn test_config_serialization() {
        let config = config_with(
            "default",
            Profile {
                apikey: Some("test-key".to_string()),
                apiurl: Some("https://eu.rescale.com/api/v3/".to_string()),
                client: None,
            },
        );

        let serialized = toml::to_string(&config).unwrap();
        assert!(serialized.contains("[default]"));
        let deserialized: Config = toml::from_str(&serialized).unwrap();

        assert_eq!(config.profiles, deserialized.profiles);
    }

    #[test]
    fn test_profile_values_used_without_env() {
        let config = config_with(
            "default",
            Profile {
                apikey: Some("file-key".to_string()),
                apiurl: Some("https://eu.rescale.com/api/v3/".to_string()),
                client: None,
            },
        );

        let creds = config.resolve_credentials(None, no_env).unwrap();
        assert_eq!(creds.api_key(), Some("file-key"));
        assert_eq!(creds.base_url().as_str(), "https://eu.rescale.com/api/v3/");
    }

    #[test]
    fn test_env_overrides_each_value_independently() {
        let config = config_with(
            "work",
            Profile {
                apikey: Some("file-key".to_string()),
                apiurl: Some("https://eu.rescale.com/api/v3/".to_string()),
                client: None,
            },
        );

        let creds = config
            .resolve_credentials(Some("work"), |var| {
                (var == API_KEY_ENV).then(|| "env-key".to_string())
            })
            .unwrap();
        assert_eq!(creds.api_key(), Some("env-key"));
        assert_eq!(creds.base_url().as_str(), "https://eu.rescale.com/api/v3/");

        let creds = config
            .resolve_credentials(Some("work"), |var| {
                (var == API_URL_ENV).then(|| "http://localhost:9000/api/v3/".to_string())
            })
            .unwrap();
        assert_eq!(creds.api_key(), Some("file-key"));
        assert_eq!(creds.base_url().as_str(), "http://localhost:9000/api/v3/");
    }

    #[test]
    fn test_unknown_profile_is_an_error() {
        let config = Config::default();
        let err = config.resolve_credentials(Some("nope"), no_env).unwrap_err();
        assert!(matches!(err, ConfigError::ProfileNotFound { ref name } if name == "nope"));
        assert!(err.to_string().contains("Unknown profile name: nope"));
    }

    #[test]
    fn test_unknown_profile_allowed_with_env_key() {
        let config = Config::default();
        let creds = config
            .resolve_credentials(None, |var| {
                (var == API_KEY_ENV).then(|| "env-key".to_string())
            })
            .unwrap();
        assert_eq!(creds.api_key(), Some("env-key"));
        assert_eq!(creds.base_url().as_str(), DEFAULT_API_URL);
    }

    #[test]
    fn test_empty_env_values_count_as_unset() {
        let empty = |_: &str| Some(String::new());

        let err = Config::default()
            .resolve_credentials(Some("nope"), empty)
            .unwrap_err();
        assert!(matches!(err, ConfigError::ProfileNotFound { .. }));

        let config = config_with(
            "default",
            Profile {
                apikey: Some("file-key".to_string()),
                apiurl: Some("https://eu.rescale.com/api/v3/".to_string()),
                client: None,
            },
        );
        let creds = config.resolve_credentials(None, empty).unwrap();
        assert_eq!(creds.api_key(), Some("file-key"));
        assert_eq!(creds.base_url().as_str(), "https://eu.rescale.com/api/v3/");
    }

    #[test]
    fn test_missing_key_and_empty_url_fall_back() {
        let config = config_with(
            "default",
            Profile {
                apikey: None,
                apiurl: Some(String::new()),
                client: None,
            },
        );

        let creds = config.resolve_credentials(None, no_env).unwrap();
        assert!(creds.api_key().is_none());
        assert_eq!(creds.base_url().as_str(), DEFAULT_API_URL);
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let creds = Credentials::new(None, "https://eu.rescale.com/api/v3").unwrap();
        assert_eq!(creds.base_url().as_str(), "https://eu.rescale.com/api/v3/");
    }

    #[test]
    fn test_invalid_url_rejected() {
        let err = Credentials::new(None, "not a url").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let creds = Credentials::new(Some("super-secret".to_string()), DEFAULT_API_URL).unwrap();
        let rendered = format!("{:?}", creds);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_settings_for_profile() {
        let config: Config = toml::from_str(
            r#"
[default]
apikey = "k"

[default.client]
page_size = 10
"#,
        )
        .unwrap();

        assert_eq!(config.settings_for(None).page_size, 10);
        assert_eq!(config.settings_for(Some("other")), ClientSettings::default());
    }

    #[test]
    #[serial_test::serial]
    fn test_env_var_expansion_with_defaults() {
        unsafe {
            std::env::set_var("RESCALE_TEST_KEY", "expanded-key");
            std::env::remove_var("RESCALE_TEST_MISSING_URL");
        }

        let content = r#"
[default]
apikey = "${RESCALE_TEST_KEY}"
apiurl = "${RESCALE_TEST_MISSING_URL:-https://platform.rescale.com/api/v3/}"
"#;

        let expanded = Config::expand_env_vars(content);
        let config: Config = toml::from_str(&expanded).unwrap();
        let profile = config.profiles.get("default").unwrap();
        assert_eq!(profile.apikey.as_deref(), Some("expanded-key"));
        assert_eq!(profile.apiurl.as_deref(), Some(DEFAULT_API_URL));

        unsafe {
            std::env::remove_var("RESCALE_TEST_KEY");
        }
    }

    #[test]
    fn test_list_and_remove_profiles() {
        let mut config = Config::default();
        config.set_profile("zeta".to_string(), Profile::default());
        config.set_profile("alpha".to_string(), Profile::default());

        let names: Vec<_> = config.list_profiles().into_iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);

        assert!(config.remove_profile("alpha").is_some());
        assert!(config.remove_profile("alpha").is_none());
    }
}
