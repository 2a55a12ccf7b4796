//! Profile configuration and environment snapshot.
//!
//! The CLI only reads profiles. The default profile lives in
//! `<dir>/config.toml`; any other profile in `<dir>/profiles/<name>.toml`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CliError, Result};

/// Overrides the configuration directory.
pub const ENV_CONFIG_DIR: &str = "STACKIT_CONFIG_DIR";
/// Selects the active profile.
pub const ENV_PROFILE: &str = "STACKIT_CLI_PROFILE";
/// Name of the profile used when none is selected.
pub const DEFAULT_PROFILE: &str = "default";

const MAX_PROFILE_NAME_LEN: usize = 64;

/// A read-only view of the process environment.
///
/// Captured once in `main`; tests build one from literal pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    /// Captures the current process environment.
    #[must_use]
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// Builds a snapshot from key/value pairs.
    #[must_use]
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Returns the value of a variable. Empty values count as unset.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

/// Values read from a profile file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    /// Default project ID.
    pub project_id: Option<String>,
    /// Default region.
    pub region: Option<String>,
    /// Default output format.
    pub output_format: Option<String>,
    /// Default verbosity.
    pub verbosity: Option<String>,
    /// KMS endpoint override.
    pub kms_custom_endpoint: Option<String>,
    /// SFS endpoint override.
    pub sfs_custom_endpoint: Option<String>,
    /// Observability endpoint override.
    pub observability_custom_endpoint: Option<String>,
    /// Resource Manager endpoint override.
    pub resource_manager_custom_endpoint: Option<String>,
}

impl Profile {
    /// Load a profile from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Config`] if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| CliError::Config {
            path: path.display().to_string(),
            message: format!("failed to read: {e}"),
        })?;

        Self::from_toml(&content).map_err(|message| CliError::Config {
            path: path.display().to_string(),
            message,
        })
    }

    /// Parse a profile from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns the rendered parse error if the TOML is invalid.
    pub fn from_toml(content: &str) -> std::result::Result<Self, String> {
        let profile: Self = toml::from_str(content).map_err(|e| format!("invalid TOML: {e}"))?;
        profile.validate()?;
        Ok(profile)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        let endpoints = [
            ("kms_custom_endpoint", &self.kms_custom_endpoint),
            ("sfs_custom_endpoint", &self.sfs_custom_endpoint),
            ("observability_custom_endpoint", &self.observability_custom_endpoint),
            ("resource_manager_custom_endpoint", &self.resource_manager_custom_endpoint),
        ];
        for (key, value) in endpoints {
            if let Some(url) = value {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(format!("{key} must start with http:// or https://"));
                }
            }
        }
        Ok(())
    }
}

/// The loaded configuration of one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Active profile name.
    pub profile_name: String,
    /// File the profile was read from, if it existed.
    pub source: Option<PathBuf>,
    /// Profile values.
    pub profile: Profile,
}

impl Config {
    /// Builds a configuration from an in-memory profile.
    #[must_use]
    pub fn with_profile(profile: Profile) -> Self {
        Self {
            profile_name: DEFAULT_PROFILE.to_owned(),
            source: None,
            profile,
        }
    }

    /// Loads the active profile.
    ///
    /// A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Config`] if the profile name is invalid or the file
    /// is unreadable or malformed.
    pub fn load(env: &EnvSnapshot) -> Result<Self> {
        let profile_name = env.get(ENV_PROFILE).unwrap_or(DEFAULT_PROFILE).to_owned();
        validate_profile_name(&profile_name)?;

        let Some(dir) = config_dir(env) else {
            tracing::debug!("no configuration directory available");
            return Ok(Self {
                profile_name,
                ..Self::default()
            });
        };

        let path = profile_path(&dir, &profile_name);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "profile file not found, using defaults");
            return Ok(Self {
                profile_name,
                source: None,
                profile: Profile::default(),
            });
        }

        let profile = Profile::from_file(&path)?;
        tracing::debug!(path = %path.display(), profile = %profile_name, "loaded profile");
        Ok(Self {
            profile_name,
            source: Some(path),
            profile,
        })
    }
}

/// Returns the configuration directory.
#[must_use]
pub fn config_dir(env: &EnvSnapshot) -> Option<PathBuf> {
    env.get(ENV_CONFIG_DIR)
        .map(PathBuf::from)
        .or_else(|| dirs::config_dir().map(|d| d.join("stackit")))
}

/// Returns the file holding the named profile.
#[must_use]
pub fn profile_path(dir: &Path, name: &str) -> PathBuf {
    if name == DEFAULT_PROFILE {
        dir.join("config.toml")
    } else {
        dir.join("profiles").join(format!("{name}.toml"))
    }
}

fn validate_profile_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= MAX_PROFILE_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(CliError::Config {
            path: format!("profile {name:?}"),
            message: "profile name must contain only alphanumeric characters, hyphens, and underscores"
                .to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn env_with_dir(dir: &Path) -> EnvSnapshot {
        EnvSnapshot::from_pairs([(ENV_CONFIG_DIR, dir.display().to_string())])
    }

    #[test]
    fn empty_env_values_count_as_unset() {
        let env = EnvSnapshot::from_pairs([("A", ""), ("B", "x")]);
        assert_eq!(env.get("A"), None);
        assert_eq!(env.get("B"), Some("x"));
        assert_eq!(env.get("C"), None);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config::load(&env_with_dir(dir.path())).expect("load");
        assert_eq!(config.profile_name, "default");
        assert!(config.source.is_none());
        assert_eq!(config.profile, Profile::default());
    }

    #[test]
    fn default_profile_is_read_from_config_toml() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("config.toml"),
            "project_id = \"00000000-0000-0000-0000-000000000001\"\nregion = \"eu02\"\n",
        )
        .expect("write");

        let config = Config::load(&env_with_dir(dir.path())).expect("load");
        assert_eq!(
            config.profile.project_id.as_deref(),
            Some("00000000-0000-0000-0000-000000000001")
        );
        assert_eq!(config.profile.region.as_deref(), Some("eu02"));
        assert!(config.source.is_some());
    }

    #[test]
    fn named_profile_is_read_from_profiles_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(dir.path().join("profiles")).expect("mkdir");
        std::fs::write(
            dir.path().join("profiles").join("staging.toml"),
            "output_format = \"json\"\nkms_custom_endpoint = \"http://localhost:8080\"\n",
        )
        .expect("write");

        let env = EnvSnapshot::from_pairs([
            (ENV_CONFIG_DIR, dir.path().display().to_string()),
            (ENV_PROFILE, "staging".to_owned()),
        ]);
        let config = Config::load(&env).expect("load");
        assert_eq!(config.profile_name, "staging");
        assert_eq!(config.profile.output_format.as_deref(), Some("json"));
        assert_eq!(
            config.profile.kms_custom_endpoint.as_deref(),
            Some("http://localhost:8080")
        );
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("config.toml"), "region = [").expect("write");
        let err = Config::load(&env_with_dir(dir.path())).expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.to_string().contains("invalid TOML"));
    }

    #[test]
    fn endpoint_scheme_is_validated() {
        let err = Profile::from_toml("sfs_custom_endpoint = \"sfs.local\"").expect_err("should fail");
        assert!(err.contains("sfs_custom_endpoint"));
    }

    #[test]
    fn profile_name_with_path_separator_is_rejected() {
        let env = EnvSnapshot::from_pairs([(ENV_PROFILE, "../etc")]);
        let err = Config::load(&env).expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let profile = Profile::from_toml("session_time_limit = \"2h\"").expect("parse");
        assert_eq!(profile, Profile::default());
    }
}
