//! Global flags shared by every command.
//!
//! Each value is resolved in the order flag, environment, profile, default.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::config::{EnvSnapshot, Profile};
use crate::error::{CliError, Result};

/// Environment variable for the project ID.
pub const ENV_PROJECT_ID: &str = "STACKIT_PROJECT_ID";
/// Environment variable for the region.
pub const ENV_REGION: &str = "STACKIT_REGION";
/// Environment variable for the output format.
pub const ENV_OUTPUT_FORMAT: &str = "STACKIT_OUTPUT_FORMAT";
/// Environment variable for the verbosity.
pub const ENV_VERBOSITY: &str = "STACKIT_VERBOSITY";

/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "eu01";

/// Result rendering format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human readable tables and messages.
    #[default]
    Pretty,
    /// Indented JSON.
    Json,
    /// Block-style YAML.
    Yaml,
    /// No result output.
    None,
}

impl OutputFormat {
    /// Accepted spellings.
    pub const VALUES: &'static [&'static str] = &["pretty", "json", "yaml", "none"];

    /// Returns the canonical spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pretty => "pretty",
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::None => "none",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "yaml" => Ok(Self::Yaml),
            "none" => Ok(Self::None),
            _ => Err(format!(
                "unknown output format {s:?}, expected one of: {}",
                Self::VALUES.join(", ")
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostic level. Ordered from most to least verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// Everything, including parsed inputs.
    Debug,
    /// Informational messages.
    #[default]
    Info,
    /// Warnings and errors.
    Warning,
    /// Errors only.
    Error,
}

impl Verbosity {
    /// Accepted spellings.
    pub const VALUES: &'static [&'static str] = &["debug", "info", "warning", "error"];

    /// Returns the canonical spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl FromStr for Verbosity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            _ => Err(format!(
                "unknown verbosity {s:?}, expected one of: {}",
                Self::VALUES.join(", ")
            )),
        }
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Global flag values as given on the command line, before resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawGlobals {
    /// `--project-id`
    pub project_id: Option<String>,
    /// `--region`
    pub region: Option<String>,
    /// `--output-format`
    pub output_format: Option<String>,
    /// `--verbosity`
    pub verbosity: Option<String>,
    /// `--async`
    pub async_mode: bool,
    /// `--assume-yes`
    pub assume_yes: bool,
}

/// Resolved global flags. Read-only after resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlobalFlags {
    /// Project UUID, absent only for commands that do not need one.
    pub project_id: Option<String>,
    /// Region code, e.g. `eu01`.
    pub region: String,
    /// Result format.
    pub output_format: OutputFormat,
    /// Diagnostic level.
    pub verbosity: Verbosity,
    /// Skip waiting for asynchronous operations.
    #[serde(rename = "async")]
    pub async_mode: bool,
    /// Skip confirmation prompts.
    pub assume_yes: bool,
}

impl Default for GlobalFlags {
    fn default() -> Self {
        Self {
            project_id: None,
            region: DEFAULT_REGION.to_owned(),
            output_format: OutputFormat::default(),
            verbosity: Verbosity::default(),
            async_mode: false,
            assume_yes: false,
        }
    }
}

impl GlobalFlags {
    /// Resolves raw flags against the environment and the active profile.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::FlagValidation`] naming the global flag whose
    /// resolved value is invalid, wherever the value came from.
    pub fn resolve(raw: &RawGlobals, env: &EnvSnapshot, profile: &Profile) -> Result<Self> {
        let pick = |flag: Option<&str>, var: &str, stored: Option<&str>| -> Option<String> {
            flag.or_else(|| env.get(var))
                .or(stored)
                .map(|v| v.trim().to_owned())
        };

        let project_id = pick(raw.project_id.as_deref(), ENV_PROJECT_ID, profile.project_id.as_deref())
            .filter(|v| !v.is_empty())
            .map(|v| validate_project_id(&v).map(|()| v))
            .transpose()?;

        let region = pick(raw.region.as_deref(), ENV_REGION, profile.region.as_deref())
            .unwrap_or_else(|| DEFAULT_REGION.to_owned());
        validate_region(&region)?;

        let output_format = pick(raw.output_format.as_deref(), ENV_OUTPUT_FORMAT, profile.output_format.as_deref())
            .map(|v| v.parse::<OutputFormat>())
            .transpose()
            .map_err(|e| CliError::flag_validation("output-format", e))?
            .unwrap_or_default();

        let verbosity = pick(raw.verbosity.as_deref(), ENV_VERBOSITY, profile.verbosity.as_deref())
            .map(|v| v.parse::<Verbosity>())
            .transpose()
            .map_err(|e| CliError::flag_validation("verbosity", e))?
            .unwrap_or_default();

        Ok(Self {
            project_id,
            region,
            output_format,
            verbosity,
            async_mode: raw.async_mode,
            assume_yes: raw.assume_yes,
        })
    }

    /// Returns the project ID, or an empty string for commands that opted out.
    #[must_use]
    pub fn project(&self) -> &str {
        self.project_id.as_deref().unwrap_or_default()
    }

    /// Ensures a project ID is present.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::ProjectIdMissing`] if no project ID was resolved.
    pub fn require_project(&self) -> Result<&str> {
        self.project_id.as_deref().ok_or(CliError::ProjectIdMissing)
    }
}

fn validate_project_id(value: &str) -> Result<()> {
    crate::flags::parse_uuid(value).map_err(|e| e.for_flag("project-id"))?;
    Ok(())
}

fn validate_region(value: &str) -> Result<()> {
    let valid = (2..=16).contains(&value.len())
        && value.starts_with(|c: char| c.is_ascii_lowercase())
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(CliError::flag_validation(
            "region",
            format!("{value:?} is not a region code such as \"eu01\""),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use test_case::test_case;

    const PROJECT: &str = "00000000-0000-0000-0000-000000000001";

    #[test]
    fn defaults_apply_without_any_source() {
        let g = GlobalFlags::resolve(&RawGlobals::default(), &EnvSnapshot::default(), &Profile::default())
            .expect("resolve");
        assert_eq!(g, GlobalFlags::default());
        assert_eq!(g.project(), "");
        assert_eq!(
            g.require_project().expect_err("missing").kind(),
            ErrorKind::ProjectIdMissing
        );
    }

    #[test]
    fn flag_beats_env_beats_profile() {
        let profile = Profile {
            region: Some("eu03".into()),
            output_format: Some("yaml".into()),
            verbosity: Some("error".into()),
            project_id: Some(PROJECT.into()),
            ..Profile::default()
        };
        let env = EnvSnapshot::from_pairs([(ENV_REGION, "eu02"), (ENV_OUTPUT_FORMAT, "json")]);
        let raw = RawGlobals {
            region: Some("eu01".into()),
            ..RawGlobals::default()
        };

        let g = GlobalFlags::resolve(&raw, &env, &profile).expect("resolve");
        assert_eq!(g.region, "eu01");
        assert_eq!(g.output_format, OutputFormat::Json);
        assert_eq!(g.verbosity, Verbosity::Error);
        assert_eq!(g.project(), PROJECT);
    }

    #[test_case("output-format", RawGlobals { output_format: Some("xml".into()), ..RawGlobals::default() }; "bad output format")]
    #[test_case("verbosity", RawGlobals { verbosity: Some("loud".into()), ..RawGlobals::default() }; "bad verbosity")]
    #[test_case("region", RawGlobals { region: Some("EU 01".into()), ..RawGlobals::default() }; "bad region")]
    #[test_case("project-id", RawGlobals { project_id: Some("not-a-uuid".into()), ..RawGlobals::default() }; "bad project id")]
    fn invalid_values_name_the_flag(flag: &str, raw: RawGlobals) {
        let err = GlobalFlags::resolve(&raw, &EnvSnapshot::default(), &Profile::default())
            .expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::FlagValidation);
        assert!(err.to_string().contains(&format!("--{flag}")), "{err}");
    }

    #[test]
    fn output_format_is_case_insensitive() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!(" none ".parse::<OutputFormat>(), Ok(OutputFormat::None));
    }

    #[test]
    fn verbosity_is_ordered() {
        assert!(Verbosity::Debug < Verbosity::Info);
        assert!(Verbosity::Info < Verbosity::Warning);
        assert!(Verbosity::Warning < Verbosity::Error);
    }

    #[test]
    fn serializes_async_under_its_flag_name() {
        let value = serde_json::to_value(GlobalFlags::default()).expect("serialize");
        assert_eq!(value["async"], serde_json::json!(false));
        assert_eq!(value["output_format"], serde_json::json!("pretty"));
    }
}
