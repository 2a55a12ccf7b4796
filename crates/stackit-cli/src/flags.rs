//! Typed flags, positional arguments and flag constraints.
//!
//! Flags are declared as [`FlagSpec`]s and registered with clap as plain
//! strings. Parsing into typed values happens here so that every failure is
//! reported as `FLAG_VALIDATION` with the flag name.

use std::fs::File;
use std::io::{self, Read};

use clap::{Arg, ArgAction, ArgMatches};
use thiserror::Error;

use crate::error::{CliError, Result};

/// Largest file accepted by `@path` flag values.
pub const MAX_FILE_SIZE: u64 = 8 * 1024 * 1024;

/// Why a flag value was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlagError {
    /// Not a canonical UUID.
    #[error("invalid UUID {0:?}")]
    InvalidUuid(String),
    /// Not an integer.
    #[error("invalid integer {0:?}")]
    InvalidInteger(String),
    /// Below the lower bound.
    #[error("must be at least {0}")]
    BelowMinimum(i64),
    /// Above the upper bound.
    #[error("must be at most {0}")]
    AboveMaximum(i64),
    /// Not `true` or `false`.
    #[error("invalid boolean {0:?}, expected true or false")]
    InvalidBool(String),
    /// A CIDR list contained an empty element.
    #[error("empty element in CIDR list")]
    EmptyCidr,
    /// A CIDR list element did not parse.
    #[error("invalid CIDR {value:?}: {reason}")]
    InvalidCidr {
        /// Offending element.
        value: String,
        /// Parser message.
        reason: String,
    },
    /// Not one of the allowed values.
    #[error("invalid value {value:?}, expected one of: {}", .allowed.join(", "))]
    NotInEnum {
        /// Offending value.
        value: String,
        /// Allowed values.
        allowed: &'static [&'static str],
    },
    /// The `@path` file does not exist.
    #[error("file not found")]
    FileNotFound,
    /// The `@path` file is larger than [`MAX_FILE_SIZE`].
    #[error("file exceeds the {} MiB limit", MAX_FILE_SIZE / (1024 * 1024))]
    FileTooLarge,
    /// The `@path` file is not UTF-8.
    #[error("file is not valid UTF-8")]
    NotUtf8,
    /// The `@path` file could not be read.
    #[error("read file: {0}")]
    Io(String),
    /// Not valid standard base64.
    #[error("invalid base64: {0}")]
    InvalidBase64(String),
    /// Not valid JSON for the expected shape.
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
    /// Empty, or a `.`/`..` path segment.
    #[error("invalid identifier {0:?}")]
    InvalidIdentifier(String),
}

impl FlagError {
    /// Attaches the flag name.
    #[must_use]
    pub fn for_flag(self, flag: &str) -> CliError {
        CliError::flag_validation(flag, self.to_string())
    }
}

/// How a flag value is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKind {
    /// Free text.
    String,
    /// A resource identifier used as a URL path segment.
    Identifier,
    /// A 64-bit integer with optional inclusive bounds.
    Int64 {
        /// Lower bound.
        min: Option<i64>,
        /// Upper bound.
        max: Option<i64>,
    },
    /// A boolean accepting `--flag`, `--flag=true` and `--flag=false`.
    Bool,
    /// A canonical 8-4-4-4-12 UUID.
    Uuid,
    /// Comma separated CIDR blocks; may be repeated.
    CidrList,
    /// A literal value or `@path` to read it from a file.
    ReadFromFile,
    /// One of a fixed set, matched case-insensitively.
    Enum(&'static [&'static str]),
}

impl FlagKind {
    /// A non-negative integer.
    pub const NON_NEGATIVE: Self = Self::Int64 {
        min: Some(0),
        max: None,
    };

    fn value_name(self) -> &'static str {
        match self {
            Self::String | Self::Enum(_) => "STRING",
            Self::Identifier => "ID",
            Self::Int64 { .. } => "INT",
            Self::Bool => "BOOL",
            Self::Uuid => "UUID",
            Self::CidrList => "CIDR",
            Self::ReadFromFile => "VALUE|@PATH",
        }
    }
}

/// Declaration of one command flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagSpec {
    /// Long name without dashes.
    pub name: &'static str,
    /// Help text.
    pub help: &'static str,
    /// Value kind.
    pub kind: FlagKind,
    /// Short form.
    pub short: Option<char>,
    /// Hidden alternative long names.
    pub aliases: Vec<&'static str>,
    /// Must be present with a non-empty value.
    pub required: bool,
    /// Omitted from help.
    pub hidden: bool,
}

impl FlagSpec {
    /// Creates an optional flag.
    #[must_use]
    pub const fn new(name: &'static str, kind: FlagKind, help: &'static str) -> Self {
        Self {
            name,
            help,
            kind,
            short: None,
            aliases: Vec::new(),
            required: false,
            hidden: false,
        }
    }

    /// A free text flag.
    #[must_use]
    pub const fn string(name: &'static str, help: &'static str) -> Self {
        Self::new(name, FlagKind::String, help)
    }

    /// A resource identifier flag.
    #[must_use]
    pub const fn identifier(name: &'static str, help: &'static str) -> Self {
        Self::new(name, FlagKind::Identifier, help)
    }

    /// A UUID flag.
    #[must_use]
    pub const fn uuid(name: &'static str, help: &'static str) -> Self {
        Self::new(name, FlagKind::Uuid, help)
    }

    /// A boolean flag.
    #[must_use]
    pub const fn bool(name: &'static str, help: &'static str) -> Self {
        Self::new(name, FlagKind::Bool, help)
    }

    /// An enumerated flag.
    #[must_use]
    pub const fn enumeration(name: &'static str, values: &'static [&'static str], help: &'static str) -> Self {
        Self::new(name, FlagKind::Enum(values), help)
    }

    /// Marks the flag as required.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the short form.
    #[must_use]
    pub const fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    /// Adds a hidden alias.
    #[must_use]
    pub fn alias(mut self, alias: &'static str) -> Self {
        self.aliases.push(alias);
        self
    }

    /// Hides the flag from help.
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Converts the declaration into a clap argument.
    ///
    /// Values are kept as strings; `required` is enforced by
    /// [`FlagValues::enforce`] rather than clap.
    #[must_use]
    pub fn to_arg(&self) -> Arg {
        let help = match self.kind {
            FlagKind::Enum(values) => format!("{} (one of: {})", self.help, values.join(", ")),
            _ if self.required => format!("{} (required)", self.help),
            _ => self.help.to_owned(),
        };
        let mut arg = Arg::new(self.name)
            .long(self.name)
            .help(help)
            .hide(self.hidden)
            .value_name(self.kind.value_name());
        if let Some(short) = self.short {
            arg = arg.short(short);
        }
        if !self.aliases.is_empty() {
            arg = arg.aliases(self.aliases.iter().copied());
        }
        match self.kind {
            FlagKind::Bool => arg
                .action(ArgAction::Set)
                .num_args(0..=1)
                .require_equals(true)
                .default_missing_value("true"),
            FlagKind::CidrList => arg.action(ArgAction::Append),
            FlagKind::Int64 { .. } => arg.action(ArgAction::Set).allow_negative_numbers(true),
            _ => arg.action(ArgAction::Set),
        }
    }
}

/// A rule over a group of flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// At most one flag of the group may be set.
    MutuallyExclusive(Vec<&'static str>),
    /// At least one flag of the group must be set.
    OneRequired(Vec<&'static str>),
}

impl Constraint {
    /// Exactly one of the group: both rules at once.
    #[must_use]
    pub fn exactly_one(group: &[&'static str]) -> [Self; 2] {
        [
            Self::MutuallyExclusive(group.to_vec()),
            Self::OneRequired(group.to_vec()),
        ]
    }
}

/// How a positional argument is validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgValidator {
    /// A canonical UUID.
    Uuid,
    /// A non-empty value that is not `.` or `..`.
    Identifier,
    /// An integer ≥ 0.
    NonNegativeInt,
}

/// Declaration of a positional argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgSpec {
    /// Placeholder shown in usage, e.g. `KEY_ID`.
    pub name: &'static str,
    /// Validation rule.
    pub validator: ArgValidator,
}

impl ArgSpec {
    /// A UUID argument.
    #[must_use]
    pub const fn uuid(name: &'static str) -> Self {
        Self {
            name,
            validator: ArgValidator::Uuid,
        }
    }

    /// A non-empty identifier argument.
    #[must_use]
    pub const fn identifier(name: &'static str) -> Self {
        Self {
            name,
            validator: ArgValidator::Identifier,
        }
    }

    /// A non-negative integer argument.
    #[must_use]
    pub const fn non_negative_int(name: &'static str) -> Self {
        Self {
            name,
            validator: ArgValidator::NonNegativeInt,
        }
    }

    /// Converts the declaration into a required clap positional.
    #[must_use]
    pub fn to_arg(&self) -> Arg {
        Arg::new(self.name)
            .value_name(self.name)
            .required(true)
            .action(ArgAction::Set)
            .allow_negative_numbers(self.validator == ArgValidator::NonNegativeInt)
    }

    /// Validates a value.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::ArgValidation`] if the value does not match.
    pub fn validate(&self, value: &str) -> Result<()> {
        let cause = match self.validator {
            ArgValidator::Uuid => parse_uuid(value).err().map(|_| "must be a valid UUID"),
            ArgValidator::Identifier => parse_identifier(value)
                .err()
                .map(|_| "must be a non-empty identifier other than \".\" or \"..\""),
            ArgValidator::NonNegativeInt => value
                .parse::<u64>()
                .is_err()
                .then_some("must be a non-negative integer"),
        };
        match cause {
            Some(cause) => Err(CliError::arg_validation(value, cause)),
            None => Ok(()),
        }
    }
}

/// Checks that a value is a canonical hyphenated UUID.
///
/// # Errors
///
/// Returns [`FlagError::InvalidUuid`] for anything else, including the
/// braced, URN and simple forms.
pub fn parse_uuid(value: &str) -> std::result::Result<(), FlagError> {
    if value.len() == 36 && uuid::Uuid::try_parse(value).is_ok() {
        Ok(())
    } else {
        Err(FlagError::InvalidUuid(value.to_owned()))
    }
}

/// Checks that a value can stand alone as a URL path segment.
///
/// URL parsers collapse `.` and `..` segments, so such a value would address
/// the parent resource instead of the named one.
///
/// # Errors
///
/// Returns [`FlagError::InvalidIdentifier`] for blank values and dot segments.
pub fn parse_identifier(value: &str) -> std::result::Result<(), FlagError> {
    match value.trim() {
        "" | "." | ".." => Err(FlagError::InvalidIdentifier(value.to_owned())),
        _ => Ok(()),
    }
}

/// Resolves a read-from-file value.
///
/// `@path` is replaced by the file's contents; anything else is returned
/// verbatim.
///
/// # Errors
///
/// Returns a [`FlagError`] if the file is missing, too large, unreadable or
/// not UTF-8.
pub fn read_file_value(value: &str) -> std::result::Result<String, FlagError> {
    let Some(path) = value.strip_prefix('@') else {
        return Ok(value.to_owned());
    };
    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => FlagError::FileNotFound,
        _ => FlagError::Io(e.to_string()),
    })?;
    let mut bytes = Vec::new();
    file.take(MAX_FILE_SIZE + 1)
        .read_to_end(&mut bytes)
        .map_err(|e| FlagError::Io(e.to_string()))?;
    if bytes.len() as u64 > MAX_FILE_SIZE {
        return Err(FlagError::FileTooLarge);
    }
    String::from_utf8(bytes).map_err(|_| FlagError::NotUtf8)
}

fn parse_cidr_list<'a>(values: impl Iterator<Item = &'a str>) -> std::result::Result<Vec<String>, FlagError> {
    let mut out = Vec::new();
    for value in values {
        for element in value.split(',') {
            let element = element.trim();
            if element.is_empty() {
                return Err(FlagError::EmptyCidr);
            }
            element
                .parse::<ipnet::IpNet>()
                .map_err(|e| FlagError::InvalidCidr {
                    value: element.to_owned(),
                    reason: e.to_string(),
                })?;
            out.push(element.to_owned());
        }
    }
    Ok(out)
}

fn parse_bool(value: &str) -> std::result::Result<bool, FlagError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(FlagError::InvalidBool(value.to_owned())),
    }
}

fn parse_enum(value: &str, allowed: &'static [&'static str]) -> std::result::Result<&'static str, FlagError> {
    allowed
        .iter()
        .copied()
        .find(|candidate| candidate.eq_ignore_ascii_case(value.trim()))
        .ok_or_else(|| FlagError::NotInEnum {
            value: value.to_owned(),
            allowed,
        })
}

/// Parsed flag values of one leaf, with typed accessors.
#[derive(Debug, Clone)]
pub struct FlagValues {
    matches: ArgMatches,
    specs: Vec<FlagSpec>,
}

impl FlagValues {
    /// Wraps clap matches for the given declarations.
    #[must_use]
    pub const fn new(matches: ArgMatches, specs: Vec<FlagSpec>) -> Self {
        Self { matches, specs }
    }

    /// Parses `args` against the declarations alone.
    ///
    /// # Errors
    ///
    /// Returns clap's error for unknown flags or missing values.
    pub fn from_args(specs: Vec<FlagSpec>, args: &[&str]) -> std::result::Result<Self, clap::Error> {
        let command = clap::Command::new("flags")
            .no_binary_name(true)
            .args(specs.iter().map(FlagSpec::to_arg));
        let matches = command.try_get_matches_from(args)?;
        Ok(Self::new(matches, specs))
    }

    /// The underlying clap matches.
    #[must_use]
    pub const fn matches(&self) -> &ArgMatches {
        &self.matches
    }

    fn spec(&self, name: &str) -> Result<&FlagSpec> {
        self.specs
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| CliError::internal("flag lookup", format!("--{name} is not declared")))
    }

    fn raw(&self, name: &str) -> Result<Option<&str>> {
        self.spec(name)?;
        self.matches
            .try_get_one::<String>(name)
            .map(|v| v.map(String::as_str))
            .map_err(|e| CliError::internal(&format!("flag --{name}"), e))
    }

    fn raw_many(&self, name: &str) -> Result<Vec<&str>> {
        self.spec(name)?;
        self.matches
            .try_get_many::<String>(name)
            .map(|v| v.map(|values| values.map(String::as_str).collect()).unwrap_or_default())
            .map_err(|e| CliError::internal(&format!("flag --{name}"), e))
    }

    /// True if the flag was given a non-empty value.
    #[must_use]
    pub fn is_set(&self, name: &str) -> bool {
        self.raw_many(name)
            .is_ok_and(|values| values.iter().any(|v| !v.trim().is_empty()))
    }

    /// Enforces required flags and group constraints.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::FlagConstraint`] naming the offending flags.
    pub fn enforce(&self, constraints: &[Constraint]) -> Result<()> {
        let missing: Vec<&str> = self
            .specs
            .iter()
            .filter(|s| s.required && !self.is_set(s.name))
            .map(|s| s.name)
            .collect();
        if !missing.is_empty() {
            return Err(constraint_error(
                &missing,
                format!("required flag(s) {} not set", quoted(&missing)),
            ));
        }

        for constraint in constraints {
            match constraint {
                Constraint::MutuallyExclusive(group) => {
                    let set: Vec<&str> = group.iter().copied().filter(|f| self.is_set(f)).collect();
                    if set.len() > 1 {
                        return Err(constraint_error(
                            &set,
                            format!(
                                "if any flags in the group [{}] are set none of the others can be; [{}] were all set",
                                group.join(" "),
                                set.join(" ")
                            ),
                        ));
                    }
                }
                Constraint::OneRequired(group) => {
                    if !group.iter().any(|f| self.is_set(f)) {
                        return Err(constraint_error(
                            group,
                            format!(
                                "at least one of the flags in the group [{}] is required",
                                group.join(" ")
                            ),
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Free text value. Empty counts as unset.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Internal`] for undeclared flags.
    pub fn string(&self, name: &str) -> Result<Option<String>> {
        Ok(self
            .raw(name)?
            .filter(|v| !v.trim().is_empty())
            .map(str::to_owned))
    }

    /// Free text value that must be present.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::FlagConstraint`] if the flag is unset.
    pub fn required_string(&self, name: &str) -> Result<String> {
        self.string(name)?.ok_or_else(|| missing(name))
    }

    /// Identifier value.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::FlagValidation`] for `.` and `..`.
    pub fn identifier(&self, name: &str) -> Result<Option<String>> {
        let Some(raw) = self.string(name)? else {
            return Ok(None);
        };
        parse_identifier(&raw).map_err(|e| e.for_flag(name))?;
        Ok(Some(raw))
    }

    /// Identifier value that must be present.
    ///
    /// # Errors
    ///
    /// See [`FlagValues::identifier`]; unset is [`CliError::FlagConstraint`].
    pub fn required_identifier(&self, name: &str) -> Result<String> {
        self.identifier(name)?.ok_or_else(|| missing(name))
    }

    /// Integer value, bounds checked.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::FlagValidation`] for non-integers and out-of-range values.
    pub fn int64(&self, name: &str) -> Result<Option<i64>> {
        let spec = self.spec(name)?;
        let Some(raw) = self.raw(name)?.filter(|v| !v.trim().is_empty()) else {
            return Ok(None);
        };
        let value: i64 = raw
            .trim()
            .parse()
            .map_err(|_| FlagError::InvalidInteger(raw.to_owned()).for_flag(name))?;
        if let FlagKind::Int64 { min, max } = spec.kind {
            if let Some(min) = min.filter(|min| value < *min) {
                return Err(FlagError::BelowMinimum(min).for_flag(name));
            }
            if let Some(max) = max.filter(|max| value > *max) {
                return Err(FlagError::AboveMaximum(max).for_flag(name));
            }
        }
        Ok(Some(value))
    }

    /// Integer value that must be present.
    ///
    /// # Errors
    ///
    /// See [`FlagValues::int64`]; unset is [`CliError::FlagConstraint`].
    pub fn required_int64(&self, name: &str) -> Result<i64> {
        self.int64(name)?.ok_or_else(|| missing(name))
    }

    /// Boolean value, false when unset.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::FlagValidation`] for values other than true/false.
    pub fn bool(&self, name: &str) -> Result<bool> {
        Ok(self.optional_bool(name)?.unwrap_or(false))
    }

    /// Boolean value distinguishing unset from false.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::FlagValidation`] for values other than true/false.
    pub fn optional_bool(&self, name: &str) -> Result<Option<bool>> {
        self.raw(name)?
            .map(|raw| parse_bool(raw).map_err(|e| e.for_flag(name)))
            .transpose()
    }

    /// UUID value.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::FlagValidation`] if the value is not a canonical UUID.
    pub fn uuid(&self, name: &str) -> Result<Option<String>> {
        let Some(raw) = self.string(name)? else {
            return Ok(None);
        };
        parse_uuid(&raw).map_err(|e| e.for_flag(name))?;
        Ok(Some(raw))
    }

    /// UUID value that must be present.
    ///
    /// # Errors
    ///
    /// See [`FlagValues::uuid`]; unset is [`CliError::FlagConstraint`].
    pub fn required_uuid(&self, name: &str) -> Result<String> {
        self.uuid(name)?.ok_or_else(|| missing(name))
    }

    /// CIDR list, flattened across repetitions.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::FlagValidation`] for empty or unparsable elements.
    pub fn cidr_list(&self, name: &str) -> Result<Option<Vec<String>>> {
        let values = self.raw_many(name)?;
        if values.is_empty() {
            return Ok(None);
        }
        parse_cidr_list(values.into_iter())
            .map(Some)
            .map_err(|e| e.for_flag(name))
    }

    /// Enumerated value in its canonical spelling.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::FlagValidation`] if the value is not allowed.
    pub fn enumeration(&self, name: &str) -> Result<Option<&'static str>> {
        let spec = self.spec(name)?;
        let FlagKind::Enum(allowed) = spec.kind else {
            return Err(CliError::internal("flag lookup", format!("--{name} is not an enum flag")));
        };
        self.string(name)?
            .map(|raw| parse_enum(&raw, allowed).map_err(|e| e.for_flag(name)))
            .transpose()
    }

    /// Enumerated value that must be present.
    ///
    /// # Errors
    ///
    /// See [`FlagValues::enumeration`]; unset is [`CliError::FlagConstraint`].
    pub fn required_enumeration(&self, name: &str) -> Result<&'static str> {
        self.enumeration(name)?.ok_or_else(|| missing(name))
    }

    /// Literal value or the contents of `@path`.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::FlagValidation`] if the file cannot be used.
    pub fn read_from_file(&self, name: &str) -> Result<Option<String>> {
        self.string(name)?
            .map(|raw| read_file_value(&raw).map_err(|e| e.for_flag(name)))
            .transpose()
    }
}

fn quoted(names: &[&str]) -> String {
    names
        .iter()
        .map(|n| format!("\"{n}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

fn constraint_error(flags: &[&str], message: String) -> CliError {
    CliError::FlagConstraint {
        flags: flags.iter().map(|f| (*f).to_owned()).collect(),
        message,
    }
}

fn missing(name: &str) -> CliError {
    constraint_error(&[name], format!("required flag(s) \"{name}\" not set"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use proptest::prelude::*;
    use std::io::Write;
    use test_case::test_case;

    const COLORS: &[&str] = &["red", "Green"];

    fn specs() -> Vec<FlagSpec> {
        vec![
            FlagSpec::string("name", "Name").short('n'),
            FlagSpec::uuid("key-ring", "Key ring").alias("keyring-id"),
            FlagSpec::new("size", FlagKind::NON_NEGATIVE, "Size"),
            FlagSpec::new("port", FlagKind::Int64 { min: Some(1), max: Some(65535) }, "Port"),
            FlagSpec::bool("visible", "Visible"),
            FlagSpec::new("ip-acl", FlagKind::CidrList, "ACL"),
            FlagSpec::new("payload", FlagKind::ReadFromFile, "Payload"),
            FlagSpec::enumeration("color", COLORS, "Color"),
            FlagSpec::identifier("pool", "Pool"),
        ]
    }

    fn parse(args: &[&str]) -> FlagValues {
        FlagValues::from_args(specs(), args).expect("clap parse")
    }

    #[test]
    fn unset_flags_are_none() {
        let v = parse(&[]);
        assert_eq!(v.string("name").expect("ok"), None);
        assert_eq!(v.int64("size").expect("ok"), None);
        assert_eq!(v.optional_bool("visible").expect("ok"), None);
        assert!(!v.bool("visible").expect("ok"));
        assert_eq!(v.cidr_list("ip-acl").expect("ok"), None);
        assert!(!v.is_set("name"));
    }

    #[test]
    fn short_forms_and_aliases_resolve() {
        let v = parse(&["-n", "my-key", "--keyring-id", "11111111-1111-1111-1111-111111111111"]);
        assert_eq!(v.string("name").expect("ok").as_deref(), Some("my-key"));
        assert_eq!(
            v.uuid("key-ring").expect("ok").as_deref(),
            Some("11111111-1111-1111-1111-111111111111")
        );
    }

    #[test_case(&["--visible"], Some(true); "bare flag")]
    #[test_case(&["--visible=true"], Some(true); "explicit true")]
    #[test_case(&["--visible=false"], Some(false); "explicit false")]
    #[test_case(&[], None; "unset")]
    fn optional_bool_forms(args: &[&str], expected: Option<bool>) {
        assert_eq!(parse(args).optional_bool("visible").expect("ok"), expected);
    }

    #[test_case("key-ring", &["--key-ring", "not-a-uuid"]; "bad uuid")]
    #[test_case("key-ring", &["--key-ring", "{11111111-1111-1111-1111-111111111111}"]; "braced uuid")]
    #[test_case("key-ring", &["--key-ring", "11111111111111111111111111111111"]; "simple uuid")]
    fn non_canonical_uuids_are_rejected(flag: &str, args: &[&str]) {
        let err = parse(args).uuid(flag).expect_err("invalid");
        assert_eq!(err.kind(), ErrorKind::FlagValidation);
        assert!(err.to_string().starts_with("the provided flag --key-ring is invalid"));
    }

    #[test_case(&["--size", "-1"], "must be at least 0"; "below minimum")]
    #[test_case(&["--size", "ten"], "invalid integer"; "not a number")]
    fn integer_validation(args: &[&str], cause: &str) {
        let err = parse(args).int64("size").expect_err("invalid");
        assert!(err.to_string().contains(cause), "{err}");
    }

    #[test_case(&["--pool", ".."]; "parent")]
    #[test_case(&["--pool", "."]; "current")]
    fn dot_segments_are_not_identifiers(args: &[&str]) {
        let err = parse(args).identifier("pool").expect_err("invalid");
        assert_eq!(err.kind(), ErrorKind::FlagValidation);
        assert!(err.to_string().starts_with("the provided flag --pool is invalid"), "{err}");
    }

    #[test]
    fn identifiers_may_contain_dots() {
        let v = parse(&["--pool", "pool.v2"]);
        assert_eq!(v.required_identifier("pool").expect("ok"), "pool.v2");
    }

    #[test]
    fn integer_upper_bound() {
        let err = parse(&["--port", "70000"]).int64("port").expect_err("invalid");
        assert_eq!(err.to_string(), "the provided flag --port is invalid: must be at most 65535");
        assert_eq!(parse(&["--port", "443"]).int64("port").expect("ok"), Some(443));
    }

    #[test]
    fn cidr_list_accepts_repetition_and_host_bits() {
        let v = parse(&["--ip-acl", "10.0.0.1/24,192.168.0.0/16", "--ip-acl", "2001:db8::/32"]);
        assert_eq!(
            v.cidr_list("ip-acl").expect("ok"),
            Some(vec![
                "10.0.0.1/24".to_owned(),
                "192.168.0.0/16".to_owned(),
                "2001:db8::/32".to_owned()
            ])
        );
    }

    #[test_case("10.0.0.0/8,"; "trailing comma")]
    #[test_case(",10.0.0.0/8"; "leading comma")]
    #[test_case("10.0.0.0/33"; "prefix too long")]
    #[test_case("10.0.0.0"; "missing prefix")]
    fn cidr_list_rejects(value: &str) {
        let err = parse(&["--ip-acl", value]).cidr_list("ip-acl").expect_err("invalid");
        assert_eq!(err.kind(), ErrorKind::FlagValidation);
    }

    #[test]
    fn enum_matching_is_case_insensitive_and_canonical() {
        assert_eq!(parse(&["--color", "RED"]).enumeration("color").expect("ok"), Some("red"));
        assert_eq!(parse(&["--color", "green"]).enumeration("color").expect("ok"), Some("Green"));
        let err = parse(&["--color", "blue"]).enumeration("color").expect_err("invalid");
        assert!(err.to_string().contains("expected one of: red, Green"));
    }

    #[test]
    fn read_from_file_reads_at_path() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(b"{\"jobName\":\"x\"}").expect("write");
        let arg = format!("@{}", file.path().display());
        let v = FlagValues::from_args(specs(), &["--payload", &arg]).expect("parse");
        assert_eq!(
            v.read_from_file("payload").expect("ok").as_deref(),
            Some("{\"jobName\":\"x\"}")
        );
    }

    #[test]
    fn read_from_file_passes_literals_through() {
        let v = parse(&["--payload", "{}"]);
        assert_eq!(v.read_from_file("payload").expect("ok").as_deref(), Some("{}"));
    }

    #[test]
    fn read_from_file_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let arg = format!("@{}", dir.path().join("nope.json").display());
        let v = FlagValues::from_args(specs(), &["--payload", &arg]).expect("parse");
        let err = v.read_from_file("payload").expect_err("missing");
        assert_eq!(err.kind(), ErrorKind::FlagValidation);
        assert_eq!(err.to_string(), "the provided flag --payload is invalid: file not found");
    }

    #[test]
    fn read_from_file_rejects_oversized_and_binary_files() {
        let mut big = tempfile::NamedTempFile::new().expect("tempfile");
        big.as_file().set_len(MAX_FILE_SIZE + 1).expect("grow");
        big.flush().expect("flush");
        assert_eq!(
            read_file_value(&format!("@{}", big.path().display())),
            Err(FlagError::FileTooLarge)
        );

        let mut binary = tempfile::NamedTempFile::new().expect("tempfile");
        binary.write_all(&[0xff, 0xfe, 0x00]).expect("write");
        assert_eq!(
            read_file_value(&format!("@{}", binary.path().display())),
            Err(FlagError::NotUtf8)
        );
    }

    #[test]
    fn required_flags_are_enforced_before_parsing() {
        let specs = vec![
            FlagSpec::string("name", "Name").required(),
            FlagSpec::uuid("key-ring", "Key ring").required(),
        ];
        let v = FlagValues::from_args(specs.clone(), &["--name", "  "]).expect("parse");
        let err = v.enforce(&[]).expect_err("missing");
        assert_eq!(err.kind(), ErrorKind::FlagConstraint);
        assert_eq!(err.to_string(), "required flag(s) \"name\", \"key-ring\" not set");

        let v = FlagValues::from_args(specs, &["--name", "x", "--key-ring", "bogus"]).expect("parse");
        assert!(v.enforce(&[]).is_ok());
    }

    #[test]
    fn exactly_one_of_a_group() {
        let specs = vec![
            FlagSpec::string("plan-id", "Plan"),
            FlagSpec::string("plan-name", "Plan name"),
        ];
        let rules = Constraint::exactly_one(&["plan-id", "plan-name"]);

        let both = FlagValues::from_args(specs.clone(), &["--plan-id", "a", "--plan-name", "b"]).expect("parse");
        let err = both.enforce(&rules).expect_err("exclusive");
        assert!(err.to_string().contains("[plan-id plan-name] were all set"));

        let none = FlagValues::from_args(specs.clone(), &[]).expect("parse");
        let err = none.enforce(&rules).expect_err("one required");
        assert_eq!(
            err.to_string(),
            "at least one of the flags in the group [plan-id plan-name] is required"
        );

        let one = FlagValues::from_args(specs, &["--plan-name", "b"]).expect("parse");
        assert!(one.enforce(&rules).is_ok());
    }

    #[test_case("11111111-1111-1111-1111-111111111111", ArgSpec::uuid("ID"), true; "uuid ok")]
    #[test_case("xyz", ArgSpec::uuid("ID"), false; "uuid bad")]
    #[test_case("xxx", ArgSpec::identifier("ID"), true; "identifier ok")]
    #[test_case(" ", ArgSpec::identifier("ID"), false; "identifier blank")]
    #[test_case("..", ArgSpec::identifier("ID"), false; "identifier parent segment")]
    #[test_case(".", ArgSpec::identifier("ID"), false; "identifier current segment")]
    #[test_case("0", ArgSpec::non_negative_int("VERSION"), true; "zero ok")]
    #[test_case("-1", ArgSpec::non_negative_int("VERSION"), false; "negative")]
    fn positional_validation(value: &str, spec: ArgSpec, ok: bool) {
        let result = spec.validate(value);
        assert_eq!(result.is_ok(), ok);
        if let Err(err) = result {
            assert_eq!(err.kind(), ErrorKind::ArgValidation);
            assert!(err.to_string().starts_with(&format!("the provided argument \"{value}\"")));
        }
    }

    #[test]
    fn undeclared_flag_is_internal() {
        let err = parse(&[]).string("nope").expect_err("undeclared");
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    proptest! {
        #[test]
        fn valid_ipv4_lists_parse(blocks in proptest::collection::vec((any::<[u8; 4]>(), 0u8..=32), 1..6)) {
            let list = blocks
                .iter()
                .map(|(o, p)| format!("{}.{}.{}.{}/{p}", o[0], o[1], o[2], o[3]))
                .collect::<Vec<_>>()
                .join(",");
            let parsed = parse_cidr_list(std::iter::once(list.as_str())).expect("valid");
            prop_assert_eq!(parsed.len(), blocks.len());
        }

        #[test]
        fn trailing_comma_is_always_rejected(blocks in proptest::collection::vec((any::<[u8; 4]>(), 0u8..=32), 0..4)) {
            let mut list = blocks
                .iter()
                .map(|(o, p)| format!("{}.{}.{}.{}/{p},", o[0], o[1], o[2], o[3]))
                .collect::<String>();
            if list.is_empty() {
                list.push(',');
            }
            prop_assert_eq!(parse_cidr_list(std::iter::once(list.as_str())), Err(FlagError::EmptyCidr));
        }
    }
}
