//! Error types for the CLI.
//!
//! Every pipeline stage fails with a [`CliError`]. The variant decides the
//! user-visible message; raising sites only supply the data.

use std::fmt;

use stackit_sdk::SdkError;
use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// Exit code for a prompt interrupted by a signal.
pub const EXIT_INTERRUPTED: u8 = 130;
/// Exit code for usage errors reported by the argument parser.
pub const EXIT_USAGE: u8 = 2;
/// Exit code for every other typed error.
pub const EXIT_FAILURE: u8 = 1;

/// Stable classification of a [`CliError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The project ID could not be resolved.
    ProjectIdMissing,
    /// A required, mutually exclusive or one-required rule was violated.
    FlagConstraint,
    /// A flag value failed to parse or was out of range.
    FlagValidation,
    /// A positional argument failed to parse.
    ArgValidation,
    /// The user declined the confirmation prompt.
    ConfirmationDeclined,
    /// An update command had nothing to update.
    EmptyUpdate,
    /// The requested plan does not exist.
    InvalidPlan,
    /// The API call failed.
    Remote,
    /// The waiter gave up before a terminal state.
    WaitTimeout,
    /// A bug.
    Internal,
    /// No credentials were available for an API call.
    Auth,
    /// The profile file is unreadable or malformed.
    Config,
    /// The command line could not be parsed.
    Usage,
}

impl ErrorKind {
    /// Returns the stable identifier of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProjectIdMissing => "PROJECT_ID_MISSING",
            Self::FlagConstraint => "FLAG_CONSTRAINT",
            Self::FlagValidation => "FLAG_VALIDATION",
            Self::ArgValidation => "ARG_VALIDATION",
            Self::ConfirmationDeclined => "CONFIRMATION_DECLINED",
            Self::EmptyUpdate => "EMPTY_UPDATE",
            Self::InvalidPlan => "INVALID_PLAN",
            Self::Remote => "REMOTE",
            Self::WaitTimeout => "WAIT_TIMEOUT",
            Self::Internal => "INTERNAL",
            Self::Auth => "AUTH",
            Self::Config => "CONFIG",
            Self::Usage => "USAGE",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced to the user.
#[derive(Debug, Error)]
pub enum CliError {
    /// The project ID could not be resolved from flag, environment or profile.
    #[error("Project ID is required. Set via --project-id, STACKIT_PROJECT_ID, or the active profile.")]
    ProjectIdMissing,

    /// A flag constraint was violated.
    #[error("{message}")]
    FlagConstraint {
        /// Offending flags, without the leading dashes.
        flags: Vec<String>,
        /// Rendered message.
        message: String,
    },

    /// A flag value is invalid.
    #[error("the provided flag --{flag} is invalid: {details}")]
    FlagValidation {
        /// Flag name.
        flag: String,
        /// One-line cause.
        details: String,
    },

    /// A positional argument is invalid.
    #[error("the provided argument \"{arg}\" is invalid: {details}")]
    ArgValidation {
        /// Argument value.
        arg: String,
        /// One-line cause.
        details: String,
    },

    /// The confirmation prompt was answered negatively, hit EOF, or was interrupted.
    #[error("Operation cancelled.")]
    ConfirmationDeclined {
        /// True when a signal interrupted the prompt.
        interrupted: bool,
    },

    /// An update command carried no field to update.
    #[error("Provide at least one field to update.")]
    EmptyUpdate,

    /// The requested plan is unknown.
    #[error("{details}")]
    InvalidPlan {
        /// Rendered message, including the available plans.
        details: String,
    },

    /// An API call failed.
    #[error("{operation}: {source}")]
    Remote {
        /// Operation verb, e.g. `create KMS key`.
        operation: String,
        /// SDK error.
        #[source]
        source: SdkError,
    },

    /// An asynchronous operation reached a failed terminal state.
    #[error("{operation}: {reason}")]
    OperationFailed {
        /// Operation verb, e.g. `wait for SFS share creation`.
        operation: String,
        /// Reason reported by the service.
        reason: String,
    },

    /// The waiter gave up before the resource reached a terminal state.
    #[error("{} waiting for {resource}; last observed state: {last_state:?}", wait_cause(*.cancelled))]
    WaitTimeout {
        /// Resource identifier.
        resource: String,
        /// Last observed state label.
        last_state: String,
        /// True when the wait was cancelled rather than timed out.
        cancelled: bool,
    },

    /// No credentials were configured for an API call.
    #[error("You are not authenticated. Set STACKIT_SERVICE_ACCOUNT_TOKEN or STACKIT_ACCESS_TOKEN.")]
    AuthMissing,

    /// The profile file could not be used.
    #[error("configuration file {path}: {message}")]
    Config {
        /// Path of the file.
        path: String,
        /// Cause.
        message: String,
    },

    /// The argument parser rejected the command line.
    #[error("{0}")]
    Usage(String),

    /// A bug.
    #[error("internal error: {message}")]
    Internal {
        /// Cause.
        message: String,
    },

    /// A failure after a successful dispatch.
    #[error("{inner}\nNote: the operation may have already taken effect.")]
    AfterDispatch {
        /// The underlying error.
        inner: Box<CliError>,
    },
}

const fn wait_cause(cancelled: bool) -> &'static str {
    if cancelled { "cancelled" } else { "timed out" }
}

impl CliError {
    /// Creates a [`CliError::FlagValidation`].
    #[must_use]
    pub fn flag_validation(flag: &str, details: impl Into<String>) -> Self {
        Self::FlagValidation {
            flag: flag.to_owned(),
            details: details.into(),
        }
    }

    /// Creates a [`CliError::ArgValidation`].
    #[must_use]
    pub fn arg_validation(arg: &str, details: impl Into<String>) -> Self {
        Self::ArgValidation {
            arg: arg.to_owned(),
            details: details.into(),
        }
    }

    /// Creates a [`CliError::Internal`] from a context and a cause.
    #[must_use]
    pub fn internal(context: &str, cause: impl fmt::Display) -> Self {
        Self::Internal {
            message: format!("{context}: {cause}"),
        }
    }

    /// Wraps an SDK error with the operation verb.
    ///
    /// Missing credentials surface as [`CliError::AuthMissing`] regardless of
    /// the operation.
    #[must_use]
    pub fn remote(operation: &str, source: SdkError) -> Self {
        match source {
            SdkError::Unauthenticated => Self::AuthMissing,
            source => Self::Remote {
                operation: operation.to_owned(),
                source,
            },
        }
    }

    /// Marks the error as having happened after the backend accepted the request.
    #[must_use]
    pub fn after_dispatch(self) -> Self {
        match self {
            already @ Self::AfterDispatch { .. } => already,
            inner => Self::AfterDispatch {
                inner: Box::new(inner),
            },
        }
    }

    /// Returns the kind of the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ProjectIdMissing => ErrorKind::ProjectIdMissing,
            Self::FlagConstraint { .. } => ErrorKind::FlagConstraint,
            Self::FlagValidation { .. } => ErrorKind::FlagValidation,
            Self::ArgValidation { .. } => ErrorKind::ArgValidation,
            Self::ConfirmationDeclined { .. } => ErrorKind::ConfirmationDeclined,
            Self::EmptyUpdate => ErrorKind::EmptyUpdate,
            Self::InvalidPlan { .. } => ErrorKind::InvalidPlan,
            Self::Remote { .. } | Self::OperationFailed { .. } => ErrorKind::Remote,
            Self::WaitTimeout { .. } => ErrorKind::WaitTimeout,
            Self::AuthMissing => ErrorKind::Auth,
            Self::Config { .. } => ErrorKind::Config,
            Self::Usage(_) => ErrorKind::Usage,
            Self::Internal { .. } => ErrorKind::Internal,
            Self::AfterDispatch { inner } => inner.kind(),
        }
    }

    /// Returns the process exit code for the error.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Usage(_) => EXIT_USAGE,
            Self::ConfirmationDeclined { interrupted: true } => EXIT_INTERRUPTED,
            Self::AfterDispatch { inner } => inner.exit_code(),
            _ => EXIT_FAILURE,
        }
    }

    /// Returns true if the backend may have applied the operation.
    #[must_use]
    pub const fn is_after_dispatch(&self) -> bool {
        matches!(self, Self::AfterDispatch { .. })
    }
}

/// Attaches an operation verb to SDK results.
pub trait RemoteExt<T> {
    /// Converts an SDK error into [`CliError::Remote`].
    fn remote(self, operation: &str) -> Result<T>;
}

impl<T> RemoteExt<T> for std::result::Result<T, SdkError> {
    fn remote(self, operation: &str) -> Result<T> {
        self.map_err(|e| CliError::remote(operation, e))
    }
}
