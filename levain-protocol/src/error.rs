//! Wire error type

use core::fmt;

use levain_core::catalog::ValidationError;
use levain_core::config::ConfigError;
use levain_core::ControlError;

/// Errors surfaced to a client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WireError {
    /// Malformed JSON, or JSON of the wrong shape
    Json { line: usize, column: usize },
    /// Malformed TOML
    Toml,
    /// Well-formed catalog that failed validation
    Validation(ValidationError),
    /// Command rejected by the controller
    Control(ControlError),
    /// Configuration rejected
    Config(ConfigError),
    /// `select` named neither an index nor a program name
    MissingTarget,
    /// Response could not be serialized
    Encode,
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireError::Json { line, column } => {
                write!(f, "invalid JSON at line {line}, column {column}")
            }
            WireError::Toml => f.write_str("invalid TOML"),
            WireError::Validation(e) => write!(f, "catalog rejected: {e}"),
            WireError::Control(e) => fmt::Display::fmt(e, f),
            WireError::Config(e) => write!(f, "configuration rejected: {e}"),
            WireError::MissingTarget => f.write_str("select needs an idx or a name"),
            WireError::Encode => f.write_str("failed to encode response"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for WireError {}

impl From<serde_json::Error> for WireError {
    fn from(e: serde_json::Error) -> Self {
        WireError::Json {
            line: e.line(),
            column: e.column(),
        }
    }
}

impl From<toml::de::Error> for WireError {
    fn from(_: toml::de::Error) -> Self {
        WireError::Toml
    }
}

impl From<ValidationError> for WireError {
    fn from(e: ValidationError) -> Self {
        WireError::Validation(e)
    }
}

impl From<ControlError> for WireError {
    fn from(e: ControlError) -> Self {
        WireError::Control(e)
    }
}

impl From<ConfigError> for WireError {
    fn from(e: ConfigError) -> Self {
        WireError::Config(e)
    }
}
