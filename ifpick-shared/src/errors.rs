use thiserror::Error;

/// Errors that abort a busiest-interface detection run
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectError {
    #[error("No network interfaces found")]
    NoInterfacesFound,

    #[error("Failed to enumerate network interfaces: {message}")]
    EnumerationFailed { message: String },

    #[error("Interface sampling was cancelled")]
    Cancelled,
}

/// Per-interface counter read failures.
///
/// These never abort detection; the detector records a zero reading instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CounterReadError {
    #[error("Byte counters unavailable for {interface}: {reason}")]
    Unavailable { interface: String, reason: String },
}

impl CounterReadError {
    /// Create an Unavailable error from any displayable cause
    pub fn unavailable(interface: &str, reason: impl std::fmt::Display) -> Self {
        CounterReadError::Unavailable {
            interface: interface.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Configuration errors raised while assembling CLI and file settings
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid sampling window '{input}': {reason}")]
    InvalidWindow { input: String, reason: String },

    #[error("Unknown stats source '{name}': expected 'sysfs', 'proc' or 'ip-link'")]
    UnknownSource { name: String },

    #[error("Invalid log level '{level}': expected error, warn, info, debug or trace")]
    InvalidLogLevel { level: String },

    #[error("Invalid exclude pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Failed to read config file {path}: {reason}")]
    FileRead { path: String, reason: String },

    #[error("Failed to parse config file {path}: {reason}")]
    FileParse { path: String, reason: String },
}

/// Result type aliases for convenience
pub type DetectResult<T> = Result<T, DetectError>;
pub type CounterResult<T> = Result<T, CounterReadError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
