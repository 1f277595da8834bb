//! CLI-specific error types and exit codes.

use narrator_core::{PageSourceError, SettingsError};
use narrator_voice::SpeechError;
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Argument parsing error.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// IO error (file not found, permission denied, etc.).
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Synthesis or audio output failure.
    #[error("Speech error: {0}")]
    Speech(String),

    /// The binary was built without a feature the command needs.
    #[error("{0}")]
    Unsupported(String),
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow Unix conventions:
    /// - 1: General error
    /// - 2: Misuse of shell command (invalid arguments)
    /// - 64-78: Reserved for specific error categories (see sysexits.h)
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Arguments(_) => 2,    // EX_USAGE
            Self::Io(_) => 74,          // EX_IOERR
            Self::Config(_) => 78,      // EX_CONFIG
            Self::Speech(_) => 1,
            Self::Unsupported(_) => 69, // EX_UNAVAILABLE
        }
    }
}

impl From<SettingsError> for CliError {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::Read { .. } => Self::Io(err.to_string()),
            _ => Self::Config(err.to_string()),
        }
    }
}

impl From<PageSourceError> for CliError {
    fn from(err: PageSourceError) -> Self {
        match err {
            PageSourceError::PageOutOfRange { .. } => Self::Arguments(err.to_string()),
            _ => Self::Io(err.to_string()),
        }
    }
}

impl From<SpeechError> for CliError {
    fn from(err: SpeechError) -> Self {
        match err {
            SpeechError::Settings(inner) => inner.into(),
            SpeechError::Page(inner) => inner.into(),
            SpeechError::ModelNotFound(_) => Self::Config(err.to_string()),
            SpeechError::Io(_) => Self::Io(err.to_string()),
            _ => Self::Speech(err.to_string()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
