use crate::components::interactions::codec::DecodeError;
use crate::components::interactions::completion::CompletionError;
use crate::utils::timezone::TimezoneError;
use miette::{Diagnostic, Result};
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Discord API error: {0}")]
    #[diagnostic(code(ics_notifier::discord_api))]
    DiscordApi(#[from] serenity::Error),

    #[error("Environment error: {0}")]
    #[diagnostic(code(ics_notifier::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(ics_notifier::config))]
    Config(String),

    #[error("Calendar feed error: {0}")]
    #[diagnostic(code(ics_notifier::feed))]
    Feed(String),

    #[error("Invalid timezone: {name}")]
    #[diagnostic(
        code(ics_notifier::invalid_zone),
        help("Use an IANA zone name such as 'Europe/Helsinki'")
    )]
    InvalidZone { name: String },

    #[error("Callback payload error: {0}")]
    #[diagnostic(code(ics_notifier::decode))]
    Decode(#[from] DecodeError),

    #[error("Completion request failed with HTTP {status}")]
    #[diagnostic(code(ics_notifier::http))]
    Http { status: u16 },

    #[error("Transport error: {0}")]
    #[diagnostic(code(ics_notifier::transport))]
    Transport(String),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(ics_notifier::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(ics_notifier::other))]
    Other(String),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<TimezoneError> for Error {
    fn from(err: TimezoneError) -> Self {
        match err {
            TimezoneError::InvalidZone(name) => Error::InvalidZone { name },
        }
    }
}

impl From<CompletionError> for Error {
    fn from(err: CompletionError) -> Self {
        match err {
            CompletionError::Http { status } => Error::Http { status },
            CompletionError::Transport(message) => Error::Transport(message),
        }
    }
}

/// Type alias for Result with our Error type
pub type BotResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Missing environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create calendar feed errors
pub fn feed_error(message: &str) -> Error {
    Error::Feed(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use miette::Diagnostic;

    #[test]
    fn test_typed_errors_convert() {
        let err = Error::from(CompletionError::Http { status: 404 });
        assert!(matches!(err, Error::Http { status: 404 }));
        assert_eq!(
            err.code().map(|code| code.to_string()).as_deref(),
            Some("ics_notifier::http")
        );

        let err = Error::from(TimezoneError::InvalidZone("Mars/Olympus".to_string()));
        assert_eq!(err.to_string(), "Invalid timezone: Mars/Olympus");

        let err = Error::from(DecodeError::MissingUid);
        assert!(matches!(err, Error::Decode(DecodeError::MissingUid)));
    }
}
