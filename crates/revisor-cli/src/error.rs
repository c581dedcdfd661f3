use std::path::PathBuf;

use revisor_config::ConfigError;
use revisor_history::HistoryError;
use thiserror::Error;

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed snapshot {path}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed event on line {line}: {source}")]
    Event {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("History error: {0}")]
    History(#[from] HistoryError),

    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}

impl CliError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            CliError::InvalidArgument { message } => {
                format!("{}\n\nRun 'revisor --help' for usage.", message)
            }
            CliError::Event { .. } => format!(
                "{}\n\nEach line must be one JSON object with an \"op\" of set, update or delete.",
                self
            ),
            CliError::Config(_) => format!(
                "{}\n\nCheck the config file and the COLLECTION, HISTORY_COLLECTION and *_FIELD environment variables.",
                self
            ),
            _ => self.to_string(),
        }
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_suggests_help() {
        let error = CliError::invalid_argument("not a document path: documents");
        let message = error.user_message();
        assert!(message.contains("not a document path"));
        assert!(message.contains("--help"));
    }

    #[test]
    fn test_event_error_names_line() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error = CliError::Event { line: 7, source };
        assert!(error.user_message().contains("line 7"));
    }
}
