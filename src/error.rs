//! Error types for multillm.

use std::fmt;

use crate::provider::ProviderError;
use crate::router::UseCase;

/// Result type alias for multillm operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for multillm.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Provider '{provider}' is not registered")]
    NotRegistered { provider: String },

    #[error("No provider available for {context}{}", format_failures(.failures))]
    NoProviderAvailable {
        context: String,
        failures: Vec<CandidateFailure>,
    },

    #[error("Use case '{use_case}' has no entry in the routing policy table")]
    UnroutedUseCase { use_case: UseCase },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why a single routing candidate could not serve a request.
#[derive(Debug, Clone)]
pub enum FailureReason {
    /// The candidate appears in the preference list but has no adapter.
    NotRegistered,
    /// The adapter was invoked and failed.
    Failed(ProviderError),
}

/// One entry in the diagnostic trail of [`Error::NoProviderAvailable`].
#[derive(Debug, Clone)]
pub struct CandidateFailure {
    pub provider: String,
    pub reason: FailureReason,
}

impl fmt::Display for CandidateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            FailureReason::NotRegistered => write!(f, "{}: not registered", self.provider),
            FailureReason::Failed(err) => write!(f, "{}: {}", self.provider, err),
        }
    }
}

fn format_failures(failures: &[CandidateFailure]) -> String {
    if failures.is_empty() {
        return String::new();
    }
    let joined = failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    format!(" ({})", joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderErrorKind;

    #[test]
    fn test_no_provider_message_lists_every_candidate() {
        let err = Error::NoProviderAvailable {
            context: "use case 'healthcare'".to_string(),
            failures: vec![
                CandidateFailure {
                    provider: "gemini".to_string(),
                    reason: FailureReason::NotRegistered,
                },
                CandidateFailure {
                    provider: "groq".to_string(),
                    reason: FailureReason::Failed(ProviderError::new(
                        ProviderErrorKind::RateLimit,
                        "slow down",
                    )),
                },
            ],
        };

        let message = err.to_string();
        assert!(message.contains("healthcare"));
        assert!(message.contains("gemini: not registered"));
        assert!(message.contains("groq: rate limited: slow down"));
    }

    #[test]
    fn test_no_provider_message_without_failures() {
        let err = Error::NoProviderAvailable {
            context: "query_all".to_string(),
            failures: vec![],
        };
        assert_eq!(err.to_string(), "No provider available for query_all");
    }
}
