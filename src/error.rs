//! Error types for Enlace operations.
//!
//! Provides rich error context for library consumers.

use std::fmt;

/// Main error type for Enlace operations.
///
/// Covers notation parsing failures, construction-time configuration
/// errors, and 3D embedding failures. Internal invariant violations
/// (malformed index tables, contaminated sentinel rows) are programmer
/// errors and panic instead of returning a variant.
///
/// # Examples
///
/// ```
/// use enlace::error::EnlaceError;
///
/// let err = EnlaceError::Parse {
///     notation: "C1CC".to_string(),
///     message: "unclosed ring bond 1".to_string(),
/// };
/// assert!(err.to_string().contains("C1CC"));
/// ```
#[derive(Debug)]
pub enum EnlaceError {
    /// A molecule notation could not be parsed. Aborts the whole batch
    /// call with no partial result.
    Parse {
        /// The offending notation string
        notation: String,
        /// Parser diagnostic
        message: String,
    },

    /// Invalid hyperparameter value provided at construction.
    InvalidHyperparameter {
        /// Parameter name
        param: String,
        /// Provided value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// 3D conformer generation failed for a molecule in the batch.
    EmbeddingFailure {
        /// The notation whose embedding failed
        notation: String,
        /// Failure detail
        message: String,
    },

    /// A batch call received zero notations.
    EmptyBatch,

    /// Generic error with string message.
    Other(String),
}

impl fmt::Display for EnlaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnlaceError::Parse { notation, message } => {
                write!(f, "Failed to parse notation {notation:?}: {message}")
            }
            EnlaceError::InvalidHyperparameter {
                param,
                value,
                constraint,
            } => {
                write!(
                    f,
                    "Invalid hyperparameter: {param} = {value}, expected {constraint}"
                )
            }
            EnlaceError::EmbeddingFailure { notation, message } => {
                write!(f, "3D embedding failed for {notation:?}: {message}")
            }
            EnlaceError::EmptyBatch => write!(f, "Empty batch: at least one notation is required"),
            EnlaceError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for EnlaceError {}

impl From<&str> for EnlaceError {
    fn from(msg: &str) -> Self {
        EnlaceError::Other(msg.to_string())
    }
}

impl From<String> for EnlaceError {
    fn from(msg: String) -> Self {
        EnlaceError::Other(msg)
    }
}

impl EnlaceError {
    /// Create a parse error with notation context.
    #[must_use]
    pub fn parse(notation: &str, message: impl Into<String>) -> Self {
        Self::Parse {
            notation: notation.to_string(),
            message: message.into(),
        }
    }

    /// Create a configuration error for a named hyperparameter.
    #[must_use]
    pub fn hyperparameter(param: &str, value: impl fmt::Display, constraint: &str) -> Self {
        Self::InvalidHyperparameter {
            param: param.to_string(),
            value: value.to_string(),
            constraint: constraint.to_string(),
        }
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, EnlaceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = EnlaceError::parse("C1CC", "unclosed ring bond 1");
        let msg = err.to_string();
        assert!(msg.contains("C1CC"));
        assert!(msg.contains("unclosed ring bond"));
    }

    #[test]
    fn test_invalid_hyperparameter_display() {
        let err = EnlaceError::hyperparameter(
            "activation",
            "swish",
            "one of ReLU, LeakyReLU, PReLU, tanh",
        );
        let msg = err.to_string();
        assert!(msg.contains("Invalid hyperparameter"));
        assert!(msg.contains("activation"));
        assert!(msg.contains("swish"));
    }

    #[test]
    fn test_embedding_failure_display() {
        let err = EnlaceError::EmbeddingFailure {
            notation: "CC".to_string(),
            message: "no atoms to place".to_string(),
        };
        assert!(err.to_string().contains("3D embedding failed"));
    }

    #[test]
    fn test_empty_batch_display() {
        let err = EnlaceError::EmptyBatch;
        assert!(err.to_string().contains("Empty batch"));
    }

    #[test]
    fn test_from_str() {
        let err: EnlaceError = "test error".into();
        assert!(matches!(err, EnlaceError::Other(_)));
        assert_eq!(err.to_string(), "test error");
    }

    #[test]
    fn test_from_string() {
        let err: EnlaceError = "test error".to_string().into();
        assert!(matches!(err, EnlaceError::Other(_)));
    }

    #[test]
    fn test_error_debug_impl() {
        let err = EnlaceError::Other("test".to_string());
        assert!(format!("{err:?}").contains("Other"));
    }
}
