//! Error types for caches and views.

/// Cache errors.
///
/// Lookup misses are not errors: `find`, `lower_bound` and `upper_bound`
/// report them through an end cursor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// An operation that needs an entry was handed an end cursor.
    #[error("cannot {operation} nonexistant item")]
    NonexistentItem { operation: &'static str },

    /// Annotation names must be non-empty.
    #[error("cannot annotate with empty attribute")]
    EmptyAnnotationName,

    /// A view was attached to nothing.
    #[error("cannot form a view into a nonexistent cache")]
    MissingCore,

    /// Views are read-only.
    #[error(
        "view_error: cannot {operation} a view: membership is derived from the core cache and must be changed there"
    )]
    ViewMutation { operation: &'static str },

    /// The factory has no constructor registered under this name.
    #[error("unknown cache kind: {kind}")]
    UnknownKind { kind: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl CacheError {
    /// Whether the error is a caller mistake rather than a setup problem.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Self::NonexistentItem { .. }
                | Self::EmptyAnnotationName
                | Self::MissingCore
                | Self::ViewMutation { .. }
        )
    }
}

impl From<serde_yaml::Error> for CacheError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Config {
            message: err.to_string(),
        }
    }
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_stable() {
        assert_eq!(
            CacheError::NonexistentItem {
                operation: "annotate"
            }
            .to_string(),
            "cannot annotate nonexistant item"
        );
        assert_eq!(
            CacheError::EmptyAnnotationName.to_string(),
            "cannot annotate with empty attribute"
        );
        assert!(CacheError::ViewMutation { operation: "clear" }
            .to_string()
            .starts_with("view_error: cannot clear a view"));
    }

    #[test]
    fn test_usage_classification() {
        assert!(CacheError::MissingCore.is_usage());
        assert!(!CacheError::UnknownKind {
            kind: "Remote".to_string()
        }
        .is_usage());
    }
}
