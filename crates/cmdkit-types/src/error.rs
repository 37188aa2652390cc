use thiserror::Error;

use crate::value::Value;

/// Broad category of a [`CommandError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad parameter value, missing required parameter, malformed list write.
    Validation,
    /// Unresolvable template: bad path syntax, non-text embed, runaway recursion.
    Resolution,
    /// Malformed document: unknown operation or property, bad write target.
    Structural,
    /// Failure in a collaborator such as variable persistence.
    Other,
}

/// The terminate signal: every unrecoverable condition in the engine.
///
/// Execution halts at the first error; writes committed before it stay.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("resolution error: {0}")]
    Resolution(String),

    /// Resolution went deeper than the configured limit, almost always because
    /// a variable refers to itself. Carries the value as it stood unresolved.
    #[error("circular reference: resolving '{path}' went deeper than {max_depth} levels")]
    CircularReference {
        path: String,
        max_depth: u32,
        unresolved: Value,
    },

    #[error("structural error: {0}")]
    Structural(String),

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl CommandError {
    pub fn validation(msg: impl Into<String>) -> Self {
        CommandError::Validation(msg.into())
    }

    pub fn resolution(msg: impl Into<String>) -> Self {
        CommandError::Resolution(msg.into())
    }

    pub fn structural(msg: impl Into<String>) -> Self {
        CommandError::Structural(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CommandError::Validation(_) => ErrorKind::Validation,
            CommandError::Resolution(_) | CommandError::CircularReference { .. } => {
                ErrorKind::Resolution
            }
            CommandError::Structural(_) => ErrorKind::Structural,
            CommandError::Repository(_) => ErrorKind::Other,
        }
    }
}

/// Errors from variable persistence backends.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid source id: '{0}'")]
    InvalidSource(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_error_display() {
        let err = CommandError::validation("parameter 'name' is required");
        assert_eq!(err.to_string(), "validation error: parameter 'name' is required");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_circular_reference_is_resolution_kind() {
        let err = CommandError::CircularReference {
            path: "test".to_string(),
            max_depth: 50,
            unresolved: Value::text("{{ test }}"),
        };
        assert_eq!(err.kind(), ErrorKind::Resolution);
        assert!(err.to_string().contains("deeper than 50"));
    }

    #[test]
    fn test_repository_error_converts() {
        let err: CommandError = RepositoryError::InvalidSource("../x".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::Other);
        assert_eq!(err.to_string(), "repository error: invalid source id: '../x'");
    }
}
