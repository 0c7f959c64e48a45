//! Error types for pipestack operations

use crate::compiler::CompileError;
use crate::config::ConfigError;
use crate::synth::SynthError;
use pipestack_core::{MappingError, PathError};
use thiserror::Error;

/// Master error type for all pipestack errors.
#[derive(Debug, Clone, Error)]
pub enum PipestackError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("Synthesis error: {0}")]
    Synth(#[from] SynthError),

    #[error("Path error: {0}")]
    Path(#[from] PathError),

    #[error("Routing error: {0}")]
    Mapping(#[from] MappingError),
}

/// Result type alias for pipestack operations.
pub type PipestackResult<T> = Result<T, PipestackError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pipestack_core::{MessageAttribute, MessageAttributeError};

    #[test]
    fn test_pipestack_error_from_variants() {
        let config = PipestackError::from(ConfigError::UnsupportedFormat("ini".to_string()));
        assert!(matches!(config, PipestackError::Config(_)));

        let compile = PipestackError::from(CompileError::UnorderedTarget);
        assert!(matches!(compile, PipestackError::Compile(_)));

        let synth = PipestackError::from(SynthError::Undeclared("Pipe".to_string()));
        assert!(matches!(synth, PipestackError::Synth(_)));

        let path = PipestackError::from(PathError::Missing {
            path: "$.eventID".to_string(),
        });
        assert!(matches!(path, PipestackError::Path(_)));

        let mapping = PipestackError::from(MappingError::from(MessageAttributeError::Empty {
            attribute: MessageAttribute::GroupId,
        }));
        assert!(matches!(mapping, PipestackError::Mapping(_)));
    }

    #[test]
    fn test_error_display_carries_context() {
        let err = PipestackError::from(CompileError::UnorderedTarget);
        assert!(err.to_string().starts_with("Compile error: target queue must be FIFO"));
    }
}
