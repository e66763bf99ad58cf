//
// error.rs
//
// Error taxonomy for code-link operations
//

use thiserror::Error;

/// A user-facing precondition that an action requires.
///
/// The `Display` text is the message shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Precondition {
    #[error("Feature not enabled.")]
    FeatureNotEnabled,
    #[error("No active diagram.")]
    NoActiveDiagram,
    #[error("No diagram node selected.")]
    NoSelectedNode,
    #[error("No text editor active.")]
    NoTextEditor,
    #[error("Nothing selected.")]
    NothingSelected,
}

#[derive(Debug, Error)]
pub enum CodeLinkError {
    /// An action was invoked without its preconditions; nothing was mutated.
    #[error("{0}")]
    PreconditionUnmet(#[from] Precondition),

    /// The workspace symbol index has no symbol with the searched name.
    #[error(
        "No symbol found with name \"{0}\". Maybe you need to load the project by opening at least one of its code files?"
    )]
    ResolutionMiss(String),

    /// Linked data stored on a diagram node could not be decoded.
    #[error("Malformed code link: {0}")]
    MalformedLink(String),

    /// Failure reported by the editor, diagram, or configuration host.
    #[error(transparent)]
    Host(#[from] anyhow::Error),
}

impl CodeLinkError {
    pub fn is_precondition(&self) -> bool {
        matches!(self, CodeLinkError::PreconditionUnmet(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_messages() {
        assert_eq!(
            CodeLinkError::from(Precondition::FeatureNotEnabled).to_string(),
            "Feature not enabled."
        );
        assert_eq!(
            CodeLinkError::from(Precondition::NothingSelected).to_string(),
            "Nothing selected."
        );
    }

    #[test]
    fn test_resolution_miss_names_symbol() {
        let err = CodeLinkError::ResolutionMiss("handleRequest".to_string());
        let message = err.to_string();
        assert!(message.starts_with("No symbol found with name \"handleRequest\"."));
        assert!(message.contains("opening at least one of its code files"));
        assert!(!err.is_precondition());
    }

    #[test]
    fn test_host_error_is_transparent() {
        let err = CodeLinkError::from(anyhow::anyhow!("editor went away"));
        assert_eq!(err.to_string(), "editor went away");
    }
}
