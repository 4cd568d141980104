//! Ranked command failures.

use thiserror::Error;

/// Result type for parse and dispatch operations.
pub type CommandResult<T> = Result<T, CommandError>;

/// Classifies a [`CommandError`] for callers that branch on failure cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A typed or literal match failed.
    ParseMismatch,
    /// Input remained after every element was consumed.
    TooManyArguments,
    /// The value bag lacked a value the handler requires.
    MissingParameter,
    /// The actor failed an executor's permission check.
    NotPermitted,
    /// The bound handler itself failed.
    HandlerFailed,
}

/// A dispatch failure ranked by how far the match progressed.
///
/// `priority` carries the index of the element that failed. When several
/// overloads of one command fail, the failure with the highest priority
/// (the deepest match) is the one surfaced to the actor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CommandError {
    /// Failure classification.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
    /// Index of the failing element within its executor.
    pub priority: usize,
    /// Rendered usage of the executor that raised, when known.
    pub expected_args: Option<String>,
}

impl CommandError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            priority: 0,
            expected_args: None,
        }
    }

    /// A typed or literal match failure.
    pub fn mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseMismatch, message)
    }

    /// Unconsumed input remained; `priority` is the would-be next element index.
    pub fn too_many_arguments(priority: usize) -> Self {
        Self::new(ErrorKind::TooManyArguments, "too many arguments").with_priority(priority)
    }

    /// A required parameter was absent from the value bag.
    pub fn missing_parameter(id: &str) -> Self {
        Self::new(
            ErrorKind::MissingParameter,
            format!("missing required parameter '{id}'"),
        )
    }

    /// The actor lacks the given permission node.
    pub fn not_permitted(node: &str) -> Self {
        Self::new(
            ErrorKind::NotPermitted,
            format!("you do not have the '{node}' permission"),
        )
    }

    /// The bound handler raised.
    pub fn handler_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::HandlerFailed, message)
    }

    /// Set the failing element index.
    pub fn with_priority(mut self, priority: usize) -> Self {
        self.priority = priority;
        self
    }

    /// Attach the raising executor's usage line.
    pub fn with_expected_args(mut self, usage: &str) -> Self {
        self.expected_args = Some(usage.to_string());
        self
    }

    /// Transport-facing rendering: `"<message>. Expected args: <usage>"`
    /// when a usage line is attached, the bare message otherwise.
    pub fn render(&self) -> String {
        match &self.expected_args {
            Some(usage) => format!("{}. Expected args: {usage}", self.message),
            None => self.message.clone(),
        }
    }
}

/// Handlers report failures as plain strings; a ranked error converts to
/// its rendered form so extraction helpers can be used with `?` inside
/// handler bodies.
impl From<CommandError> for String {
    fn from(err: CommandError) -> Self {
        err.render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_with_expected_args() {
        let err = CommandError::mismatch("'x' is not a valid number").with_expected_args("pay <amount>");
        assert_eq!(
            err.render(),
            "'x' is not a valid number. Expected args: pay <amount>"
        );
    }

    #[test]
    fn test_render_bare() {
        let err = CommandError::not_permitted("herald.admin");
        assert_eq!(err.render(), "you do not have the 'herald.admin' permission");
        assert!(err.message.contains("herald.admin"));
    }

    #[test]
    fn test_priority_defaults_to_zero() {
        assert_eq!(CommandError::mismatch("nope").priority, 0);
        assert_eq!(CommandError::too_many_arguments(3).priority, 3);
    }

    #[test]
    fn test_sorts_by_priority() {
        let mut failures = vec![
            CommandError::mismatch("late").with_priority(2),
            CommandError::mismatch("early"),
            CommandError::mismatch("mid").with_priority(1),
        ];
        failures.sort_by_key(|f| f.priority);
        assert_eq!(failures.last().map(|f| f.message.as_str()), Some("late"));
    }
}
