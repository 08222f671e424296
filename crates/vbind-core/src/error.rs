//! Error taxonomy shared by the resolver, converters and runtime.
//!
//! Most runtime failures are recovered locally and only logged; these types
//! carry enough context (owner, path, attempted value) for the log line and
//! for callers that want to inspect what went wrong.

use thiserror::Error;

/// How loudly a path resolution failure should be reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    /// Markup or registration bug (member does not exist).
    Severe,
    /// Transient, e.g. an intermediate object is not assigned yet.
    Retryable,
}

/// Why a field path could not be resolved.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PathErrorReason {
    #[error("type is not registered")]
    UnknownType,
    #[error("path is empty or has an empty segment")]
    EmptySegment,
    #[error("no member `{0}`")]
    MemberNotFound(String),
    #[error("`{0}` is null")]
    NullIntermediate(String),
    #[error("`{0}` holds a value that cannot be traversed")]
    NotTraversable(String),
    #[error("calculated member `{0}` cannot be traversed")]
    CalculatedTraversal(String),
}

/// Field path resolution failure.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("cannot resolve `{path}` on `{type_name}`: {reason}")]
pub struct PathError {
    pub type_name: String,
    pub path: String,
    pub reason: PathErrorReason,
    pub severity: Severity,
}

impl PathError {
    #[must_use]
    pub fn severe(type_name: &str, path: &str, reason: PathErrorReason) -> Self {
        Self {
            type_name: type_name.to_owned(),
            path: path.to_owned(),
            reason,
            severity: Severity::Severe,
        }
    }

    #[must_use]
    pub fn retryable(type_name: &str, path: &str, reason: PathErrorReason) -> Self {
        Self {
            type_name: type_name.to_owned(),
            path: path.to_owned(),
            reason,
            severity: Severity::Retryable,
        }
    }

    #[must_use]
    pub fn is_severe(&self) -> bool {
        self.severity == Severity::Severe
    }
}

/// A value could not be converted to a field's declared type.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("cannot convert `{value}` to {expected}: {message}")]
pub struct ConversionError {
    pub expected: String,
    pub value: String,
    pub message: String,
}

impl ConversionError {
    #[must_use]
    pub fn new(expected: impl Into<String>, value: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
            value: value.into(),
            message: message.into(),
        }
    }
}

/// A transform, change handler or other user callback failed.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct InvocationError {
    pub message: String,
}

impl InvocationError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<ConversionError> for InvocationError {
    fn from(err: ConversionError) -> Self {
        Self::new(err.to_string())
    }
}

/// Malformed binding expression.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ExprError {
    #[error("`{0}` contains no binding token")]
    NoBindingTokens(String),
    #[error("unbalanced brace at byte {position} in `{text}`")]
    UnbalancedBrace { text: String, position: usize },
    #[error("empty path in `{0}`")]
    EmptyPath(String),
    #[error("malformed transform call `{0}`")]
    MalformedTransform(String),
    #[error("transform arguments must be single binding tokens, got `{0}`")]
    TransformArgument(String),
}

/// Type registration failure.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("type `{0}` is already registered")]
    DuplicateType(String),
    #[error("type `{0}` is not registered")]
    UnknownType(String),
    #[error("`{type_name}` extends unregistered type `{base}`")]
    UnknownBase { type_name: String, base: String },
    #[error("`{type_name}` and its base `{base}` are different kinds of type")]
    BaseKindMismatch { type_name: String, base: String },
    #[error("`{type_name}` declares `{member}` twice")]
    DuplicateMember { type_name: String, member: String },
    #[error("type `{0}` is not a record")]
    NotARecord(String),
    #[error("type `{0}` is not an owner type")]
    NotAnOwner(String),
}

/// Umbrella error for markup-time and driver-level operations.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BindingError {
    #[error(transparent)]
    Expr(#[from] ExprError),
    #[error(transparent)]
    Path(#[from] PathError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error("`{owner}` has no change handler `{handler}`")]
    UnknownHandler { owner: String, handler: String },
    #[error("transform `{name}` is not registered (binding on `{owner}`)")]
    UnknownTransform { owner: String, name: String },
    #[error("owner `{0}` has been destroyed")]
    Destroyed(String),
    #[error("change handlers still pending after {passes} passes: {}", format_pending(.pending))]
    ChangeHandlerOverflow {
        passes: usize,
        /// `(owner, handler)` pairs still queued when the cap tripped.
        pending: Vec<(String, String)>,
    },
}

fn format_pending(pending: &[(String, String)]) -> String {
    pending
        .iter()
        .map(|(owner, handler)| format!("{owner}.{handler}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_error_message_names_type_and_path() {
        let err = PathError::severe("Label", "Txet", PathErrorReason::MemberNotFound("Txet".into()));
        assert!(err.is_severe());
        assert_eq!(err.to_string(), "cannot resolve `Txet` on `Label`: no member `Txet`");
    }

    #[test]
    fn overflow_lists_every_pending_handler() {
        let err = BindingError::ChangeHandlerOverflow {
            passes: 1000,
            pending: vec![
                ("Ping#1".into(), "OnA".into()),
                ("Ping#1".into(), "OnB".into()),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("1000 passes"));
        assert!(msg.contains("Ping#1.OnA, Ping#1.OnB"));
    }
}
