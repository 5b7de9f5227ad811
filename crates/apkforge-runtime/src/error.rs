//! Runtime error types

use thiserror::Error;

/// A step name that could not be turned into an invocation
#[derive(Error, Debug)]
pub enum ResolveError {
    /// Undotted name missing from the host-method table. The hint is
    /// pre-formatted ("Did you mean one of: ...") or empty.
    #[error("step '{name}' not found on the build tool.{hint}\n  For functions in other modules use: 'module.function'")]
    UnknownHostMethod { name: String, hint: String },

    /// `module.Class` used where a callable is required
    #[error("'{name}' is a helper class, not callable directly. Use '{name}.method_name' to call a method")]
    ClassNotCallable { name: String },

    /// First segment of a dotted name matches no registered module
    #[error("unknown module '{module}' in step '{name}'. Make sure the module is registered with the pipeline")]
    UnknownModule { module: String, name: String },

    /// Dotted segment missing from its owner
    #[error("'{attr}' not found in '{owner}'")]
    UnknownAttribute { owner: String, attr: String },

    /// More than two dots in a step name
    #[error("too many dots in '{name}'. Maximum supported depth is 'module.Class.method'")]
    TooManyDots { name: String },

    /// Auto-construction hit a constructor parameter outside the
    /// recognized set
    #[error("cannot auto-construct '{class}': unknown required parameter '{param}'. Pass constructor arguments in the step itself, or register a provider for the parameter")]
    UnknownParameter { class: String, param: String },

    /// Constructor ran but failed
    #[error("failed to construct '{class}': {message}")]
    ConstructionFailed { class: String, message: String },

    /// Provider supplied a dependency of the wrong kind
    #[error("dependency '{param}' for '{class}' is {actual}, expected {expected}")]
    BadDependency {
        class: String,
        param: String,
        expected: &'static str,
        actual: &'static str,
    },
}

/// Everything the executor can record against a step. `is_warning`
/// only selects which policy key applies; the record shape is the same
/// either way.
#[derive(Error, Debug)]
pub enum StepError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Parse(#[from] apkforge_parser::ParseError),

    #[error("{0}")]
    Execution(String),

    #[error("{0}")]
    Warning(String),
}

impl StepError {
    pub fn execution(message: impl Into<String>) -> Self {
        StepError::Execution(message.into())
    }

    pub fn warning(message: impl Into<String>) -> Self {
        StepError::Warning(message.into())
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, StepError::Warning(_))
    }
}

impl From<anyhow::Error> for StepError {
    fn from(err: anyhow::Error) -> Self {
        StepError::Execution(format!("{:#}", err))
    }
}

impl From<apkforge_core::CoreError> for StepError {
    fn from(err: apkforge_core::CoreError) -> Self {
        StepError::Execution(err.to_string())
    }
}

/// Result type for step invocations
pub type Result<T> = std::result::Result<T, StepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_warning_discriminator() {
        assert!(StepError::warning("completed with warnings").is_warning());
        assert!(!StepError::execution("apktool failed").is_warning());
        assert!(!StepError::from(ResolveError::TooManyDots {
            name: "a.b.c.d".to_string()
        })
        .is_warning());
    }

    #[test]
    fn test_too_many_dots_message() {
        let err = ResolveError::TooManyDots {
            name: "a.b.c.d".to_string(),
        };
        assert!(err.to_string().contains("module.Class.method"));
    }
}
