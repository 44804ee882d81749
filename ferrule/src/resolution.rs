use std::fmt;

use crate::StdError;

/// Outcome of resolving a dependency by type.
///
/// `NotFound` is the routine outcome for a type nobody provides; `Failed`
/// means a factory exists but could not produce a value.
#[derive(Debug)]
pub enum Resolution<T> {
    Found(T),
    NotFound,
    Failed(ResolveError),
}

impl<T> Resolution<T> {
    /// Converts into an `Option`, discarding the failure cause.
    pub fn ok(self) -> Option<T> {
        match self {
            Resolution::Found(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Resolution::NotFound)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Resolution::Failed(_))
    }

    pub fn map<U, F>(self, f: F) -> Resolution<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Resolution::Found(v) => Resolution::Found(f(v)),
            Resolution::NotFound => Resolution::NotFound,
            Resolution::Failed(e) => Resolution::Failed(e),
        }
    }

    /// Converts into a `Result` where a missing dependency is `Ok(None)`.
    pub fn into_result(self) -> Result<Option<T>, ResolveError> {
        match self {
            Resolution::Found(v) => Ok(Some(v)),
            Resolution::NotFound => Ok(None),
            Resolution::Failed(e) => Err(e),
        }
    }
}

impl<T> From<Resolution<T>> for Option<T> {
    fn from(value: Resolution<T>) -> Self {
        value.ok()
    }
}

/// Reasons a registered factory operation did not produce a value.
#[derive(Debug)]
pub enum ResolveError {
    /// The operation returned an error.
    Factory {
        operation: &'static str,
        type_name: &'static str,
        source: StdError,
    },
    /// The operation panicked.
    Panicked {
        operation: &'static str,
        type_name: &'static str,
        message: String,
    },
    /// The operation declares a parameter list the injector cannot supply.
    UnsupportedArity {
        operation: &'static str,
        type_name: &'static str,
        arity: usize,
    },
    /// The operation produced a value of another type.
    TypeMismatch {
        operation: &'static str,
        expected: &'static str,
    },
}

impl ResolveError {
    /// Name of the operation that failed.
    pub fn operation(&self) -> &'static str {
        match self {
            ResolveError::Factory { operation, .. }
            | ResolveError::Panicked { operation, .. }
            | ResolveError::UnsupportedArity { operation, .. }
            | ResolveError::TypeMismatch { operation, .. } => *operation,
        }
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::Factory {
                operation,
                type_name,
                source,
            } => write!(f, "Factory {operation} for {type_name} failed: {source}"),
            ResolveError::Panicked {
                operation,
                type_name,
                message,
            } => write!(f, "Factory {operation} for {type_name} panicked: {message}"),
            ResolveError::UnsupportedArity {
                operation,
                type_name,
                arity,
            } => write!(
                f,
                "Factory {operation} for {type_name} takes {arity} parameters"
            ),
            ResolveError::TypeMismatch {
                operation,
                expected,
            } => write!(f, "Factory {operation} did not produce {expected}"),
        }
    }
}

impl std::error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResolveError::Factory { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
