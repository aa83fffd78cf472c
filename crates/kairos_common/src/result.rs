//! Common result and error types for the timing engine.

/// The standard result type for fallible engine operations.
///
/// `Err` indicates an unrecoverable internal error (a bug in the engine or
/// a blown capacity ceiling), not bad user input. User-visible conditions
/// such as constraint warnings are reported through the diagnostic sink and
/// the operation still returns `Ok`.
pub type StaResult<T> = Result<T, InternalError>;

/// An internal engine error.
///
/// Raised for corrupt state (such as a duplicate slack contribution), index
/// ceilings (tag or tag-group index overflow), and unexpected filter
/// combinations. The current analysis is abandoned; there is no recovery.
#[derive(Debug, thiserror::Error)]
#[error("internal timing engine error: {message}")]
pub struct InternalError {
    /// Description of the failure.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        let err = InternalError::new("max tag index exceeded");
        assert_eq!(
            format!("{err}"),
            "internal timing engine error: max tag index exceeded"
        );
    }

    #[test]
    fn ok_and_err_paths() {
        let ok: StaResult<u32> = Ok(7);
        assert_eq!(ok.ok(), Some(7));
        let err: StaResult<u32> = Err(InternalError::new("boom"));
        assert_eq!(err.err().unwrap().message, "boom");
    }

    #[test]
    fn from_string() {
        let err: InternalError = "tns incr existing vertex".to_string().into();
        assert_eq!(err.message, "tns incr existing vertex");
    }
}
