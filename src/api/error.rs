use crate::domain::{InvalidTransition, ValidationError};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A failed backend call.
///
/// Every variant displays as a human-readable message suitable for showing
/// inline next to the action that caused it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No response was received.
    #[error("{message}")]
    Transport {
        /// What was being attempted.
        message: String,
        /// The underlying transport failure.
        #[source]
        source: BoxError,
    },

    /// The backend answered with a non-success status.
    #[error("{message}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// The server's message, or a fallback naming the operation.
        message: String,
    },

    /// The request was rejected before it was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The response body could not be understood.
    #[error("{message}")]
    Malformed {
        /// What was wrong with the body.
        message: String,
    },
}

impl Error {
    pub(crate) fn transport(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Transport {
            message: message.into(),
            source: source.into(),
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// The HTTP status code, if the backend answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the failure means "no usable session" rather than a fault.
    ///
    /// The profile endpoint answers 401, 403 or 404 when the caller is not
    /// logged in.
    #[must_use]
    pub const fn is_unauthenticated(&self) -> bool {
        matches!(self.status(), Some(401 | 403 | 404))
    }
}

impl From<InvalidTransition> for Error {
    fn from(error: InvalidTransition) -> Self {
        Self::Validation(error.into())
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(401, true)]
    #[test_case(403, true)]
    #[test_case(404, true)]
    #[test_case(500, false)]
    #[test_case(422, false)]
    fn unauthenticated_statuses(status: u16, expected: bool) {
        let error = Error::Status {
            status,
            message: "nope".to_string(),
        };
        assert_eq!(error.is_unauthenticated(), expected);
    }

    #[test]
    fn transport_displays_message_only() {
        let error = Error::transport("Failed to fetch disasters", "connection refused");
        assert_eq!(error.to_string(), "Failed to fetch disasters");
        assert!(!error.is_unauthenticated());
        assert_eq!(
            std::error::Error::source(&error).map(ToString::to_string),
            Some("connection refused".to_string())
        );
    }

    #[test]
    fn validation_is_transparent() {
        let error = Error::from(ValidationError::Missing("title"));
        assert_eq!(error.to_string(), "title is required");
    }
}
