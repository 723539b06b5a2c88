use thiserror::Error;

/// Result type alias for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Coarse classification of a [`RegistryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input was rejected before any mutation.
    Validation,
    /// Input collides with existing state, which is left unchanged.
    Conflict,
    /// A referenced zone, network, host or record does not exist.
    NotFound,
    /// The operation must be aborted; retrying today will not help.
    Fatal,
    /// Storage, rendering or serialization failure.
    Internal,
}

/// Errors that can occur when working with the inventory
#[derive(Error, Debug)]
pub enum RegistryError {
    /// A field failed validation
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Name of the offending field
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// The request collides with existing inventory
    #[error("conflict: {0}")]
    Conflict(String),

    /// Entity lookup failed
    #[error("{kind} not found: {key}")]
    NotFound {
        /// Entity kind, e.g. "zone" or "network"
        kind: &'static str,
        /// Lookup key as given by the caller
        key: String,
    },

    /// The daily serial sequence is used up
    #[error("serial number {previous} cannot be advanced: more than 99 updates in one day")]
    SerialExhausted {
        /// Serial that could not be incremented
        previous: u64,
    },

    /// The zone could not be rendered from the current inventory
    #[error("cannot render zone {zone}: {reason}")]
    Render {
        /// Zone being rendered
        zone: String,
        /// Inconsistency that stopped rendering
        reason: String,
    },

    /// Configuration file could not be parsed or is inconsistent
    #[error("config error: {0}")]
    Config(String),

    /// State store failure
    #[error("storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing/serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RegistryError {
    /// Shorthand for a validation failure on `field`.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }

    /// Shorthand for a failed lookup.
    pub fn not_found(kind: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            kind,
            key: key.to_string(),
        }
    }

    /// Returns the taxonomy bucket of this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Invalid { .. } => ErrorKind::Validation,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::SerialExhausted { .. } => ErrorKind::Fatal,
            Self::Render { .. }
            | Self::Config(_)
            | Self::Storage(_)
            | Self::Io(_)
            | Self::Json(_) => ErrorKind::Internal,
        }
    }

    /// Returns true if the triggering operation must be abandoned
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::SerialExhausted { .. })
    }

    /// Returns the HTTP status code an API layer should answer with
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Fatal | ErrorKind::Internal => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_and_status_codes() {
        let err = RegistryError::invalid("range", "bad mask");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.to_string(), "invalid range: bad mask");

        let err = RegistryError::Conflict("network overlaps with: 10.0.1.0/28".into());
        assert_eq!(err.status_code(), 409);

        let err = RegistryError::not_found("zone", "example.org");
        assert_eq!(err.to_string(), "zone not found: example.org");
        assert_eq!(err.status_code(), 404);

        let err = RegistryError::SerialExhausted {
            previous: 2_026_101_999,
        };
        assert!(err.is_fatal());
        assert_eq!(err.kind(), ErrorKind::Fatal);
    }
}
