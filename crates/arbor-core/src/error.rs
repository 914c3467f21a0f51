//! Error Types
//!
//! Standardized error types for the directory core, with the referral
//! outcome modeled as a distinguished variant rather than an ordinary
//! failure: a referral carries the complete, ordered set of alternate
//! location URLs for one referring boundary and is meant to be enumerated
//! by the caller, not swallowed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`DirectoryError`].
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Error that can occur while servicing a directory operation.
#[derive(Debug, Clone, Error)]
pub enum DirectoryError {
    /// The request was malformed at construction time (caller misuse).
    ///
    /// Raised before any pipeline stage runs, so no partial side effects
    /// exist when this surfaces.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// A distinguished name failed to parse.
    #[error("invalid DN '{dn}': {message}")]
    InvalidDn { dn: String, message: String },

    /// The target entry does not exist.
    #[error("no such entry: {dn}")]
    NoSuchEntry { dn: String },

    /// An entry already exists at the target DN.
    #[error("entry already exists: {dn}")]
    EntryAlreadyExists { dn: String },

    /// The operation requires a leaf entry but the target has children.
    #[error("not allowed on non-leaf entry: {dn}")]
    NotAllowedOnNonLeaf { dn: String },

    /// The operation violates the schema.
    #[error("schema violation: {message}")]
    SchemaViolation { message: String },

    /// An attribute value or modification is invalid.
    #[error("invalid attribute '{id}': {message}")]
    InvalidAttribute { id: String, message: String },

    /// A referring boundary was encountered while referral handling is set
    /// to throw. Carries every alternate-location URL for that boundary.
    #[error("referral at '{}' ({} urls)", outcome.dn, outcome.urls.len())]
    Referral { outcome: ReferralOutcome },

    /// A capability was invoked on an operation kind that does not carry
    /// it (e.g. referral-policy toggles on a bind). Signals a programming
    /// error; normal operation flow must not catch this.
    #[error("operation '{operation}' is unsupported for {kind} contexts")]
    UnsupportedOperation {
        operation: &'static str,
        kind: &'static str,
    },

    /// Authentication or authorization failure.
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// The interceptor chain or registry configuration is invalid.
    #[error("invalid pipeline configuration: {message}")]
    InvalidConfiguration { message: String },
}

impl DirectoryError {
    /// Whether this error is the distinguished referral outcome.
    #[must_use]
    pub fn is_referral(&self) -> bool {
        matches!(self, DirectoryError::Referral { .. })
    }

    /// Whether this error signals caller misuse detected at construction.
    #[must_use]
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            DirectoryError::InvalidRequest { .. } | DirectoryError::InvalidDn { .. }
        )
    }

    /// Extract the referral outcome, if any.
    #[must_use]
    pub fn referral(&self) -> Option<&ReferralOutcome> {
        match self {
            DirectoryError::Referral { outcome } => Some(outcome),
            _ => None,
        }
    }
}

/// The alternate locations collected at one referring boundary.
///
/// Exactly one outcome is produced per boundary encountered, regardless of
/// how many `ref` values the referring entry holds; callers iterate
/// [`ReferralOutcome::urls`] to implement skip-to-next-referral.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralOutcome {
    /// DN of the referring entry (the nearest referring ancestor).
    pub dn: String,
    /// Rewritten referral URLs, in storage order.
    pub urls: Vec<String>,
}

impl ReferralOutcome {
    /// Create an outcome for the given referring entry DN.
    #[must_use]
    pub fn new(dn: impl Into<String>, urls: Vec<String>) -> Self {
        Self {
            dn: dn.into(),
            urls,
        }
    }

    /// The rewritten referral URLs, in storage order.
    #[must_use]
    pub fn urls(&self) -> &[String] {
        &self.urls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_referral_classification() {
        let err = DirectoryError::Referral {
            outcome: ReferralOutcome::new(
                "ou=people,dc=example",
                vec!["ldap://hostB/ou=People,dc=example2".to_string()],
            ),
        };
        assert!(err.is_referral());
        assert_eq!(err.referral().unwrap().urls().len(), 1);
        assert!(!err.is_construction_error());
    }

    #[test]
    fn test_construction_error_classification() {
        let err = DirectoryError::InvalidRequest {
            message: "move requires a new superior".to_string(),
        };
        assert!(err.is_construction_error());
        assert!(err.referral().is_none());
    }

    #[test]
    fn test_display_strings() {
        let err = DirectoryError::NoSuchEntry {
            dn: "cn=missing,dc=example".to_string(),
        };
        assert_eq!(err.to_string(), "no such entry: cn=missing,dc=example");

        let err = DirectoryError::UnsupportedOperation {
            operation: "throw_referral",
            kind: "bind",
        };
        assert_eq!(
            err.to_string(),
            "operation 'throw_referral' is unsupported for bind contexts"
        );
    }
}
