//! Error types for the access-decision module.

use thiserror::Error;

/// Errors raised along the authorization pipeline.
///
/// Only [`AccessError::AccessDenied`] is a legitimate "no"; every other
/// variant means the decision could not be made.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccessError {
    /// Wiring or start-up validation failed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No metadata rule applies to the descriptor.
    #[error("no matching rule for {descriptor}")]
    NoMatchingRule { descriptor: String },

    /// The decision manager rejected the caller.
    #[error("access denied: {reason}")]
    AccessDenied { reason: String },

    /// Neither an explicit nor an ambient authentication is available.
    #[error("an authentication object was not found in the security context")]
    AuthenticationRequired,

    /// The authentication manager rejected the identity.
    #[error("bad credentials: {0}")]
    BadCredentials(String),

    /// A collaborator failed unexpectedly.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AccessError {
    #[must_use]
    pub fn denied(reason: impl Into<String>) -> Self {
        Self::AccessDenied {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    #[must_use]
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::AccessDenied { .. })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn only_denial_is_access_denied() {
        assert!(AccessError::denied("nope").is_access_denied());
        assert!(!AccessError::AuthenticationRequired.is_access_denied());
        assert!(!AccessError::configuration("x").is_access_denied());
        assert!(!AccessError::Internal("boom".to_owned()).is_access_denied());
        assert!(
            !AccessError::NoMatchingRule {
                descriptor: "GET /".to_owned()
            }
            .is_access_denied()
        );
    }

    #[test]
    fn messages() {
        assert_eq!(
            AccessError::denied("role missing").to_string(),
            "access denied: role missing"
        );
        assert_eq!(
            AccessError::NoMatchingRule {
                descriptor: "GET /foo".to_owned()
            }
            .to_string(),
            "no matching rule for GET /foo"
        );
    }
}
