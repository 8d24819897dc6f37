//! Built-in voters.

use access_decision_sdk::{
    AccessDecisionVoter, ConfigAttribute, DescriptorKind, RequestDescriptor, Vote,
};
use webguard_security::{Authentication, AuthenticationKind};

pub const DEFAULT_ROLE_PREFIX: &str = "ROLE_";

/// Votes on attributes carrying the role prefix: grants when the caller
/// holds the attribute as an authority, denies otherwise.
#[derive(Debug, Clone)]
pub struct RoleVoter {
    prefix: String,
}

impl RoleVoter {
    #[must_use]
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for RoleVoter {
    fn default() -> Self {
        Self::with_prefix(DEFAULT_ROLE_PREFIX)
    }
}

impl AccessDecisionVoter for RoleVoter {
    fn supports(&self, attribute: &ConfigAttribute) -> bool {
        attribute.as_str().starts_with(&self.prefix)
    }

    fn supports_kind(&self, _kind: DescriptorKind) -> bool {
        true
    }

    fn vote(
        &self,
        authentication: &Authentication,
        _descriptor: &RequestDescriptor,
        attributes: &[ConfigAttribute],
    ) -> Vote {
        let mut result = Vote::Abstain;
        for attribute in attributes.iter().filter(|a| self.supports(a)) {
            result = Vote::Denied;
            if authentication.has_authority(attribute.as_str()) {
                return Vote::Granted;
            }
        }
        result
    }
}

pub const IS_AUTHENTICATED_FULLY: &str = "IS_AUTHENTICATED_FULLY";
pub const IS_AUTHENTICATED_REMEMBERED: &str = "IS_AUTHENTICATED_REMEMBERED";
pub const IS_AUTHENTICATED_ANONYMOUSLY: &str = "IS_AUTHENTICATED_ANONYMOUSLY";

/// Votes on how strongly the caller was authenticated.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthenticatedVoter;

impl AuthenticatedVoter {
    fn satisfies(kind: &AuthenticationKind, attribute: &str) -> bool {
        let fully = matches!(
            kind,
            AuthenticationKind::Full | AuthenticationKind::RunAs { .. }
        );
        match attribute {
            IS_AUTHENTICATED_FULLY => fully,
            IS_AUTHENTICATED_REMEMBERED => fully || *kind == AuthenticationKind::RememberMe,
            IS_AUTHENTICATED_ANONYMOUSLY => true,
            _ => false,
        }
    }
}

impl AccessDecisionVoter for AuthenticatedVoter {
    fn supports(&self, attribute: &ConfigAttribute) -> bool {
        matches!(
            attribute.as_str(),
            IS_AUTHENTICATED_FULLY | IS_AUTHENTICATED_REMEMBERED | IS_AUTHENTICATED_ANONYMOUSLY
        )
    }

    fn supports_kind(&self, _kind: DescriptorKind) -> bool {
        true
    }

    fn vote(
        &self,
        authentication: &Authentication,
        _descriptor: &RequestDescriptor,
        attributes: &[ConfigAttribute],
    ) -> Vote {
        let mut result = Vote::Abstain;
        for attribute in attributes.iter().filter(|a| self.supports(a)) {
            result = Vote::Denied;
            if Self::satisfies(authentication.kind(), attribute.as_str()) {
                return Vote::Granted;
            }
        }
        result
    }
}
