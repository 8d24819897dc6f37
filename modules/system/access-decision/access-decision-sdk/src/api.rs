//! Collaborator traits of the authorization pipeline.
//!
//! Every trait is synchronous and `Send + Sync`: implementations are built
//! once at start-up and shared read-only across request threads.

use webguard_security::Authentication;

use crate::error::AccessError;
use crate::models::{
    AuthorizationEvent, ConfigAttribute, DescriptorKind, RequestDescriptor, Vote,
};

/// Maps a request descriptor to the ordered attributes it requires.
pub trait MetadataSource: Send + Sync {
    /// Attributes required by `descriptor`.
    ///
    /// An empty vector means the descriptor is public.
    ///
    /// # Errors
    ///
    /// - `NoMatchingRule` if no rule applies and this source requires a match
    fn attributes_for(
        &self,
        descriptor: &RequestDescriptor,
    ) -> Result<Vec<ConfigAttribute>, AccessError>;

    /// Every attribute this source can emit, or `None` if unknown.
    fn all_config_attributes(&self) -> Option<Vec<ConfigAttribute>> {
        None
    }

    fn supports_kind(&self, kind: DescriptorKind) -> bool;
}

/// Grants or denies access for an identity, a descriptor and its attributes.
pub trait AccessDecisionManager: Send + Sync {
    /// Returns normally on grant.
    ///
    /// # Errors
    ///
    /// - `AccessDenied` if the caller is rejected
    /// - any other variant if the decision could not be made
    fn decide(
        &self,
        authentication: &Authentication,
        descriptor: &RequestDescriptor,
        attributes: &[ConfigAttribute],
    ) -> Result<(), AccessError>;

    fn supports(&self, attribute: &ConfigAttribute) -> bool;

    fn supports_kind(&self, kind: DescriptorKind) -> bool;
}

/// One vote inside a composite decision manager.
pub trait AccessDecisionVoter: Send + Sync {
    fn supports(&self, attribute: &ConfigAttribute) -> bool;

    fn supports_kind(&self, kind: DescriptorKind) -> bool;

    fn vote(
        &self,
        authentication: &Authentication,
        descriptor: &RequestDescriptor,
        attributes: &[ConfigAttribute],
    ) -> Vote;
}

/// Derives a substitute identity to use while the decision is made.
pub trait RunAsManager: Send + Sync {
    /// `None` when no substitution applies to this descriptor.
    fn build_run_as(
        &self,
        authentication: &Authentication,
        descriptor: &RequestDescriptor,
        attributes: &[ConfigAttribute],
    ) -> Option<Authentication>;

    fn supports(&self, attribute: &ConfigAttribute) -> bool;

    fn supports_kind(&self, kind: DescriptorKind) -> bool;
}

/// Verifies an identity on the live path.
pub trait AuthenticationManager: Send + Sync {
    /// Returns the verified (authenticated) identity.
    ///
    /// # Errors
    ///
    /// - `BadCredentials` if the identity cannot be verified
    fn authenticate(&self, authentication: &Authentication)
    -> Result<Authentication, AccessError>;
}

/// Receives authorization notifications from the live path.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: &AuthorizationEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn publish(&self, _event: &AuthorizationEvent) {}
}
