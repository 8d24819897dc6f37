#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Access Decision SDK
//!
//! This crate provides the public contracts of the `access_decision` module:
//!
//! - [`RequestDescriptor`], [`ConfigAttribute`], [`Vote`] - Core models
//! - [`MetadataSource`] - Descriptor to required-attribute lookup
//! - [`AccessDecisionManager`], [`AccessDecisionVoter`] - Decision strategies
//! - [`RunAsManager`] - Scoped identity substitution
//! - [`AuthenticationManager`] - Re-authentication on the live path
//! - [`EventSink`], [`AuthorizationEvent`] - Authorization notifications
//! - [`AccessError`] - Error taxonomy
//!
//! ## Usage
//!
//! ```ignore
//! use access_decision_sdk::{
//!     AccessDecisionManager, AccessError, ConfigAttribute, DescriptorKind, RequestDescriptor,
//! };
//! use webguard_security::Authentication;
//!
//! struct PrincipalIs(&'static str);
//!
//! impl AccessDecisionManager for PrincipalIs {
//!     fn decide(
//!         &self,
//!         auth: &Authentication,
//!         _descriptor: &RequestDescriptor,
//!         _attributes: &[ConfigAttribute],
//!     ) -> Result<(), AccessError> {
//!         if auth.principal() == self.0 {
//!             Ok(())
//!         } else {
//!             Err(AccessError::denied("principal mismatch"))
//!         }
//!     }
//!
//!     fn supports(&self, _attribute: &ConfigAttribute) -> bool {
//!         true
//!     }
//!
//!     fn supports_kind(&self, _kind: DescriptorKind) -> bool {
//!         true
//!     }
//! }
//! ```

pub mod api;
pub mod error;
pub mod models;

pub use api::{
    AccessDecisionManager, AccessDecisionVoter, AuthenticationManager, EventSink, MetadataSource,
    NoopEventSink, RunAsManager,
};
pub use error::AccessError;
pub use models::{
    AuthorizationEvent, ConfigAttribute, DescriptorKind, MethodInvocation, RequestDescriptor,
    Vote, WebRequest,
};
