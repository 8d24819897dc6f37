#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Webguard security primitives.
//!
//! - [`Authentication`] - caller identity with granted authorities
//! - [`context`] - per-thread ambient slot holding the current authentication
pub mod authentication;
pub mod context;

pub use authentication::{
    Authentication, AuthenticationBuilder, AuthenticationKind, GrantedAuthority,
};
pub use context::{ContextSwap, RequestScope};
