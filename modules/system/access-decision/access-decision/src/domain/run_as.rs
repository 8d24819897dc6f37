//! Run-as managers.

use access_decision_sdk::{ConfigAttribute, DescriptorKind, RequestDescriptor, RunAsManager};
use webguard_security::{Authentication, AuthenticationKind, GrantedAuthority};

use crate::domain::voters::DEFAULT_ROLE_PREFIX;

pub const RUN_AS_PREFIX: &str = "RUN_AS_";

/// Never substitutes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRunAsManager;

impl RunAsManager for NullRunAsManager {
    fn build_run_as(
        &self,
        _authentication: &Authentication,
        _descriptor: &RequestDescriptor,
        _attributes: &[ConfigAttribute],
    ) -> Option<Authentication> {
        None
    }

    fn supports(&self, _attribute: &ConfigAttribute) -> bool {
        false
    }

    fn supports_kind(&self, _kind: DescriptorKind) -> bool {
        true
    }
}

/// Substitutes an identity for every descriptor that requires a
/// `RUN_AS_*` attribute.
///
/// The substitute keeps the caller's principal and authorities and gains
/// `<role_prefix><attribute>` for each run-as attribute
/// (`RUN_AS_AUDITOR` becomes `ROLE_RUN_AS_AUDITOR`).
#[derive(Debug, Clone)]
pub struct RunAsManagerImpl {
    role_prefix: String,
}

impl RunAsManagerImpl {
    #[must_use]
    pub fn new(role_prefix: impl Into<String>) -> Self {
        Self {
            role_prefix: role_prefix.into(),
        }
    }
}

impl Default for RunAsManagerImpl {
    fn default() -> Self {
        Self::new(DEFAULT_ROLE_PREFIX)
    }
}

impl RunAsManager for RunAsManagerImpl {
    fn build_run_as(
        &self,
        authentication: &Authentication,
        _descriptor: &RequestDescriptor,
        attributes: &[ConfigAttribute],
    ) -> Option<Authentication> {
        let extra: Vec<GrantedAuthority> = attributes
            .iter()
            .filter(|a| self.supports(a))
            .map(|a| GrantedAuthority::new(format!("{}{a}", self.role_prefix)))
            .collect();
        if extra.is_empty() {
            return None;
        }

        Some(
            Authentication::builder(authentication.principal())
                .authorities(authentication.authorities().iter().cloned())
                .authorities(extra)
                .kind(AuthenticationKind::RunAs {
                    original_principal: authentication.principal().to_owned(),
                })
                .authenticated()
                .build(),
        )
    }

    fn supports(&self, attribute: &ConfigAttribute) -> bool {
        attribute.as_str().starts_with(RUN_AS_PREFIX)
    }

    fn supports_kind(&self, _kind: DescriptorKind) -> bool {
        true
    }
}
