//! Authorization interceptor.
//!
//! [`SecurityInterceptor`] runs the pipeline for a request descriptor:
//! metadata lookup → optional run-as substitution → decision → restore.
//!
//! The live path ([`SecurityInterceptor::authorize`]) reads the ambient
//! identity, may re-authenticate it and publishes events. The evaluation
//! path (used by the privilege evaluator) takes an explicit identity and has
//! no side effects beyond the scoped run-as window.

use std::fmt;
use std::sync::Arc;

use access_decision_sdk::{
    AccessDecisionManager, AccessError, AuthenticationManager, AuthorizationEvent,
    ConfigAttribute, DescriptorKind, EventSink, MetadataSource, NoopEventSink, RequestDescriptor,
    RunAsManager,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use webguard_security::{Authentication, ContextSwap, context};

use crate::domain::run_as::NullRunAsManager;

/// What to do with a descriptor no metadata rule matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnconfiguredPolicy {
    /// Deny access (fail closed).
    #[default]
    Reject,
    /// Grant access without consulting the decision manager.
    Allow,
}

/// Interceptor behaviour switches.
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct InterceptorSettings {
    pub unconfigured: UnconfiguredPolicy,
    /// Treat descriptors with no required attributes as a configuration error.
    pub reject_public_invocations: bool,
    /// Verify the ambient identity on every live invocation.
    pub always_reauthenticate: bool,
    /// Publish `Granted` events (denials are always published).
    pub publish_authorization_success: bool,
    /// Check at build time that every attribute the metadata source can
    /// emit is understood by the decision or run-as manager.
    pub validate_config_attributes: bool,
}

impl Default for InterceptorSettings {
    fn default() -> Self {
        Self {
            unconfigured: UnconfiguredPolicy::Reject,
            reject_public_invocations: false,
            always_reauthenticate: false,
            publish_authorization_success: false,
            validate_config_attributes: true,
        }
    }
}

/// Successful outcome of the live path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    /// The decision manager granted access.
    Granted { attributes: Vec<ConfigAttribute> },
    /// The descriptor requires no attributes.
    Public,
    /// No rule matched and the unconfigured policy allows it.
    Unconfigured,
}

enum Lookup {
    Attributes(Vec<ConfigAttribute>),
    Public,
    Unconfigured,
}

pub struct SecurityInterceptor {
    kind: DescriptorKind,
    metadata_source: Arc<dyn MetadataSource>,
    decision_manager: Arc<dyn AccessDecisionManager>,
    run_as_manager: Arc<dyn RunAsManager>,
    authentication_manager: Option<Arc<dyn AuthenticationManager>>,
    event_sink: Arc<dyn EventSink>,
    settings: InterceptorSettings,
}

impl SecurityInterceptor {
    #[must_use]
    pub fn builder() -> SecurityInterceptorBuilder {
        SecurityInterceptorBuilder::default()
    }

    /// Descriptor kind this interceptor was validated for.
    #[must_use]
    pub fn descriptor_kind(&self) -> DescriptorKind {
        self.kind
    }

    #[must_use]
    pub fn settings(&self) -> &InterceptorSettings {
        &self.settings
    }

    #[must_use]
    pub fn metadata_source(&self) -> &Arc<dyn MetadataSource> {
        &self.metadata_source
    }

    /// Check that every attribute is understood by the decision manager or
    /// the run-as manager.
    ///
    /// # Errors
    ///
    /// - `Configuration` listing the unsupported attributes
    pub fn validate_attributes(&self, attributes: &[ConfigAttribute]) -> Result<(), AccessError> {
        let unsupported: Vec<&str> = attributes
            .iter()
            .filter(|a| !self.decision_manager.supports(a) && !self.run_as_manager.supports(a))
            .map(ConfigAttribute::as_str)
            .collect();

        if unsupported.is_empty() {
            Ok(())
        } else {
            Err(AccessError::configuration(format!(
                "unsupported configuration attributes: {unsupported:?}"
            )))
        }
    }

    /// Authorize the ambient identity for `descriptor`.
    ///
    /// # Errors
    ///
    /// - `AccessDenied` if access is refused
    /// - `AuthenticationRequired` if attributes apply and no identity is set
    /// - `BadCredentials` if re-authentication fails
    /// - any error raised by a collaborator
    #[tracing::instrument(skip_all, fields(descriptor = %descriptor))]
    pub fn authorize(&self, descriptor: &RequestDescriptor) -> Result<Authorization, AccessError> {
        let attributes = match self.lookup(descriptor) {
            Ok(Lookup::Attributes(attributes)) => attributes,
            Ok(Lookup::Public) => {
                self.event_sink.publish(&AuthorizationEvent::PublicInvocation {
                    descriptor: descriptor.clone(),
                });
                return Ok(Authorization::Public);
            }
            Ok(Lookup::Unconfigured) => {
                debug!("No rule matched, unconfigured access allowed");
                return Ok(Authorization::Unconfigured);
            }
            Err(err) => {
                if let AccessError::AccessDenied { reason } = &err {
                    self.publish_denied(descriptor, context::current().as_deref(), &[], reason);
                }
                return Err(err);
            }
        };

        let Some(current) = context::current() else {
            self.event_sink
                .publish(&AuthorizationEvent::CredentialsNotFound {
                    descriptor: descriptor.clone(),
                    attributes,
                });
            return Err(AccessError::AuthenticationRequired);
        };
        let authentication = self.authenticate_if_required(current)?;

        match self.decide(&authentication, descriptor, &attributes) {
            Ok(()) => {
                debug!(principal = %authentication.principal(), "Authorization successful");
                if self.settings.publish_authorization_success {
                    self.event_sink.publish(&AuthorizationEvent::Granted {
                        descriptor: descriptor.clone(),
                        principal: authentication.principal().to_owned(),
                        attributes: attributes.clone(),
                    });
                }
                Ok(Authorization::Granted { attributes })
            }
            Err(err) => {
                if let AccessError::AccessDenied { reason } = &err {
                    self.publish_denied(descriptor, Some(&*authentication), &attributes, reason);
                }
                Err(err)
            }
        }
    }

    /// Authorize, then run the protected operation.
    ///
    /// # Errors
    ///
    /// Same as [`SecurityInterceptor::authorize`]; the operation is not run
    /// on error.
    pub fn invoke<T>(
        &self,
        descriptor: &RequestDescriptor,
        operation: impl FnOnce() -> T,
    ) -> Result<T, AccessError> {
        self.authorize(descriptor)?;
        Ok(operation())
    }

    /// Side-effect free pass for an explicit identity: no events, no
    /// re-authentication, ambient identity only touched inside the run-as
    /// window.
    pub(crate) fn evaluate(
        &self,
        descriptor: &RequestDescriptor,
        authentication: Option<&Authentication>,
    ) -> Result<(), AccessError> {
        match self.lookup(descriptor)? {
            Lookup::Public | Lookup::Unconfigured => Ok(()),
            Lookup::Attributes(attributes) => {
                let authentication = authentication.ok_or(AccessError::AuthenticationRequired)?;
                self.decide(authentication, descriptor, &attributes)
            }
        }
    }

    fn lookup(&self, descriptor: &RequestDescriptor) -> Result<Lookup, AccessError> {
        match self.metadata_source.attributes_for(descriptor) {
            Ok(attributes) if attributes.is_empty() => {
                if self.settings.reject_public_invocations {
                    Err(AccessError::configuration(format!(
                        "secure object invocation {descriptor} was denied as public invocations are not allowed"
                    )))
                } else {
                    Ok(Lookup::Public)
                }
            }
            Ok(attributes) => Ok(Lookup::Attributes(attributes)),
            Err(AccessError::NoMatchingRule { descriptor: unmatched }) => {
                match self.settings.unconfigured {
                    UnconfiguredPolicy::Reject => Err(AccessError::denied(format!(
                        "no authorization rule configured for {unmatched}"
                    ))),
                    UnconfiguredPolicy::Allow => Ok(Lookup::Unconfigured),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// SUBSTITUTE → DECIDE → RESTORE. The swap guard reverts the ambient
    /// identity on every exit path.
    fn decide(
        &self,
        authentication: &Authentication,
        descriptor: &RequestDescriptor,
        attributes: &[ConfigAttribute],
    ) -> Result<(), AccessError> {
        let run_as = self
            .run_as_manager
            .build_run_as(authentication, descriptor, attributes)
            .map(Arc::new);

        let _swap = run_as.as_ref().map(|substitute| {
            debug!(
                principal = %authentication.principal(),
                run_as = %substitute.principal(),
                "Switching to run-as identity"
            );
            ContextSwap::install(Arc::clone(substitute))
        });

        let effective = run_as.as_deref().unwrap_or(authentication);
        self.decision_manager.decide(effective, descriptor, attributes)
    }

    fn authenticate_if_required(
        &self,
        current: Arc<Authentication>,
    ) -> Result<Arc<Authentication>, AccessError> {
        if current.is_authenticated() && !self.settings.always_reauthenticate {
            return Ok(current);
        }

        let Some(manager) = &self.authentication_manager else {
            return Err(AccessError::configuration(
                "an authentication manager is required to verify the current identity",
            ));
        };

        let verified = Arc::new(manager.authenticate(&current)?);
        debug!(principal = %verified.principal(), "Re-authenticated current identity");
        context::set(Arc::clone(&verified));
        Ok(verified)
    }

    fn publish_denied(
        &self,
        descriptor: &RequestDescriptor,
        authentication: Option<&Authentication>,
        attributes: &[ConfigAttribute],
        reason: &str,
    ) {
        self.event_sink.publish(&AuthorizationEvent::Denied {
            descriptor: descriptor.clone(),
            principal: authentication
                .map(|a| a.principal().to_owned())
                .unwrap_or_default(),
            attributes: attributes.to_vec(),
            reason: reason.to_owned(),
        });
    }
}

impl fmt::Debug for SecurityInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityInterceptor")
            .field("kind", &self.kind)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Builder for [`SecurityInterceptor`]; validates the wiring in `build`.
pub struct SecurityInterceptorBuilder {
    kind: DescriptorKind,
    metadata_source: Option<Arc<dyn MetadataSource>>,
    decision_manager: Option<Arc<dyn AccessDecisionManager>>,
    run_as_manager: Arc<dyn RunAsManager>,
    authentication_manager: Option<Arc<dyn AuthenticationManager>>,
    event_sink: Arc<dyn EventSink>,
    settings: InterceptorSettings,
}

impl Default for SecurityInterceptorBuilder {
    fn default() -> Self {
        Self {
            kind: DescriptorKind::Web,
            metadata_source: None,
            decision_manager: None,
            run_as_manager: Arc::new(NullRunAsManager),
            authentication_manager: None,
            event_sink: Arc::new(NoopEventSink),
            settings: InterceptorSettings::default(),
        }
    }
}

impl SecurityInterceptorBuilder {
    /// Descriptor kind the interceptor will receive (default: `Web`).
    #[must_use]
    pub fn descriptor_kind(mut self, kind: DescriptorKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn metadata_source(mut self, source: Arc<dyn MetadataSource>) -> Self {
        self.metadata_source = Some(source);
        self
    }

    #[must_use]
    pub fn decision_manager(mut self, manager: Arc<dyn AccessDecisionManager>) -> Self {
        self.decision_manager = Some(manager);
        self
    }

    #[must_use]
    pub fn run_as_manager(mut self, manager: Arc<dyn RunAsManager>) -> Self {
        self.run_as_manager = manager;
        self
    }

    #[must_use]
    pub fn authentication_manager(mut self, manager: Arc<dyn AuthenticationManager>) -> Self {
        self.authentication_manager = Some(manager);
        self
    }

    #[must_use]
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    #[must_use]
    pub fn settings(mut self, settings: InterceptorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// # Errors
    ///
    /// - `Configuration` if a required collaborator is missing, a
    ///   collaborator does not handle the descriptor kind, or (with
    ///   `validate_config_attributes`) an attribute is unsupported
    #[tracing::instrument(skip_all, fields(kind = %self.kind))]
    pub fn build(self) -> Result<SecurityInterceptor, AccessError> {
        let metadata_source = self
            .metadata_source
            .ok_or_else(|| AccessError::configuration("a metadata source is required"))?;
        let decision_manager = self
            .decision_manager
            .ok_or_else(|| AccessError::configuration("an access decision manager is required"))?;

        if self.settings.always_reauthenticate && self.authentication_manager.is_none() {
            return Err(AccessError::configuration(
                "always_reauthenticate requires an authentication manager",
            ));
        }
        if !metadata_source.supports_kind(self.kind) {
            return Err(AccessError::configuration(format!(
                "metadata source does not support {} descriptors",
                self.kind
            )));
        }
        if !decision_manager.supports_kind(self.kind) {
            return Err(AccessError::configuration(format!(
                "access decision manager does not support {} descriptors",
                self.kind
            )));
        }
        if !self.run_as_manager.supports_kind(self.kind) {
            return Err(AccessError::configuration(format!(
                "run-as manager does not support {} descriptors",
                self.kind
            )));
        }

        let interceptor = SecurityInterceptor {
            kind: self.kind,
            metadata_source,
            decision_manager,
            run_as_manager: self.run_as_manager,
            authentication_manager: self.authentication_manager,
            event_sink: self.event_sink,
            settings: self.settings,
        };

        if interceptor.settings.validate_config_attributes {
            match interceptor.metadata_source.all_config_attributes() {
                Some(attributes) => {
                    interceptor.validate_attributes(&attributes)?;
                    info!(count = attributes.len(), "Validated configuration attributes");
                }
                None => debug!("Metadata source cannot enumerate its attributes"),
            }
        }

        Ok(interceptor)
    }
}
