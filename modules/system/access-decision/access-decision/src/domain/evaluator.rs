//! Read-only privilege evaluation over a configured interceptor.

use std::sync::Arc;

use access_decision_sdk::{AccessError, DescriptorKind, RequestDescriptor, WebRequest};
use tracing::debug;
use webguard_security::{Authentication, context};

use crate::domain::interceptor::SecurityInterceptor;

/// Answers "would this identity be allowed here?" for web requests.
///
/// Uses the interceptor's collaborators but never publishes events and
/// never re-authenticates. Only `AccessDenied` becomes `false`; every other
/// error is returned to the caller.
#[derive(Debug, Clone)]
pub struct PrivilegeEvaluator {
    interceptor: Arc<SecurityInterceptor>,
}

impl PrivilegeEvaluator {
    /// # Errors
    ///
    /// - `Configuration` if the interceptor does not handle web descriptors
    pub fn new(interceptor: Arc<SecurityInterceptor>) -> Result<Self, AccessError> {
        if interceptor.descriptor_kind() != DescriptorKind::Web {
            return Err(AccessError::configuration(format!(
                "privilege evaluation needs a web interceptor, got {}",
                interceptor.descriptor_kind()
            )));
        }
        Ok(Self { interceptor })
    }

    /// Whether `authentication` (or, when `None`, the ambient identity)
    /// may access `descriptor`.
    ///
    /// # Errors
    ///
    /// - `AuthenticationRequired` if attributes apply and no identity is available
    /// - any non-denial error raised along the pipeline
    #[tracing::instrument(skip_all, fields(descriptor = %descriptor))]
    pub fn is_allowed(
        &self,
        descriptor: &RequestDescriptor,
        authentication: Option<&Authentication>,
    ) -> Result<bool, AccessError> {
        let ambient;
        let authentication = match authentication {
            Some(explicit) => Some(explicit),
            None => {
                ambient = context::current();
                ambient.as_deref()
            }
        };

        match self.interceptor.evaluate(descriptor, authentication) {
            Ok(()) => Ok(true),
            Err(AccessError::AccessDenied { reason }) => {
                debug!(%reason, "Privilege evaluation denied");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    /// Evaluate an application-relative `uri` (query string allowed) under
    /// an optional context path. `method` defaults to `GET`.
    ///
    /// # Errors
    ///
    /// Same as [`PrivilegeEvaluator::is_allowed`].
    pub fn is_allowed_uri(
        &self,
        context_path: Option<&str>,
        uri: &str,
        method: Option<&str>,
        authentication: Option<&Authentication>,
    ) -> Result<bool, AccessError> {
        let descriptor = RequestDescriptor::from(WebRequest::synthetic(context_path, uri, method));
        self.is_allowed(&descriptor, authentication)
    }
}
