//! Event sink that writes authorization events to the tracing pipeline.

use access_decision_sdk::{AuthorizationEvent, EventSink};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn publish(&self, event: &AuthorizationEvent) {
        match event {
            AuthorizationEvent::Granted {
                descriptor,
                principal,
                attributes,
            } => info!(%descriptor, %principal, ?attributes, "Authorization granted"),
            AuthorizationEvent::Denied {
                descriptor,
                principal,
                attributes,
                reason,
            } => warn!(%descriptor, %principal, ?attributes, %reason, "Authorization denied"),
            AuthorizationEvent::PublicInvocation { descriptor } => {
                debug!(%descriptor, "Public invocation");
            }
            AuthorizationEvent::CredentialsNotFound {
                descriptor,
                attributes,
            } => warn!(%descriptor, ?attributes, "Credentials not found"),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use access_decision_sdk::RequestDescriptor;
    use tracing_test::traced_test;

    use super::*;

    #[test]
    #[traced_test]
    fn denial_is_logged_with_reason() {
        TracingEventSink.publish(&AuthorizationEvent::Denied {
            descriptor: RequestDescriptor::web("/admin", "GET"),
            principal: "bob".to_owned(),
            attributes: vec!["ROLE_ADMIN".into()],
            reason: "Access is denied".to_owned(),
        });

        assert!(logs_contain("Authorization denied"));
        assert!(logs_contain("bob"));
        assert!(logs_contain("GET /admin"));
    }

    #[test]
    #[traced_test]
    fn grant_is_logged() {
        TracingEventSink.publish(&AuthorizationEvent::Granted {
            descriptor: RequestDescriptor::web("/home", "GET"),
            principal: "alice".to_owned(),
            attributes: vec!["ROLE_USER".into()],
        });

        assert!(logs_contain("Authorization granted"));
        assert!(logs_contain("alice"));
    }
}
