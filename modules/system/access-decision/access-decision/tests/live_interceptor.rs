#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Live-path behaviour: events, re-authentication and unconfigured policy.

use std::sync::Arc;

use access_decision::{
    AccessDecision, AccessDecisionConfig, Authorization, RuleConfig, UnconfiguredPolicy,
};
use access_decision_sdk::{
    AccessError, AuthenticationManager, AuthorizationEvent, ConfigAttribute, EventSink,
    RequestDescriptor,
};
use parking_lot::Mutex;
use secrecy::ExposeSecret as _;
use webguard_security::{Authentication, RequestScope, context};

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<AuthorizationEvent>>,
}

impl RecordingSink {
    fn take(&self) -> Vec<AuthorizationEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, event: &AuthorizationEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Accepts `secret` as the only valid password and grants `ROLE_USER`.
#[derive(Default)]
struct PasswordManager {
    calls: Mutex<u32>,
}

impl AuthenticationManager for PasswordManager {
    fn authenticate(&self, authentication: &Authentication) -> Result<Authentication, AccessError> {
        *self.calls.lock() += 1;
        match authentication.credentials() {
            Some(password) if password.expose_secret() == "secret" => {
                let mut verified = Authentication::builder(authentication.principal())
                    .authority("ROLE_USER")
                    .authenticated()
                    .build();
                verified.erase_credentials();
                Ok(verified)
            }
            _ => Err(AccessError::BadCredentials(format!(
                "bad credentials for {}",
                authentication.principal()
            ))),
        }
    }
}

fn rule(pattern: &str, attributes: &[&str]) -> RuleConfig {
    RuleConfig {
        pattern: Some(pattern.to_owned()),
        attributes: attributes.iter().map(|a| (*a).to_owned()).collect(),
        ..RuleConfig::default()
    }
}

fn config() -> AccessDecisionConfig {
    AccessDecisionConfig {
        publish_authorization_success: true,
        rules: vec![
            rule("/admin/**", &["ROLE_ADMIN"]),
            rule("/public/**", &[]),
            rule("/app/**", &["ROLE_USER"]),
        ],
        ..AccessDecisionConfig::default()
    }
}

fn setup(
    cfg: &AccessDecisionConfig,
) -> (AccessDecision, Arc<RecordingSink>, Arc<PasswordManager>) {
    let sink = Arc::new(RecordingSink::default());
    let manager = Arc::new(PasswordManager::default());
    let module = AccessDecision::init(
        cfg,
        Arc::clone(&sink) as Arc<dyn EventSink>,
        Some(Arc::clone(&manager) as Arc<dyn AuthenticationManager>),
    )
    .unwrap();
    (module, sink, manager)
}

fn user() -> Arc<Authentication> {
    Arc::new(
        Authentication::builder("alice")
            .authority("ROLE_USER")
            .authenticated()
            .build(),
    )
}

#[test]
fn grant_publishes_granted_event() {
    let (module, sink, _) = setup(&config());
    let _scope = RequestScope::enter(Some(user()));

    let outcome = module
        .interceptor()
        .authorize(&RequestDescriptor::web("/app/home", "GET"))
        .unwrap();

    assert_eq!(
        outcome,
        Authorization::Granted {
            attributes: vec!["ROLE_USER".into()]
        }
    );
    let events = sink.take();
    assert!(matches!(
        events.as_slice(),
        [AuthorizationEvent::Granted { principal, .. }] if principal == "alice"
    ));
}

#[test]
fn grant_is_silent_unless_enabled() {
    let cfg = AccessDecisionConfig {
        publish_authorization_success: false,
        ..config()
    };
    let (module, sink, _) = setup(&cfg);
    let _scope = RequestScope::enter(Some(user()));

    module
        .interceptor()
        .authorize(&RequestDescriptor::web("/app/home", "GET"))
        .unwrap();

    assert!(sink.take().is_empty());
}

#[test]
fn denial_publishes_denied_event_and_reraises() {
    let (module, sink, _) = setup(&config());
    let _scope = RequestScope::enter(Some(user()));

    let err = module
        .interceptor()
        .authorize(&RequestDescriptor::web("/admin/users", "DELETE"))
        .unwrap_err();

    assert!(err.is_access_denied());
    let events = sink.take();
    assert!(matches!(
        events.as_slice(),
        [AuthorizationEvent::Denied { principal, attributes, .. }]
            if principal == "alice" && attributes == &[ConfigAttribute::new("ROLE_ADMIN")]
    ));
}

#[test]
fn public_invocation_needs_no_identity() {
    let (module, sink, _) = setup(&config());
    context::clear();

    let outcome = module
        .interceptor()
        .authorize(&RequestDescriptor::web("/public/logo.png", "GET"))
        .unwrap();

    assert_eq!(outcome, Authorization::Public);
    assert!(matches!(
        sink.take().as_slice(),
        [AuthorizationEvent::PublicInvocation { .. }]
    ));
}

#[test]
fn missing_identity_publishes_credentials_not_found() {
    let (module, sink, _) = setup(&config());
    context::clear();

    let err = module
        .interceptor()
        .authorize(&RequestDescriptor::web("/app/home", "GET"))
        .unwrap_err();

    assert_eq!(err, AccessError::AuthenticationRequired);
    assert!(matches!(
        sink.take().as_slice(),
        [AuthorizationEvent::CredentialsNotFound { .. }]
    ));
}

#[test]
fn unauthenticated_identity_is_verified_and_stored() {
    let (module, _, manager) = setup(&config());
    let _scope = RequestScope::enter(Some(Arc::new(
        Authentication::builder("bob")
            .credentials("secret".to_owned())
            .build(),
    )));

    module
        .interceptor()
        .authorize(&RequestDescriptor::web("/app/home", "GET"))
        .unwrap();

    assert_eq!(*manager.calls.lock(), 1);
    let current = context::current().unwrap();
    assert_eq!(current.principal(), "bob");
    assert!(current.is_authenticated());
    assert!(current.has_authority("ROLE_USER"));
    assert!(current.credentials().is_none());
}

#[test]
fn bad_credentials_propagate() {
    let (module, sink, _) = setup(&config());
    let _scope = RequestScope::enter(Some(Arc::new(
        Authentication::builder("bob")
            .credentials("wrong".to_owned())
            .build(),
    )));

    let err = module
        .interceptor()
        .authorize(&RequestDescriptor::web("/app/home", "GET"))
        .unwrap_err();

    assert!(matches!(err, AccessError::BadCredentials(_)));
    assert!(sink.take().is_empty());
    assert!(!context::current().unwrap().is_authenticated());
}

#[test]
fn always_reauthenticate_calls_manager_for_authenticated_identity() {
    let cfg = AccessDecisionConfig {
        always_reauthenticate: true,
        ..config()
    };
    let (module, _, manager) = setup(&cfg);
    let _scope = RequestScope::enter(Some(Arc::new(
        Authentication::builder("carol")
            .credentials("secret".to_owned())
            .authenticated()
            .build(),
    )));

    module
        .interceptor()
        .authorize(&RequestDescriptor::web("/app/home", "GET"))
        .unwrap();

    assert_eq!(*manager.calls.lock(), 1);
}

#[test]
fn evaluator_never_reauthenticates() {
    let (module, sink, manager) = setup(&config());
    let unverified = Authentication::builder("bob")
        .credentials("secret".to_owned())
        .build();

    let allowed = module
        .evaluator()
        .is_allowed_uri(None, "/app/home", None, Some(&unverified))
        .unwrap();

    assert!(!allowed);
    assert_eq!(*manager.calls.lock(), 0);
    assert!(sink.take().is_empty());
}

#[test]
fn invoke_runs_operation_only_on_grant() {
    let (module, _, _) = setup(&config());
    let _scope = RequestScope::enter(Some(user()));
    let interceptor = module.interceptor();

    let value = interceptor
        .invoke(&RequestDescriptor::web("/app/report", "GET"), || 42)
        .unwrap();
    assert_eq!(value, 42);

    let mut ran = false;
    let err = interceptor
        .invoke(&RequestDescriptor::web("/admin/report", "GET"), || ran = true)
        .unwrap_err();
    assert!(err.is_access_denied());
    assert!(!ran);
}

#[test]
fn unconfigured_request_is_rejected_by_default() {
    let (module, sink, _) = setup(&config());
    let _scope = RequestScope::enter(Some(user()));

    let err = module
        .interceptor()
        .authorize(&RequestDescriptor::web("/elsewhere", "GET"))
        .unwrap_err();

    assert!(err.is_access_denied());
    assert!(matches!(
        sink.take().as_slice(),
        [AuthorizationEvent::Denied { .. }]
    ));
    assert!(
        !module
            .evaluator()
            .is_allowed_uri(None, "/elsewhere", None, Some(&user()))
            .unwrap()
    );
}

#[test]
fn unconfigured_request_can_be_allowed() {
    let cfg = AccessDecisionConfig {
        unconfigured: UnconfiguredPolicy::Allow,
        ..config()
    };
    let (module, _, _) = setup(&cfg);
    context::clear();

    let outcome = module
        .interceptor()
        .authorize(&RequestDescriptor::web("/elsewhere", "GET"))
        .unwrap();

    assert_eq!(outcome, Authorization::Unconfigured);
}

#[test]
fn run_as_grants_through_substituted_role() {
    let mut cfg = config();
    cfg.run_as.enabled = true;
    cfg.rules.insert(
        0,
        rule("/audit/**", &["ROLE_RUN_AS_AUDITOR", "RUN_AS_AUDITOR"]),
    );
    let (module, _, _) = setup(&cfg);
    let _scope = RequestScope::enter(Some(user()));

    let outcome = module
        .interceptor()
        .authorize(&RequestDescriptor::web("/audit/log", "GET"));

    assert!(outcome.is_ok());
    assert_eq!(context::current().unwrap().principal(), "alice");
    assert!(!context::current().unwrap().has_authority("ROLE_RUN_AS_AUDITOR"));
}

#[test]
fn run_as_rule_still_requires_a_held_role() {
    let mut cfg = config();
    cfg.run_as.enabled = true;
    cfg.rules.insert(0, rule("/audit/**", &["ROLE_ADMIN", "RUN_AS_AUDITOR"]));
    let (module, _, _) = setup(&cfg);
    let _scope = RequestScope::enter(Some(user()));

    let err = module
        .interceptor()
        .authorize(&RequestDescriptor::web("/audit/log", "GET"))
        .unwrap_err();

    assert!(err.is_access_denied());
    assert_eq!(context::current().unwrap().principal(), "alice");
}
