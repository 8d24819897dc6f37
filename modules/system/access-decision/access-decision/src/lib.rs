//! Access Decision Module
//!
//! Request authorization core: metadata lookup, voting decision managers,
//! run-as substitution, the live [`SecurityInterceptor`] and the read-only
//! [`PrivilegeEvaluator`].
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod config;
pub mod domain;
pub mod module;

pub use config::{AccessDecisionConfig, ConfigError, RuleConfig, RunAsConfig, StrategyKind};
pub use domain::{
    Authorization, InterceptorSettings, PrivilegeEvaluator, SecurityInterceptor,
    TracingEventSink, UnconfiguredPolicy,
};
pub use module::AccessDecision;
