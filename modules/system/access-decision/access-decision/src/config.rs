//! Configuration for the access-decision module.

use std::path::{Path, PathBuf};

use access_decision_sdk::{AccessError, ConfigAttribute};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};

use crate::domain::interceptor::{InterceptorSettings, UnconfiguredPolicy};
use crate::domain::metadata::{PathRule, RequestMatcher};
use crate::domain::voters::DEFAULT_ROLE_PREFIX;
use crate::domain::voting::VotingStrategy;

/// Environment variable prefix; nested keys are separated by `__`.
pub const ENV_PREFIX: &str = "WEBGUARD_";

/// Top-level keys read from the environment. Other `WEBGUARD_*` variables
/// belong to the deployment and are ignored.
const ENV_KEYS: &[&str] = &[
    "unconfigured",
    "reject_public_invocations",
    "always_reauthenticate",
    "publish_authorization_success",
    "validate_config_attributes",
    "require_match",
    "strategy",
    "allow_if_all_abstain",
    "allow_if_equal_votes",
    "role_prefix",
    "run_as",
    "rules",
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    Invalid(Box<figment::Error>),
}

/// Voting strategy selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    Affirmative,
    Consensus,
    Unanimous,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunAsConfig {
    /// Substitute identities for `RUN_AS_*` attributes.
    pub enabled: bool,
}

/// One path rule. `pattern` (Ant-style) and `regex` are mutually
/// exclusive; with neither the rule matches every request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuleConfig {
    pub pattern: Option<String>,
    pub regex: Option<String>,
    /// HTTP methods; empty matches every method.
    pub methods: Vec<String>,
    pub attributes: Vec<String>,
}

impl RuleConfig {
    /// # Errors
    ///
    /// - `Configuration` if both matchers are set or the matcher is invalid
    pub fn to_rule(&self) -> Result<PathRule, AccessError> {
        let matcher = match (&self.pattern, &self.regex) {
            (Some(_), Some(_)) => {
                return Err(AccessError::configuration(
                    "a rule may set either `pattern` or `regex`, not both",
                ));
            }
            (Some(pattern), None) => RequestMatcher::ant(pattern)?,
            (None, Some(regex)) => RequestMatcher::regex(regex)?,
            (None, None) => RequestMatcher::Any,
        };
        let attributes = self
            .attributes
            .iter()
            .map(|a| ConfigAttribute::new(a.as_str()))
            .collect();

        Ok(PathRule::new(matcher, attributes).with_methods(&self.methods))
    }
}

/// Configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[allow(clippy::struct_excessive_bools)] // flat switches mirror the YAML layout
pub struct AccessDecisionConfig {
    /// Policy for requests no rule matches.
    pub unconfigured: UnconfiguredPolicy,
    pub reject_public_invocations: bool,
    pub always_reauthenticate: bool,
    pub publish_authorization_success: bool,
    pub validate_config_attributes: bool,
    /// Unmatched requests yield "no matching rule" instead of "public".
    pub require_match: bool,
    pub strategy: StrategyKind,
    pub allow_if_all_abstain: bool,
    /// Consensus tie-breaker.
    pub allow_if_equal_votes: bool,
    pub role_prefix: String,
    pub run_as: RunAsConfig,
    /// Ordered rules, first match wins.
    pub rules: Vec<RuleConfig>,
}

impl Default for AccessDecisionConfig {
    fn default() -> Self {
        Self {
            unconfigured: UnconfiguredPolicy::Reject,
            reject_public_invocations: false,
            always_reauthenticate: false,
            publish_authorization_success: false,
            validate_config_attributes: true,
            require_match: true,
            strategy: StrategyKind::Affirmative,
            allow_if_all_abstain: false,
            allow_if_equal_votes: true,
            role_prefix: DEFAULT_ROLE_PREFIX.to_owned(),
            run_as: RunAsConfig::default(),
            rules: Vec::new(),
        }
    }
}

impl AccessDecisionConfig {
    /// Layer defaults, the optional YAML file and `WEBGUARD_*` environment
    /// variables, in that order. Only variables naming a configuration key
    /// are read; unknown keys in the file are rejected.
    ///
    /// # Errors
    ///
    /// - `NotFound` if `path` is given but does not exist
    /// - `Invalid` if a layer cannot be parsed into this struct
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            figment = figment.merge(Yaml::file(path));
        }

        let env = Env::prefixed(ENV_PREFIX)
            .filter(|key| {
                let head = key.as_str().split("__").next().unwrap_or_default();
                ENV_KEYS.iter().any(|known| head.eq_ignore_ascii_case(known))
            })
            .split("__");

        figment
            .merge(env)
            .extract()
            .map_err(|e| ConfigError::Invalid(Box::new(e)))
    }

    #[must_use]
    pub fn interceptor_settings(&self) -> InterceptorSettings {
        InterceptorSettings {
            unconfigured: self.unconfigured,
            reject_public_invocations: self.reject_public_invocations,
            always_reauthenticate: self.always_reauthenticate,
            publish_authorization_success: self.publish_authorization_success,
            validate_config_attributes: self.validate_config_attributes,
        }
    }

    #[must_use]
    pub fn voting_strategy(&self) -> VotingStrategy {
        match self.strategy {
            StrategyKind::Affirmative => VotingStrategy::Affirmative,
            StrategyKind::Consensus => VotingStrategy::Consensus {
                allow_if_equal_votes: self.allow_if_equal_votes,
            },
            StrategyKind::Unanimous => VotingStrategy::Unanimous,
        }
    }

    /// Compile the configured rules.
    ///
    /// # Errors
    ///
    /// - `Configuration` for the first invalid rule
    pub fn path_rules(&self) -> Result<Vec<PathRule>, AccessError> {
        self.rules.iter().map(RuleConfig::to_rule).collect()
    }
}
