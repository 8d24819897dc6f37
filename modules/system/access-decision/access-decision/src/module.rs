//! Access decision module wiring.

use std::sync::Arc;

use access_decision_sdk::{
    AccessDecisionVoter, AccessError, AuthenticationManager, EventSink, MetadataSource,
    RunAsManager,
};
use tracing::info;

use crate::config::AccessDecisionConfig;
use crate::domain::evaluator::PrivilegeEvaluator;
use crate::domain::interceptor::SecurityInterceptor;
use crate::domain::metadata::PathMetadataSource;
use crate::domain::run_as::{NullRunAsManager, RunAsManagerImpl};
use crate::domain::voters::{AuthenticatedVoter, RoleVoter};
use crate::domain::voting::VotingDecisionManager;

/// Access decision module.
///
/// Builds the web interceptor from configuration:
/// 1. Compiles the path rules into a reloadable metadata source
/// 2. Wires a voting decision manager with role and authentication voters
/// 3. Selects the run-as manager
/// 4. Validates the result and exposes a privilege evaluator over it
#[derive(Debug, Clone)]
pub struct AccessDecision {
    interceptor: Arc<SecurityInterceptor>,
    evaluator: PrivilegeEvaluator,
    metadata: Arc<PathMetadataSource>,
}

impl AccessDecision {
    pub const MODULE_NAME: &'static str = "access-decision";

    /// # Errors
    ///
    /// - `Configuration` if a rule is invalid or the wiring fails validation
    #[tracing::instrument(skip_all, fields(strategy = ?cfg.strategy))]
    pub fn init(
        cfg: &AccessDecisionConfig,
        event_sink: Arc<dyn EventSink>,
        authentication_manager: Option<Arc<dyn AuthenticationManager>>,
    ) -> Result<Self, AccessError> {
        info!(rules = cfg.rules.len(), "Initializing {} module", Self::MODULE_NAME);

        let metadata = Arc::new(PathMetadataSource::new(
            cfg.path_rules()?,
            cfg.require_match,
        ));

        let voters: Vec<Arc<dyn AccessDecisionVoter>> = vec![
            Arc::new(RoleVoter::with_prefix(cfg.role_prefix.as_str())),
            Arc::new(AuthenticatedVoter),
        ];
        let decision_manager = VotingDecisionManager::new(voters, cfg.voting_strategy())?
            .allow_if_all_abstain(cfg.allow_if_all_abstain);

        let run_as_manager: Arc<dyn RunAsManager> = if cfg.run_as.enabled {
            Arc::new(RunAsManagerImpl::new(cfg.role_prefix.as_str()))
        } else {
            Arc::new(NullRunAsManager)
        };

        let mut builder = SecurityInterceptor::builder()
            .metadata_source(Arc::clone(&metadata) as Arc<dyn MetadataSource>)
            .decision_manager(Arc::new(decision_manager))
            .run_as_manager(run_as_manager)
            .event_sink(event_sink)
            .settings(cfg.interceptor_settings());
        if let Some(manager) = authentication_manager {
            builder = builder.authentication_manager(manager);
        }

        let interceptor = Arc::new(builder.build()?);
        let evaluator = PrivilegeEvaluator::new(Arc::clone(&interceptor))?;

        info!("{} module initialized successfully", Self::MODULE_NAME);

        Ok(Self {
            interceptor,
            evaluator,
            metadata,
        })
    }

    #[must_use]
    pub fn interceptor(&self) -> &Arc<SecurityInterceptor> {
        &self.interceptor
    }

    #[must_use]
    pub fn evaluator(&self) -> &PrivilegeEvaluator {
        &self.evaluator
    }

    #[must_use]
    pub fn metadata(&self) -> &Arc<PathMetadataSource> {
        &self.metadata
    }

    /// Replace the rule table from `cfg`. The current table stays active if
    /// the new rules fail to compile or use unsupported attributes.
    ///
    /// Only `rules` is reloaded; other settings require a fresh `init`.
    ///
    /// # Errors
    ///
    /// - `Configuration` if a rule is invalid
    pub fn reload(&self, cfg: &AccessDecisionConfig) -> Result<(), AccessError> {
        let rules = cfg.path_rules()?;
        if self.interceptor.settings().validate_config_attributes {
            let attributes: Vec<_> = rules
                .iter()
                .flat_map(|rule| rule.attributes().iter().cloned())
                .collect();
            self.interceptor.validate_attributes(&attributes)?;
        }
        self.metadata.reload(rules);
        Ok(())
    }
}
