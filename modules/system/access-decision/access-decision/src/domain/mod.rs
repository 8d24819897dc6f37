//! Domain layer for the access-decision module.

pub mod evaluator;
pub mod events;
pub mod interceptor;
pub mod metadata;
pub mod run_as;
pub mod voters;
pub mod voting;

pub use evaluator::PrivilegeEvaluator;
pub use events::TracingEventSink;
pub use interceptor::{
    Authorization, InterceptorSettings, SecurityInterceptor, SecurityInterceptorBuilder,
    UnconfiguredPolicy,
};
pub use metadata::{MethodMetadataSource, PathMetadataSource, PathRule, RequestMatcher};
pub use run_as::{NullRunAsManager, RUN_AS_PREFIX, RunAsManagerImpl};
pub use voters::{AuthenticatedVoter, RoleVoter};
pub use voting::{VotingDecisionManager, VotingStrategy};
