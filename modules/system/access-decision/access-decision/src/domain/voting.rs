//! Voting-based decision manager.

use std::fmt;
use std::sync::Arc;

use access_decision_sdk::{
    AccessDecisionManager, AccessDecisionVoter, AccessError, ConfigAttribute, DescriptorKind,
    RequestDescriptor, Vote,
};
use tracing::debug;
use webguard_security::Authentication;

const ACCESS_IS_DENIED: &str = "Access is denied";

/// How voter outcomes combine into one decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VotingStrategy {
    /// Any grant wins; otherwise any deny denies.
    Affirmative,
    /// Majority of non-abstaining votes; a non-zero tie resolves to
    /// `allow_if_equal_votes`.
    Consensus { allow_if_equal_votes: bool },
    /// Each attribute is voted on separately; a single deny denies.
    Unanimous,
}

/// Composite [`AccessDecisionManager`] over a fixed set of voters.
///
/// When every voter abstains the outcome is `allow_if_all_abstain`
/// (deny by default).
pub struct VotingDecisionManager {
    voters: Vec<Arc<dyn AccessDecisionVoter>>,
    strategy: VotingStrategy,
    allow_if_all_abstain: bool,
}

impl VotingDecisionManager {
    /// # Errors
    ///
    /// - `Configuration` if `voters` is empty
    pub fn new(
        voters: Vec<Arc<dyn AccessDecisionVoter>>,
        strategy: VotingStrategy,
    ) -> Result<Self, AccessError> {
        if voters.is_empty() {
            return Err(AccessError::configuration(
                "a voting decision manager needs at least one voter",
            ));
        }
        Ok(Self {
            voters,
            strategy,
            allow_if_all_abstain: false,
        })
    }

    #[must_use]
    pub fn allow_if_all_abstain(mut self, allow: bool) -> Self {
        self.allow_if_all_abstain = allow;
        self
    }

    #[must_use]
    pub fn strategy(&self) -> VotingStrategy {
        self.strategy
    }

    fn all_abstained(&self) -> Result<(), AccessError> {
        if self.allow_if_all_abstain {
            Ok(())
        } else {
            Err(AccessError::denied(ACCESS_IS_DENIED))
        }
    }

    fn affirmative(
        &self,
        authentication: &Authentication,
        descriptor: &RequestDescriptor,
        attributes: &[ConfigAttribute],
    ) -> Result<(), AccessError> {
        let mut deny = 0usize;
        for (index, voter) in self.voters.iter().enumerate() {
            let vote = voter.vote(authentication, descriptor, attributes);
            debug!(voter = index, ?vote, "Voter returned");
            match vote {
                Vote::Granted => return Ok(()),
                Vote::Denied => deny += 1,
                Vote::Abstain => {}
            }
        }

        if deny > 0 {
            return Err(AccessError::denied(ACCESS_IS_DENIED));
        }
        self.all_abstained()
    }

    fn consensus(
        &self,
        authentication: &Authentication,
        descriptor: &RequestDescriptor,
        attributes: &[ConfigAttribute],
        allow_if_equal_votes: bool,
    ) -> Result<(), AccessError> {
        let (mut grant, mut deny) = (0usize, 0usize);
        for (index, voter) in self.voters.iter().enumerate() {
            let vote = voter.vote(authentication, descriptor, attributes);
            debug!(voter = index, ?vote, "Voter returned");
            match vote {
                Vote::Granted => grant += 1,
                Vote::Denied => deny += 1,
                Vote::Abstain => {}
            }
        }

        if grant == 0 && deny == 0 {
            return self.all_abstained();
        }
        let granted = match grant.cmp(&deny) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => allow_if_equal_votes,
        };
        if granted {
            Ok(())
        } else {
            Err(AccessError::denied(ACCESS_IS_DENIED))
        }
    }

    fn unanimous(
        &self,
        authentication: &Authentication,
        descriptor: &RequestDescriptor,
        attributes: &[ConfigAttribute],
    ) -> Result<(), AccessError> {
        let mut grant = 0usize;
        for attribute in attributes {
            let single = std::slice::from_ref(attribute);
            for (index, voter) in self.voters.iter().enumerate() {
                let vote = voter.vote(authentication, descriptor, single);
                debug!(voter = index, %attribute, ?vote, "Voter returned");
                match vote {
                    Vote::Granted => grant += 1,
                    Vote::Denied => return Err(AccessError::denied(ACCESS_IS_DENIED)),
                    Vote::Abstain => {}
                }
            }
        }

        if grant > 0 {
            return Ok(());
        }
        self.all_abstained()
    }
}

impl AccessDecisionManager for VotingDecisionManager {
    fn decide(
        &self,
        authentication: &Authentication,
        descriptor: &RequestDescriptor,
        attributes: &[ConfigAttribute],
    ) -> Result<(), AccessError> {
        match self.strategy {
            VotingStrategy::Affirmative => self.affirmative(authentication, descriptor, attributes),
            VotingStrategy::Consensus {
                allow_if_equal_votes,
            } => self.consensus(authentication, descriptor, attributes, allow_if_equal_votes),
            VotingStrategy::Unanimous => self.unanimous(authentication, descriptor, attributes),
        }
    }

    fn supports(&self, attribute: &ConfigAttribute) -> bool {
        self.voters.iter().any(|v| v.supports(attribute))
    }

    fn supports_kind(&self, kind: DescriptorKind) -> bool {
        self.voters.iter().all(|v| v.supports_kind(kind))
    }
}

impl fmt::Debug for VotingDecisionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VotingDecisionManager")
            .field("voters", &self.voters.len())
            .field("strategy", &self.strategy)
            .field("allow_if_all_abstain", &self.allow_if_all_abstain)
            .finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::domain::voters::RoleVoter;
    use access_decision_sdk::Vote::{Abstain, Denied, Granted};

    /// Voter with a fixed answer, supporting every attribute.
    struct Fixed(Vote);

    impl AccessDecisionVoter for Fixed {
        fn supports(&self, _attribute: &ConfigAttribute) -> bool {
            true
        }

        fn supports_kind(&self, _kind: DescriptorKind) -> bool {
            true
        }

        fn vote(&self, _: &Authentication, _: &RequestDescriptor, _: &[ConfigAttribute]) -> Vote {
            self.0
        }
    }

    /// Voter that only cares about the web descriptor kind.
    struct WebOnly;

    impl AccessDecisionVoter for WebOnly {
        fn supports(&self, _attribute: &ConfigAttribute) -> bool {
            false
        }

        fn supports_kind(&self, kind: DescriptorKind) -> bool {
            kind == DescriptorKind::Web
        }

        fn vote(&self, _: &Authentication, _: &RequestDescriptor, _: &[ConfigAttribute]) -> Vote {
            Vote::Abstain
        }
    }

    fn manager(votes: &[Vote], strategy: VotingStrategy) -> VotingDecisionManager {
        let voters: Vec<Arc<dyn AccessDecisionVoter>> = votes
            .iter()
            .map(|v| Arc::new(Fixed(*v)) as Arc<dyn AccessDecisionVoter>)
            .collect();
        VotingDecisionManager::new(voters, strategy).unwrap()
    }

    fn decide(manager: &VotingDecisionManager, attributes: &[&str]) -> Result<(), AccessError> {
        let auth = Authentication::builder("test")
            .authority("ROLE_USER")
            .authenticated()
            .build();
        let attributes: Vec<ConfigAttribute> =
            attributes.iter().map(|a| ConfigAttribute::from(*a)).collect();
        manager.decide(&auth, &RequestDescriptor::web("/foo", "GET"), &attributes)
    }

    #[test]
    fn empty_voters_rejected() {
        let err = VotingDecisionManager::new(vec![], VotingStrategy::Affirmative).unwrap_err();
        assert!(matches!(err, AccessError::Configuration(_)));
    }

    #[test]
    fn affirmative() {
        let s = VotingStrategy::Affirmative;
        assert!(decide(&manager(&[Denied, Granted], s), &["X"]).is_ok());
        assert!(decide(&manager(&[Denied, Abstain], s), &["X"]).is_err());
        assert!(decide(&manager(&[Abstain, Abstain], s), &["X"]).is_err());
        assert!(
            decide(
                &manager(&[Abstain, Abstain], s).allow_if_all_abstain(true),
                &["X"]
            )
            .is_ok()
        );
    }

    #[test]
    fn consensus() {
        let deny_ties = VotingStrategy::Consensus {
            allow_if_equal_votes: false,
        };
        let allow_ties = VotingStrategy::Consensus {
            allow_if_equal_votes: true,
        };

        assert!(decide(&manager(&[Granted, Granted, Denied], deny_ties), &["X"]).is_ok());
        assert!(decide(&manager(&[Granted, Denied, Denied], allow_ties), &["X"]).is_err());
        assert!(decide(&manager(&[Granted, Denied], deny_ties), &["X"]).is_err());
        assert!(decide(&manager(&[Granted, Denied], allow_ties), &["X"]).is_ok());
        assert!(decide(&manager(&[Abstain], allow_ties), &["X"]).is_err());
    }

    #[test]
    fn unanimous() {
        let s = VotingStrategy::Unanimous;
        assert!(decide(&manager(&[Granted, Granted], s), &["X", "Y"]).is_ok());
        assert!(decide(&manager(&[Granted, Denied], s), &["X"]).is_err());
        assert!(decide(&manager(&[Granted, Abstain], s), &["X"]).is_ok());
        assert!(decide(&manager(&[Abstain], s), &["X"]).is_err());
    }

    #[test]
    fn unanimous_votes_each_attribute_separately() {
        // RoleVoter grants when any listed role is held; unanimous asks per role.
        let role: Arc<dyn AccessDecisionVoter> = Arc::new(RoleVoter::default());
        let affirmative =
            VotingDecisionManager::new(vec![Arc::clone(&role)], VotingStrategy::Affirmative)
                .unwrap();
        let unanimous = VotingDecisionManager::new(vec![role], VotingStrategy::Unanimous).unwrap();

        assert!(decide(&affirmative, &["ROLE_USER", "ROLE_ADMIN"]).is_ok());
        assert!(decide(&unanimous, &["ROLE_USER", "ROLE_ADMIN"]).is_err());
        assert!(decide(&unanimous, &["ROLE_USER"]).is_ok());
    }

    #[test]
    fn denial_is_access_denied() {
        let err = decide(&manager(&[Denied], VotingStrategy::Affirmative), &["X"]).unwrap_err();
        assert!(err.is_access_denied());
    }

    #[test]
    fn supports_any_voter_attribute_and_all_voter_kinds() {
        let voters: Vec<Arc<dyn AccessDecisionVoter>> =
            vec![Arc::new(RoleVoter::default()), Arc::new(WebOnly)];
        let manager = VotingDecisionManager::new(voters, VotingStrategy::Affirmative).unwrap();

        assert!(manager.supports(&"ROLE_ADMIN".into()));
        assert!(!manager.supports(&"MOCK_INDEX".into()));
        assert!(manager.supports_kind(DescriptorKind::Web));
        assert!(!manager.supports_kind(DescriptorKind::Method));
    }
}
