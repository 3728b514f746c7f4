//! In-process consensus substrate for demo runs and tests.
//!
//! Replicas in one process share a bus behind a mutex. The first proposal
//! admitted for a round becomes the agreed outcome for every replica, which
//! satisfies the adapter contract: total order (one map entry per round),
//! validity (the entry was somebody's proposal), and liveness as long as at
//! least one replica keeps proposing. Networked substrates plug in behind
//! the same trait.

use crate::adapter::ConsensusAdapter;
use crate::error::ConsensusError;
use crate::outcome::RoundOutcome;
use crate::registry::{ParticipantId, Registry};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex};

struct SimShared {
    expected: BTreeSet<ParticipantId>,
    registered: BTreeSet<ParticipantId>,
    agreed: HashMap<u64, RoundOutcome>,
}

/// The shared bus. Clone-cheap; hand one `handle` per replica.
#[derive(Clone)]
pub struct SimConsensus {
    inner: Arc<Mutex<SimShared>>,
}

impl SimConsensus {
    pub fn new(registry: &Registry) -> Self {
        let expected = registry
            .canonical_order()
            .iter()
            .map(|p| p.id.clone())
            .collect();
        Self {
            inner: Arc::new(Mutex::new(SimShared {
                expected,
                registered: BTreeSet::new(),
                agreed: HashMap::new(),
            })),
        }
    }

    pub fn handle(&self, id: ParticipantId) -> SimHandle {
        SimHandle {
            inner: Arc::clone(&self.inner),
            id,
            delivered: HashSet::new(),
        }
    }

    /// Test/observer access to the agreed outcome for a round.
    pub fn agreed_for(&self, round: u64) -> Option<RoundOutcome> {
        let shared = self.inner.lock().expect("sim bus lock");
        shared.agreed.get(&round).cloned()
    }
}

/// One replica's view of the bus.
pub struct SimHandle {
    inner: Arc<Mutex<SimShared>>,
    id: ParticipantId,
    delivered: HashSet<u64>,
}

impl ConsensusAdapter for SimHandle {
    fn register(&mut self, id: &ParticipantId) {
        let mut shared = self.inner.lock().expect("sim bus lock");
        shared.registered.insert(id.clone());
    }

    fn registration_complete(&self) -> bool {
        let shared = self.inner.lock().expect("sim bus lock");
        shared.expected.is_subset(&shared.registered)
    }

    fn propose_outcome(&mut self, candidate: &RoundOutcome) -> Result<(), ConsensusError> {
        let mut shared = self.inner.lock().expect("sim bus lock");
        shared
            .agreed
            .entry(candidate.round)
            .or_insert_with(|| candidate.clone());
        Ok(())
    }

    fn poll_agreed(&mut self, round: u64) -> Option<RoundOutcome> {
        if self.delivered.contains(&round) {
            return None;
        }
        let shared = self.inner.lock().expect("sim bus lock");
        let outcome = shared.agreed.get(&round).cloned()?;
        drop(shared);
        self.delivered.insert(round);
        tracing::trace!(replica = %self.id, round, keeper = %outcome.keeper, "agreed outcome delivered");
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Participant;
    use crate::seed::SynchronizedSeed;

    fn registry() -> Registry {
        Registry::new(vec![
            Participant::new("0xaa", "alice"),
            Participant::new("0xbb", "bob"),
        ])
        .unwrap()
    }

    fn outcome(round: u64, keeper: &str) -> RoundOutcome {
        RoundOutcome {
            round,
            keeper: ParticipantId::new(keeper),
            seed: SynchronizedSeed::genesis("test"),
            message: "HELLO_WORLD!".into(),
        }
    }

    #[test]
    fn first_admitted_proposal_wins_for_all_handles() {
        let registry = registry();
        let bus = SimConsensus::new(&registry);
        let mut a = bus.handle(ParticipantId::new("0xaa"));
        let mut b = bus.handle(ParticipantId::new("0xbb"));

        a.propose_outcome(&outcome(0, "0xaa")).unwrap();
        b.propose_outcome(&outcome(0, "0xbb")).unwrap();

        let seen_a = a.poll_agreed(0).unwrap();
        let seen_b = b.poll_agreed(0).unwrap();
        assert_eq!(seen_a, seen_b);
        assert_eq!(seen_a.keeper.as_str(), "0xaa");
    }

    #[test]
    fn delivery_is_at_most_once_per_handle() {
        let registry = registry();
        let bus = SimConsensus::new(&registry);
        let mut a = bus.handle(ParticipantId::new("0xaa"));
        a.propose_outcome(&outcome(0, "0xaa")).unwrap();
        assert!(a.poll_agreed(0).is_some());
        assert!(a.poll_agreed(0).is_none());
    }

    #[test]
    fn registration_completes_only_with_the_full_set() {
        let registry = registry();
        let bus = SimConsensus::new(&registry);
        let mut a = bus.handle(ParticipantId::new("0xaa"));
        let mut b = bus.handle(ParticipantId::new("0xbb"));

        a.register(&ParticipantId::new("0xaa"));
        assert!(!a.registration_complete());
        b.register(&ParticipantId::new("0xbb"));
        assert!(a.registration_complete());
        assert!(b.registration_complete());
    }
}
