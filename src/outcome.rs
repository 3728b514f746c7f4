//! Agreed round outcomes and the append-only history.

use crate::error::InvalidOutcome;
use crate::registry::{ParticipantId, Registry};
use crate::seed::SynchronizedSeed;
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

pub type Digest = [u8; 32];
pub const ZERO_DIGEST: Digest = [0u8; 32];

/// The authoritative decision for one round. Immutable once agreed;
/// identical on every honest replica for the same round number.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub round: u64,
    /// The one participant authorized to act this round.
    pub keeper: ParticipantId,
    /// Seed input the selection was computed from.
    pub seed: SynchronizedSeed,
    /// Line the keeper is authorized to emit.
    pub message: String,
}

/// Canonical byte encoding, length-prefixed so fields cannot bleed into each
/// other.
pub fn outcome_bytes(outcome: &RoundOutcome) -> Vec<u8> {
    let keeper = outcome.keeper.as_str().as_bytes();
    let message = outcome.message.as_bytes();
    let mut out = Vec::with_capacity(8 + 4 + keeper.len() + 32 + 4 + message.len());
    out.extend_from_slice(&outcome.round.to_le_bytes());
    out.extend_from_slice(&(keeper.len() as u32).to_le_bytes());
    out.extend_from_slice(keeper);
    out.extend_from_slice(outcome.seed.as_bytes());
    out.extend_from_slice(&(message.len() as u32).to_le_bytes());
    out.extend_from_slice(message);
    out
}

pub fn outcome_digest(outcome: &RoundOutcome) -> Digest {
    let mut h = Sha256::new();
    h.update(outcome_bytes(outcome));
    h.finalize().into()
}

/// Append-only record of agreed outcomes, owned exclusively by the local
/// round state machine. `tip` chains the outcome digests, so two histories
/// with equal tips hold byte-identical outcome sequences.
#[derive(Clone, Debug, Default)]
pub struct History {
    outcomes: Vec<RoundOutcome>,
    tip: Option<Digest>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Round the next outcome must carry.
    pub fn next_round(&self) -> u64 {
        self.outcomes.len() as u64
    }

    /// Validates and appends an agreed outcome. Out-of-sequence rounds and
    /// keepers outside the registry are consistency violations.
    pub fn apply(
        &mut self,
        registry: &Registry,
        outcome: RoundOutcome,
    ) -> Result<(), InvalidOutcome> {
        let expected = self.next_round();
        if outcome.round != expected {
            return Err(InvalidOutcome::RoundOutOfSequence {
                expected,
                got: outcome.round,
            });
        }
        if !registry.contains(&outcome.keeper) {
            return Err(InvalidOutcome::UnknownParticipant(outcome.keeper.to_string()));
        }

        let mut h = Sha256::new();
        h.update(self.tip.unwrap_or(ZERO_DIGEST));
        h.update(outcome_digest(&outcome));
        self.tip = Some(h.finalize().into());
        self.outcomes.push(outcome);
        Ok(())
    }

    pub fn outcomes(&self) -> &[RoundOutcome] {
        &self.outcomes
    }

    pub fn last(&self) -> Option<&RoundOutcome> {
        self.outcomes.last()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Chained digest over all applied outcomes.
    pub fn digest(&self) -> Digest {
        self.tip.unwrap_or(ZERO_DIGEST)
    }

    /// Keeper messages in round order.
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.outcomes.iter().map(|o| o.message.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Participant;

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
    fn sequential_outcomes_apply() {
        let registry = registry();
        let mut history = History::new();
        history.apply(&registry, outcome(0, "0xaa")).unwrap();
        history.apply(&registry, outcome(1, "0xbb")).unwrap();
        assert_eq!(history.next_round(), 2);
        assert_eq!(history.last().unwrap().keeper.as_str(), "0xbb");
    }

    #[test]
    fn out_of_sequence_round_is_rejected() {
        let registry = registry();
        let mut history = History::new();
        history.apply(&registry, outcome(0, "0xaa")).unwrap();
        assert_eq!(
            history.apply(&registry, outcome(2, "0xbb")).unwrap_err(),
            InvalidOutcome::RoundOutOfSequence { expected: 1, got: 2 }
        );
        // Rejection must not touch the applied tail.
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn unknown_keeper_is_rejected() {
        let registry = registry();
        let mut history = History::new();
        assert_eq!(
            history.apply(&registry, outcome(0, "0xzz")).unwrap_err(),
            InvalidOutcome::UnknownParticipant("0xzz".into())
        );
    }

    #[test]
    fn identical_sequences_yield_identical_digests() {
        let registry = registry();
        let mut a = History::new();
        let mut b = History::new();
        for round in 0..4 {
            let keeper = if round % 2 == 0 { "0xaa" } else { "0xbb" };
            a.apply(&registry, outcome(round, keeper)).unwrap();
            b.apply(&registry, outcome(round, keeper)).unwrap();
        }
        assert_eq!(a.digest(), b.digest());

        let mut c = History::new();
        c.apply(&registry, outcome(0, "0xbb")).unwrap();
        assert_ne!(a.digest(), c.digest());
    }
}
