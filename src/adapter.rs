//! Consensus substrate boundary.
//!
//! The core never implements Byzantine agreement. It proposes candidate
//! outcomes through this trait and consumes whatever the substrate agrees
//! on. The substrate must provide, for honest replicas:
//!
//! - agreement: every replica that completes round R observes the identical
//!   outcome for R;
//! - liveness: with a majority of honest, responsive replicas, round R
//!   eventually agrees;
//! - validity: the agreed outcome was actually proposed by some replica.

use crate::error::ConsensusError;
use crate::outcome::RoundOutcome;
use crate::registry::ParticipantId;

pub trait ConsensusAdapter: Send {
    /// Announce this replica to the substrate. Called once before the round
    /// loop; idempotent.
    fn register(&mut self, id: &ParticipantId);

    /// Whether every configured participant has announced itself.
    fn registration_complete(&self) -> bool;

    /// Submit this replica's candidate for `candidate.round`. May be called
    /// again for the same round on re-proposal; deduplication and selection
    /// among concurrent proposals are the substrate's concern.
    fn propose_outcome(&mut self, candidate: &RoundOutcome) -> Result<(), ConsensusError>;

    /// The agreed outcome for `round`, once the substrate has one. Delivers
    /// at most once per round per handle. The caller adopts the returned
    /// value unconditionally, even when it differs from its own proposal.
    fn poll_agreed(&mut self, round: u64) -> Option<RoundOutcome>;
}
