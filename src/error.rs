use thiserror::Error;

/// Startup validation failures. Fatal: the round loop is never entered.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("participant set is empty")]
    EmptyParticipantSet,
    #[error("duplicate participant identity: {0}")]
    DuplicateParticipant(String),
    #[error("replica identity {0} is not in the participant set")]
    UnknownReplica(String),
    #[error("round_timeout_ms must be non-zero")]
    ZeroRoundTimeout,
    #[error("invalid config: {0}")]
    Parse(String),
}

/// Failures at the consensus substrate boundary.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConsensusError {
    #[error("no agreement for round {round} within {timeout_ms}ms (attempt {attempt})")]
    Timeout {
        round: u64,
        attempt: u32,
        timeout_ms: u64,
    },
    #[error("consensus unavailable for round {round} after {attempts} attempts")]
    Unavailable { round: u64, attempts: u32 },
    #[error("substrate rejected proposal for round {round}: {reason}")]
    Rejected { round: u64, reason: String },
}

/// An agreed outcome that contradicts local state. Never tolerated: the
/// replica halts rather than diverge silently.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InvalidOutcome {
    #[error("outcome for round {got}, expected round {expected}")]
    RoundOutOfSequence { expected: u64, got: u64 },
    #[error("outcome keeper {0} is not in the participant registry")]
    UnknownParticipant(String),
}

/// Why a replica stopped participating. History up to the halt stays
/// authoritative.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum HaltReason {
    #[error("consensus gave out: {0}")]
    ConsensusUnavailable(#[from] ConsensusError),
    #[error("consistency violation: {0}")]
    InvalidOutcome(#[from] InvalidOutcome),
}
