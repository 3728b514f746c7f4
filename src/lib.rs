//! Replicated round-robin keeper rotation over a pluggable consensus
//! substrate.
//!
//! A fixed set of agent replicas agrees, once per round, on which single
//! agent (the keeper) is authorized to perform the externally visible
//! action, then rotates that authorization deterministically. Agreement is
//! delegated to a consensus substrate behind [`adapter::ConsensusAdapter`];
//! the core only proposes candidate outcomes and applies agreed ones, so the
//! same state machine runs unchanged against the in-process
//! [`sim::SimConsensus`] bus or a networked BFT engine.

pub mod adapter;
pub mod config;
pub mod error;
pub mod executor;
pub mod machine;
pub mod outcome;
pub mod registry;
pub mod replica;
pub mod seed;
pub mod select;
pub mod sim;

pub use adapter::ConsensusAdapter;
pub use config::{RoundConfig, ServiceConfig};
pub use error::{ConfigError, ConsensusError, HaltReason, InvalidOutcome};
pub use executor::{ActionExecutor, ConsoleExecutor};
pub use machine::{Phase, RoundMachine};
pub use outcome::{History, RoundOutcome};
pub use registry::{Participant, ParticipantId, Registry};
pub use replica::{Replica, ReplicaCommand, ReplicaSnapshot};
pub use seed::SynchronizedSeed;
pub use select::{select, RotationPolicy};
