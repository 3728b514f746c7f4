//! The externally visible side effect.
//!
//! `execute` runs if and only if the agreed keeper for the round is this
//! replica; the state machine guarantees at most one invocation per applied
//! round, so executors need no dedup of their own.

use crate::outcome::RoundOutcome;
use crate::registry::{Participant, ParticipantId};
use std::sync::{Arc, Mutex};

pub trait ActionExecutor: Send {
    fn execute(&mut self, outcome: &RoundOutcome, me: &Participant);
}

/// Emits the keeper line to stdout, the service's only user-visible output.
#[derive(Default)]
pub struct ConsoleExecutor;

impl ActionExecutor for ConsoleExecutor {
    fn execute(&mut self, outcome: &RoundOutcome, me: &Participant) {
        println!(
            "Agent {} (address {}) in round {} says: {}",
            me.name, me.id, outcome.round, outcome.message
        );
    }
}

/// Records invocations instead of printing; shared so tests can assert how
/// often and for which rounds a replica acted.
#[derive(Clone, Default)]
pub struct RecordingExecutor {
    fired: Arc<Mutex<Vec<(u64, ParticipantId)>>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fired(&self) -> Vec<(u64, ParticipantId)> {
        self.fired.lock().expect("recording lock").clone()
    }
}

impl ActionExecutor for RecordingExecutor {
    fn execute(&mut self, outcome: &RoundOutcome, me: &Participant) {
        self.fired
            .lock()
            .expect("recording lock")
            .push((outcome.round, me.id.clone()));
    }
}
