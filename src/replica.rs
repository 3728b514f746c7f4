//! One running replica: the round machine plus its collaborators, driven on
//! a dedicated thread with a command channel and a shared read snapshot.

use crate::adapter::ConsensusAdapter;
use crate::error::HaltReason;
use crate::executor::ActionExecutor;
use crate::machine::{Phase, RoundMachine};
use crate::outcome::{Digest, RoundOutcome, ZERO_DIGEST};
use std::sync::mpsc;
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::Duration;

pub enum ReplicaCommand {
    Shutdown,
}

/// Read-only view published by the replica thread.
#[derive(Clone, Debug)]
pub struct ReplicaSnapshot {
    pub phase: Phase,
    /// Round currently being worked on (= number of applied outcomes).
    pub round: u64,
    pub history_digest: Digest,
    pub outcomes: Vec<RoundOutcome>,
    pub halted: Option<HaltReason>,
}

impl ReplicaSnapshot {
    pub fn new() -> Self {
        Self {
            phase: Phase::Registration,
            round: 0,
            history_digest: ZERO_DIGEST,
            outcomes: Vec::new(),
            halted: None,
        }
    }

    /// Keeper messages in round order.
    pub fn messages(&self) -> Vec<String> {
        self.outcomes.iter().map(|o| o.message.clone()).collect()
    }
}

impl Default for ReplicaSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Replica {
    machine: RoundMachine,
    adapter: Box<dyn ConsensusAdapter>,
    executor: Box<dyn ActionExecutor>,
    snapshot: Arc<RwLock<ReplicaSnapshot>>,
}

impl Replica {
    pub fn new(
        machine: RoundMachine,
        adapter: Box<dyn ConsensusAdapter>,
        executor: Box<dyn ActionExecutor>,
        snapshot: Arc<RwLock<ReplicaSnapshot>>,
    ) -> Self {
        Self {
            machine,
            adapter,
            executor,
            snapshot,
        }
    }

    /// Runs until a shutdown command arrives or the machine halts.
    pub fn run(mut self, rx_cmd: mpsc::Receiver<ReplicaCommand>) {
        let mut last_phase = self.machine.phase();
        let mut last_applied = self.machine.history().len();
        loop {
            let mut shutdown = false;
            while let Ok(cmd) = rx_cmd.try_recv() {
                match cmd {
                    ReplicaCommand::Shutdown => shutdown = true,
                }
            }
            if shutdown {
                tracing::debug!(replica = %self.machine.me().id, "shutdown requested");
                break;
            }

            let phase = self
                .machine
                .tick(self.adapter.as_mut(), self.executor.as_mut());

            let applied = self.machine.history().len();
            if phase != last_phase || applied != last_applied {
                self.publish_snapshot();
                last_phase = phase;
                last_applied = applied;
            }

            if phase.is_terminal() {
                break;
            }
            thread::sleep(Duration::from_millis(2));
        }
        self.publish_snapshot();
    }

    fn publish_snapshot(&self) {
        if let Ok(mut snap) = self.snapshot.write() {
            snap.phase = self.machine.phase();
            snap.round = self.machine.round();
            snap.history_digest = self.machine.history().digest();
            snap.outcomes = self.machine.history().outcomes().to_vec();
            snap.halted = self.machine.halt_reason().cloned();
        }
    }
}
