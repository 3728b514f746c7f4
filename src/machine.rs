//! The per-replica round state machine.
//!
//! Every replica runs the identical deterministic logic:
//!
//! ```text
//! Registration → CollectInput → ProposeOutcome → AwaitConsensus
//!                     ↑                               │ timeout → ProposeOutcome
//!                   Reset ← ActOrSkip ← Apply ←───────┘
//! ```
//!
//! `AwaitConsensus` is the sole suspension point; everything else advances
//! on the next tick. A round timeout there triggers a re-proposal with
//! backed-off timeouts, bounded by the retry limit, after which the machine
//! enters `Halted`. Consistency violations in an agreed outcome halt
//! immediately: correctness over availability.

use crate::adapter::ConsensusAdapter;
use crate::config::RoundConfig;
use crate::error::{ConfigError, ConsensusError, HaltReason};
use crate::executor::ActionExecutor;
use crate::outcome::{outcome_digest, History, RoundOutcome};
use crate::registry::{Participant, ParticipantId, Registry};
use crate::seed::SynchronizedSeed;
use crate::select::select;
use std::fmt;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for every configured participant to announce itself.
    Registration,
    CollectInput,
    ProposeOutcome,
    AwaitConsensus,
    Apply,
    ActOrSkip,
    Reset,
    /// Terminal. Entered only on unrecoverable failure.
    Halted,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Halted)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Registration => "Registration",
            Self::CollectInput => "CollectInput",
            Self::ProposeOutcome => "ProposeOutcome",
            Self::AwaitConsensus => "AwaitConsensus",
            Self::Apply => "Apply",
            Self::ActOrSkip => "ActOrSkip",
            Self::Reset => "Reset",
            Self::Halted => "Halted",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub struct RoundMachine {
    registry: Registry,
    me: Participant,
    cfg: RoundConfig,
    phase: Phase,
    history: History,
    /// Seed anchored at the current rotation window boundary.
    window_seed: SynchronizedSeed,
    /// Per-round scratch, cleared in Reset.
    round_seed: Option<SynchronizedSeed>,
    agreed: Option<RoundOutcome>,
    last_applied: Option<RoundOutcome>,
    attempts: u32,
    await_since: Instant,
    pause_until: Option<Instant>,
    registered: bool,
    halted: Option<HaltReason>,
}

impl RoundMachine {
    pub fn new(
        registry: Registry,
        me: &ParticipantId,
        cfg: RoundConfig,
        service_id: &str,
    ) -> Result<Self, ConfigError> {
        let me = registry
            .get(me)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownReplica(me.to_string()))?;
        Ok(Self {
            registry,
            me,
            cfg,
            phase: Phase::Registration,
            history: History::new(),
            window_seed: SynchronizedSeed::genesis(service_id),
            round_seed: None,
            agreed: None,
            last_applied: None,
            attempts: 0,
            await_since: Instant::now(),
            pause_until: None,
            registered: false,
            halted: None,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The round the machine is currently working on.
    pub fn round(&self) -> u64 {
        self.history.next_round()
    }

    pub fn me(&self) -> &Participant {
        &self.me
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn halt_reason(&self) -> Option<&HaltReason> {
        self.halted.as_ref()
    }

    /// Advances by at most one transition and returns the resulting phase.
    pub fn tick(
        &mut self,
        adapter: &mut dyn ConsensusAdapter,
        executor: &mut dyn ActionExecutor,
    ) -> Phase {
        match self.phase {
            Phase::Registration => self.tick_registration(adapter),
            Phase::CollectInput => self.tick_collect_input(),
            Phase::ProposeOutcome => self.tick_propose(adapter),
            Phase::AwaitConsensus => self.tick_await(adapter),
            Phase::Apply => self.tick_apply(),
            Phase::ActOrSkip => self.tick_act_or_skip(executor),
            Phase::Reset => self.tick_reset(),
            Phase::Halted => Phase::Halted,
        }
    }

    fn tick_registration(&mut self, adapter: &mut dyn ConsensusAdapter) -> Phase {
        if !self.registered {
            adapter.register(&self.me.id);
            self.registered = true;
            tracing::debug!(replica = %self.me.id, "registered with consensus substrate");
        }
        if adapter.registration_complete() {
            tracing::info!(replica = %self.me.id, "participant set complete, entering round loop");
            self.phase = Phase::CollectInput;
        }
        self.phase
    }

    fn tick_collect_input(&mut self) -> Phase {
        if let Some(until) = self.pause_until {
            if Instant::now() < until {
                return self.phase;
            }
            self.pause_until = None;
        }

        let round = self.history.next_round();
        let window = self.registry.len() as u64;
        if round > 0 && round % window == 0 {
            if let Some(last) = self.history.last() {
                self.window_seed = self.window_seed.next_window(&outcome_digest(last), round);
            }
        }
        self.round_seed = Some(self.window_seed);
        self.phase = Phase::ProposeOutcome;
        self.phase
    }

    fn tick_propose(&mut self, adapter: &mut dyn ConsensusAdapter) -> Phase {
        let round = self.history.next_round();
        let seed = self.round_seed.unwrap_or(self.window_seed);
        let keeper = select(&self.registry, round, &seed, self.cfg.policy).id.clone();
        let candidate = RoundOutcome {
            round,
            keeper,
            seed,
            message: self.cfg.keeper_message.clone(),
        };

        if let Err(err) = adapter.propose_outcome(&candidate) {
            // Agreement can still arrive via peers' proposals; the timeout
            // path covers the case where it never does.
            tracing::warn!(replica = %self.me.id, round, %err, "proposal submission failed");
        } else {
            tracing::debug!(replica = %self.me.id, round, keeper = %candidate.keeper, "proposed outcome");
        }

        self.await_since = Instant::now();
        self.phase = Phase::AwaitConsensus;
        self.phase
    }

    fn tick_await(&mut self, adapter: &mut dyn ConsensusAdapter) -> Phase {
        let round = self.history.next_round();
        if let Some(outcome) = adapter.poll_agreed(round) {
            self.agreed = Some(outcome);
            self.phase = Phase::Apply;
            return self.phase;
        }

        let timeout = self.await_timeout();
        if self.await_since.elapsed() >= timeout {
            self.attempts += 1;
            if self.attempts > self.cfg.retry_limit {
                return self.halt(
                    ConsensusError::Unavailable {
                        round,
                        attempts: self.attempts,
                    }
                    .into(),
                );
            }
            let err = ConsensusError::Timeout {
                round,
                attempt: self.attempts,
                timeout_ms: timeout.as_millis() as u64,
            };
            tracing::warn!(replica = %self.me.id, %err, "re-proposing");
            self.phase = Phase::ProposeOutcome;
        }
        self.phase
    }

    fn tick_apply(&mut self) -> Phase {
        let Some(outcome) = self.agreed.take() else {
            // Apply is only entered with an agreed outcome in hand.
            self.phase = Phase::CollectInput;
            return self.phase;
        };
        if let Err(err) = self.history.apply(&self.registry, outcome.clone()) {
            return self.halt(err.into());
        }
        self.last_applied = Some(outcome);
        self.phase = Phase::ActOrSkip;
        self.phase
    }

    fn tick_act_or_skip(&mut self, executor: &mut dyn ActionExecutor) -> Phase {
        if let Some(outcome) = &self.last_applied {
            if outcome.keeper == self.me.id {
                executor.execute(outcome, &self.me);
                tracing::info!(replica = %self.me.id, round = outcome.round, "acted as keeper");
            } else {
                tracing::debug!(
                    replica = %self.me.id,
                    round = outcome.round,
                    keeper = %outcome.keeper,
                    "not the keeper, skipping"
                );
            }
        }
        self.phase = Phase::Reset;
        self.phase
    }

    fn tick_reset(&mut self) -> Phase {
        self.round_seed = None;
        self.agreed = None;
        self.last_applied = None;
        self.attempts = 0;
        if self.cfg.reset_pause_ms > 0 {
            self.pause_until =
                Some(Instant::now() + Duration::from_millis(self.cfg.reset_pause_ms));
        }
        self.phase = Phase::CollectInput;
        self.phase
    }

    fn halt(&mut self, reason: HaltReason) -> Phase {
        tracing::error!(replica = %self.me.id, %reason, "replica halted");
        self.halted = Some(reason);
        self.phase = Phase::Halted;
        self.phase
    }

    fn await_timeout(&self) -> Duration {
        let mut base = self.cfg.round_timeout_ms as u128;
        let num = self.cfg.timeout_backoff_num as u128;
        let den = self.cfg.timeout_backoff_den.max(1) as u128;
        for _ in 0..self.attempts {
            base = base.saturating_mul(num) / den;
        }
        Duration::from_millis(base.min(self.cfg.timeout_cap_ms as u128) as u64)
    }
}
