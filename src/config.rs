//! Static service configuration, supplied once at process start.

use crate::error::ConfigError;
use crate::registry::{Participant, Registry};
use crate::select::RotationPolicy;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Salts the genesis seed and tags log output.
    pub service_id: String,
    pub participants: Vec<ParticipantConfig>,
    #[serde(default)]
    pub rounds: RoundConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParticipantConfig {
    pub id: String,
    /// Defaults to the identity when omitted.
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoundConfig {
    #[serde(default = "default_round_timeout_ms")]
    pub round_timeout_ms: u64,
    /// Re-proposals allowed per round before the replica halts.
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,
    #[serde(default)]
    pub policy: RotationPolicy,
    #[serde(default = "default_keeper_message")]
    pub keeper_message: String,
    /// Pause between a round's reset and the next round's input collection.
    #[serde(default)]
    pub reset_pause_ms: u64,
    /// Timeout growth across retries, as a num/den ratio capped at
    /// `timeout_cap_ms`.
    #[serde(default = "default_backoff_num")]
    pub timeout_backoff_num: u64,
    #[serde(default = "default_backoff_den")]
    pub timeout_backoff_den: u64,
    #[serde(default = "default_timeout_cap_ms")]
    pub timeout_cap_ms: u64,
}

fn default_round_timeout_ms() -> u64 {
    1_000
}

fn default_retry_limit() -> u32 {
    3
}

fn default_keeper_message() -> String {
    "HELLO_WORLD!".to_string()
}

fn default_backoff_num() -> u64 {
    3
}

fn default_backoff_den() -> u64 {
    2
}

fn default_timeout_cap_ms() -> u64 {
    10_000
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            round_timeout_ms: default_round_timeout_ms(),
            retry_limit: default_retry_limit(),
            policy: RotationPolicy::default(),
            keeper_message: default_keeper_message(),
            reset_pause_ms: 0,
            timeout_backoff_num: default_backoff_num(),
            timeout_backoff_den: default_backoff_den(),
            timeout_cap_ms: default_timeout_cap_ms(),
        }
    }
}

impl ServiceConfig {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: ServiceConfig =
            serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rounds.round_timeout_ms == 0 {
            return Err(ConfigError::ZeroRoundTimeout);
        }
        // Surfaces empty/duplicate participant sets.
        self.registry().map(|_| ())
    }

    pub fn registry(&self) -> Result<Registry, ConfigError> {
        let participants = self
            .participants
            .iter()
            .map(|p| {
                let name = p.name.clone().unwrap_or_else(|| p.id.clone());
                Participant::new(p.id.clone(), name)
            })
            .collect();
        Registry::new(participants)
    }
}
