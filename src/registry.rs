//! Fixed participant set with a canonical ordering.
//!
//! The registry is built once at startup and never mutated. Every replica
//! holds an identical copy; the canonical order (lexicographic by identity)
//! is the sole source of indexable ordering for keeper selection.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Stable participant identity (an address-like string).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    /// Human-readable name used in the keeper's emitted line.
    pub name: String,
}

impl Participant {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ParticipantId::new(id),
            name: name.into(),
        }
    }
}

/// Read-only after construction.
#[derive(Clone, Debug)]
pub struct Registry {
    ordered: Vec<Participant>,
    rank_by_id: HashMap<ParticipantId, usize>,
}

impl Registry {
    /// Sorts the given participants into canonical order. Fails on an empty
    /// set or duplicate identities.
    pub fn new(mut participants: Vec<Participant>) -> Result<Self, ConfigError> {
        if participants.is_empty() {
            return Err(ConfigError::EmptyParticipantSet);
        }
        participants.sort_by(|a, b| a.id.cmp(&b.id));

        let mut rank_by_id = HashMap::with_capacity(participants.len());
        for (rank, p) in participants.iter().enumerate() {
            if rank_by_id.insert(p.id.clone(), rank).is_some() {
                return Err(ConfigError::DuplicateParticipant(p.id.to_string()));
            }
        }

        Ok(Self {
            ordered: participants,
            rank_by_id,
        })
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        // Construction rejects empty sets; kept for API completeness.
        self.ordered.is_empty()
    }

    /// Participants in canonical (identity-lexicographic) order.
    pub fn canonical_order(&self) -> &[Participant] {
        &self.ordered
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.rank_by_id.contains_key(id)
    }

    pub fn get(&self, id: &ParticipantId) -> Option<&Participant> {
        self.rank_by_id.get(id).map(|&rank| &self.ordered[rank])
    }

    /// Position of `id` in the canonical order.
    pub fn rank(&self, id: &ParticipantId) -> Option<usize> {
        self.rank_by_id.get(id).copied()
    }

    pub fn by_rank(&self, rank: usize) -> &Participant {
        &self.ordered[rank]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_rejected() {
        assert_eq!(
            Registry::new(Vec::new()).unwrap_err(),
            ConfigError::EmptyParticipantSet
        );
    }

    #[test]
    fn duplicate_identity_rejected() {
        let participants = vec![
            Participant::new("0xaa", "alice"),
            Participant::new("0xaa", "alice-again"),
        ];
        assert_eq!(
            Registry::new(participants).unwrap_err(),
            ConfigError::DuplicateParticipant("0xaa".into())
        );
    }

    #[test]
    fn canonical_order_is_sorted_regardless_of_input_order() {
        let registry = Registry::new(vec![
            Participant::new("0xcc", "carol"),
            Participant::new("0xaa", "alice"),
            Participant::new("0xbb", "bob"),
        ])
        .unwrap();

        let ids: Vec<&str> = registry
            .canonical_order()
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(ids, vec!["0xaa", "0xbb", "0xcc"]);
        assert_eq!(registry.rank(&ParticipantId::new("0xbb")), Some(1));
        assert_eq!(registry.by_rank(2).name, "carol");
    }
}
