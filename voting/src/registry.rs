//! Participant registry — voter identities, base weights, delegation edges.
//!
//! Delegation is stored as a plain id → id index with cycle checks performed
//! eagerly on write, so the registry never holds an invalid graph and
//! resolution is always a bounded traversal over identifiers.
//!
//! Participants are never deleted; they are soft-deactivated and keep their
//! history.

use plenum_types::ParticipantId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::VotingError;

/// A registered voter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    /// Base voting weight. Non-negative; may represent reputation.
    pub weight: f64,
    /// Standing delegation of this participant's weight to another voter.
    pub delegate: Option<ParticipantId>,
    /// Deactivated participants keep their record but carry no weight.
    pub active: bool,
}

impl Participant {
    fn new(id: ParticipantId, weight: f64) -> Self {
        Self {
            id,
            weight,
            delegate: None,
            active: true,
        }
    }
}

/// Registry of all participants and their delegation edges.
pub struct ParticipantRegistry {
    participants: HashMap<ParticipantId, Participant>,
}

impl ParticipantRegistry {
    pub fn new() -> Self {
        Self {
            participants: HashMap::new(),
        }
    }

    /// Rebuild a registry from previously persisted participants.
    ///
    /// The records are trusted as-is: every stored edge already passed the
    /// cycle check when it was written.
    pub fn from_participants(participants: Vec<Participant>) -> Self {
        Self {
            participants: participants.into_iter().map(|p| (p.id.clone(), p)).collect(),
        }
    }

    /// Register a participant, or re-weight an existing one.
    ///
    /// Re-registration updates the weight and reactivates the participant
    /// but leaves any standing delegation in place.
    pub fn register(
        &mut self,
        id: ParticipantId,
        weight: f64,
    ) -> Result<&Participant, VotingError> {
        validate_weight(weight)?;
        let entry = self
            .participants
            .entry(id.clone())
            .or_insert_with(|| Participant::new(id, weight));
        entry.weight = weight;
        entry.active = true;
        Ok(entry)
    }

    /// Change a participant's base weight.
    pub fn set_weight(&mut self, id: &ParticipantId, weight: f64) -> Result<(), VotingError> {
        validate_weight(weight)?;
        let participant = self
            .participants
            .get_mut(id)
            .ok_or_else(|| VotingError::ParticipantNotFound(id.clone()))?;
        participant.weight = weight;
        Ok(())
    }

    /// Set or clear a participant's standing delegation.
    ///
    /// The target must be registered, and the edge must not close a cycle
    /// reachable from `id`. The check walks the existing chain from the
    /// target; because every stored edge already passed this check, the
    /// walk is bounded by the registry size.
    pub fn set_delegate(
        &mut self,
        id: &ParticipantId,
        delegate: Option<ParticipantId>,
    ) -> Result<(), VotingError> {
        if !self.participants.contains_key(id) {
            return Err(VotingError::ParticipantNotFound(id.clone()));
        }

        if let Some(target) = &delegate {
            if !self.participants.contains_key(target) {
                return Err(VotingError::ParticipantNotFound(target.clone()));
            }
            // Walking from the target must never reach `id`, or the new
            // edge would close a cycle. Self-delegation is the length-1
            // case of the same rule.
            let mut current = Some(target.clone());
            while let Some(hop) = current {
                if hop == *id {
                    return Err(VotingError::DelegationCycle {
                        from: id.clone(),
                        to: target.clone(),
                    });
                }
                current = self
                    .participants
                    .get(&hop)
                    .and_then(|p| p.delegate.clone());
            }
        }

        let participant = self
            .participants
            .get_mut(id)
            .ok_or_else(|| VotingError::ParticipantNotFound(id.clone()))?;
        participant.delegate = delegate;
        Ok(())
    }

    /// Soft-deactivate a participant. Their record and delegation edge
    /// remain, but they carry no weight and cannot vote.
    pub fn deactivate(&mut self, id: &ParticipantId) -> Result<(), VotingError> {
        let participant = self
            .participants
            .get_mut(id)
            .ok_or_else(|| VotingError::ParticipantNotFound(id.clone()))?;
        participant.active = false;
        Ok(())
    }

    pub fn get(&self, id: &ParticipantId) -> Result<&Participant, VotingError> {
        self.participants
            .get(id)
            .ok_or_else(|| VotingError::ParticipantNotFound(id.clone()))
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.participants.contains_key(id)
    }

    /// All active participants.
    pub fn list_eligible(&self) -> Vec<&Participant> {
        self.participants.values().filter(|p| p.active).collect()
    }

    /// Sum of all active participants' base weights.
    pub fn total_eligible_weight(&self) -> f64 {
        self.participants
            .values()
            .filter(|p| p.active)
            .map(|p| p.weight)
            .sum()
    }

    /// Cloned view of every participant, handed to the delegation resolver
    /// at close time.
    pub fn snapshot(&self) -> Vec<Participant> {
        self.participants.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}

impl Default for ParticipantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_weight(weight: f64) -> Result<(), VotingError> {
    if !weight.is_finite() || weight < 0.0 {
        return Err(VotingError::InvalidWeight(weight));
    }
    Ok(())
}
