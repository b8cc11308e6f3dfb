//! Delegation resolver — turns the delegation graph into effective weights.
//!
//! Runs once per proposal at close time, over a registry snapshot plus the
//! set of participants who cast a direct ballot. A direct ballot makes a
//! participant terminal regardless of any outgoing delegation: delegating
//! never revokes the right to vote for one's own weight.
//!
//! Graph failures (depth exceeded, cycle, dangling edge) exclude the
//! affected participant's weight and are reported as warnings, never as a
//! fatal error — one corrupt chain must not block a whole decision.

use plenum_types::ParticipantId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::warn;

use crate::registry::Participant;

/// Why a participant's weight was excluded from a tally.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExclusionReason {
    /// The delegation chain exceeded the configured maximum depth.
    DepthExceeded { max_depth: usize },
    /// The chain revisited a participant. The registry rejects cycles on
    /// write, so this only fires on corrupted data.
    CycleDetected,
    /// The chain reached a delegate missing from the snapshot.
    UnknownDelegate(ParticipantId),
}

/// One excluded participant and the reason.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclusion {
    pub participant: ParticipantId,
    pub reason: ExclusionReason,
}

/// The outcome of resolving the delegation graph for one proposal.
#[derive(Clone, Debug, Default)]
pub struct Resolution {
    /// Effective weight per direct voter: own weight plus all weight whose
    /// delegation chain terminates at them.
    pub effective_weights: HashMap<ParticipantId, f64>,
    /// Terminal voter per participant, for every chain that resolved.
    pub resolved_voter: HashMap<ParticipantId, ParticipantId>,
    /// Total weight that reached a direct voter. This is the quorum
    /// numerator.
    pub participation_weight: f64,
    /// Participants whose weight was excluded by a graph failure.
    pub exclusions: Vec<Exclusion>,
}

/// Resolve every active participant's chain against the direct-voter set.
///
/// Chains that end at a participant who never voted resolve to no one: that
/// weight joins neither the tally nor the quorum numerator (the delegators
/// effectively abstained). `max_depth` bounds the hop count of any chain.
pub fn resolve(
    participants: &[Participant],
    direct_voters: &HashSet<ParticipantId>,
    max_depth: usize,
) -> Resolution {
    let by_id: HashMap<&ParticipantId, &Participant> =
        participants.iter().map(|p| (&p.id, p)).collect();

    let mut resolution = Resolution::default();

    for participant in participants.iter().filter(|p| p.active) {
        match walk_chain(participant, &by_id, direct_voters, max_depth) {
            ChainEnd::Voter(terminal) => {
                *resolution
                    .effective_weights
                    .entry(terminal.clone())
                    .or_insert(0.0) += participant.weight;
                resolution.participation_weight += participant.weight;
                resolution
                    .resolved_voter
                    .insert(participant.id.clone(), terminal);
            }
            ChainEnd::Abstained => {}
            ChainEnd::Excluded(reason) => {
                warn!(
                    participant = %participant.id,
                    reason = ?reason,
                    "delegation chain excluded from tally"
                );
                resolution.exclusions.push(Exclusion {
                    participant: participant.id.clone(),
                    reason,
                });
            }
        }
    }

    resolution
}

enum ChainEnd {
    /// The chain terminates at a participant who cast a direct ballot.
    Voter(ParticipantId),
    /// The chain ends without reaching a ballot; the weight abstains.
    Abstained,
    Excluded(ExclusionReason),
}

fn walk_chain(
    start: &Participant,
    by_id: &HashMap<&ParticipantId, &Participant>,
    direct_voters: &HashSet<ParticipantId>,
    max_depth: usize,
) -> ChainEnd {
    let mut current = start;
    let mut visited: HashSet<&ParticipantId> = HashSet::new();
    let mut hops = 0usize;

    loop {
        // Ballots take precedence over further delegation.
        if direct_voters.contains(&current.id) {
            return ChainEnd::Voter(current.id.clone());
        }

        let Some(next_id) = &current.delegate else {
            return ChainEnd::Abstained;
        };

        if !visited.insert(&current.id) {
            return ChainEnd::Excluded(ExclusionReason::CycleDetected);
        }
        hops += 1;
        if hops > max_depth {
            return ChainEnd::Excluded(ExclusionReason::DepthExceeded { max_depth });
        }

        match by_id.get(next_id) {
            Some(next) if next.active => current = next,
            // A deactivated delegate who didn't vote ends the chain the
            // same way a non-voting terminal does.
            Some(_) => return ChainEnd::Abstained,
            None => {
                return ChainEnd::Excluded(ExclusionReason::UnknownDelegate((*next_id).clone()))
            }
        }
    }
}
