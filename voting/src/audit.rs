//! Append-only audit trail.
//!
//! Every state transition, ballot, registry change, and tally decision is
//! recorded here. The log is the exclusive writer of its entries: other
//! components emit events through it but can never mutate or reorder what
//! was already written. External reporting tools consume it as an
//! append-only sequence, optionally via JSON-lines export.

use plenum_store::AuditStore;
use plenum_types::{ParticipantId, ProposalId, Timestamp};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::ballot::Choice;
use crate::delegation::Exclusion;
use crate::error::VotingError;
use crate::proposal::ProposalState;

/// What happened.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditEvent {
    ParticipantRegistered { weight: f64 },
    WeightChanged { weight: f64 },
    DelegateChanged { delegate: Option<ParticipantId> },
    ParticipantDeactivated,
    ProposalCreated { title: String },
    ProposalOpened,
    BallotCast {
        choice: Choice,
        reasoning: Option<String>,
    },
    BallotSuperseded { previous_cast_at: Timestamp },
    DelegationExcluded { exclusion: Exclusion },
    ProposalClosed { state: ProposalState },
    ProposalCancelled,
    ResultRecorded {
        quorum_met: bool,
        winner: Option<String>,
    },
    RunoffOpened { runoff: ProposalId },
}

/// One immutable log entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Monotonically increasing position in the log.
    pub seq: u64,
    pub timestamp: Timestamp,
    pub proposal: Option<ProposalId>,
    pub actor: Option<ParticipantId>,
    pub event: AuditEvent,
}

/// The append-only log, with optional write-through to an [`AuditStore`].
pub struct AuditLog {
    entries: Mutex<Vec<AuditRecord>>,
    store: Option<Arc<dyn AuditStore>>,
}

impl AuditLog {
    /// In-memory log with no durable sink.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            store: None,
        }
    }

    /// Log that appends each record through to `store` as it is written.
    pub fn with_store(store: Arc<dyn AuditStore>) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            store: Some(store),
        }
    }

    /// Rebuild the in-memory log from a store's existing records, then
    /// continue appending after them.
    pub fn restore(store: Arc<dyn AuditStore>) -> Result<Self, VotingError> {
        let mut entries = Vec::new();
        for bytes in store.load_audit()? {
            let record: AuditRecord = serde_json::from_slice(&bytes)
                .map_err(|e| plenum_store::StoreError::Serialization(e.to_string()))?;
            entries.push(record);
        }
        Ok(Self {
            entries: Mutex::new(entries),
            store: Some(store),
        })
    }

    /// Append one event. Returns the assigned sequence number.
    pub fn append(
        &self,
        timestamp: Timestamp,
        proposal: Option<ProposalId>,
        actor: Option<ParticipantId>,
        event: AuditEvent,
    ) -> Result<u64, VotingError> {
        let mut entries = self.entries.lock().expect("audit log poisoned");
        let seq = entries.len() as u64;
        let record = AuditRecord {
            seq,
            timestamp,
            proposal,
            actor,
            event,
        };
        // Records are stored as the same JSON objects `export_json` emits,
        // so a raw store dump is directly readable by audit consumers.
        if let Some(store) = &self.store {
            let bytes = serde_json::to_vec(&record)
                .map_err(|e| plenum_store::StoreError::Serialization(e.to_string()))?;
            store.append_audit(&bytes)?;
        }
        entries.push(record);
        Ok(seq)
    }

    /// All entries, in append order.
    pub fn entries(&self) -> Vec<AuditRecord> {
        self.entries.lock().expect("audit log poisoned").clone()
    }

    /// Entries touching one proposal, in append order.
    pub fn entries_for(&self, proposal: &ProposalId) -> Vec<AuditRecord> {
        self.entries
            .lock()
            .expect("audit log poisoned")
            .iter()
            .filter(|r| r.proposal.as_ref() == Some(proposal))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("audit log poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One JSON object per line, for external audit consumers.
    pub fn export_json(&self) -> Result<String, VotingError> {
        let entries = self.entries.lock().expect("audit log poisoned");
        let mut out = String::new();
        for record in entries.iter() {
            let line = serde_json::to_string(record)
                .map_err(|e| plenum_store::StoreError::Serialization(e.to_string()))?;
            out.push_str(&line);
            out.push('\n');
        }
        Ok(out)
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}
