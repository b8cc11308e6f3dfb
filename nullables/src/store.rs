//! Nullable store — thread-safe in-memory storage for testing.

use plenum_store::{AuditStore, ParticipantStore, ProposalStore, StoreError};
use plenum_types::{ParticipantId, ProposalId};
use std::collections::HashMap;
use std::sync::Mutex;

/// An in-memory `StateStore` implementation.
///
/// Thread-safe, keeps everything in `Mutex`-guarded maps. Suitable for
/// tests and for embedders that want a purely in-process engine.
pub struct NullStore {
    participants: Mutex<HashMap<String, Vec<u8>>>,
    proposals: Mutex<HashMap<String, Vec<u8>>>,
    audit: Mutex<Vec<Vec<u8>>>,
}

impl NullStore {
    pub fn new() -> Self {
        Self {
            participants: Mutex::new(HashMap::new()),
            proposals: Mutex::new(HashMap::new()),
            audit: Mutex::new(Vec::new()),
        }
    }

    /// Number of audit records written (for assertions).
    pub fn audit_len(&self) -> usize {
        self.audit.lock().unwrap().len()
    }
}

impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ParticipantStore for NullStore {
    fn put_participant(&self, id: &ParticipantId, data: &[u8]) -> Result<(), StoreError> {
        self.participants
            .lock()
            .unwrap()
            .insert(id.as_str().to_string(), data.to_vec());
        Ok(())
    }

    fn list_participants(&self) -> Result<Vec<Vec<u8>>, StoreError> {
        Ok(self.participants.lock().unwrap().values().cloned().collect())
    }
}

impl ProposalStore for NullStore {
    fn put_proposal(&self, id: &ProposalId, data: &[u8]) -> Result<(), StoreError> {
        self.proposals
            .lock()
            .unwrap()
            .insert(id.as_str().to_string(), data.to_vec());
        Ok(())
    }

    fn get_proposal(&self, id: &ProposalId) -> Result<Vec<u8>, StoreError> {
        self.proposals
            .lock()
            .unwrap()
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn list_proposals(&self) -> Result<Vec<Vec<u8>>, StoreError> {
        Ok(self.proposals.lock().unwrap().values().cloned().collect())
    }
}

impl AuditStore for NullStore {
    fn append_audit(&self, data: &[u8]) -> Result<(), StoreError> {
        self.audit.lock().unwrap().push(data.to_vec());
        Ok(())
    }

    fn load_audit(&self) -> Result<Vec<Vec<u8>>, StoreError> {
        Ok(self.audit.lock().unwrap().clone())
    }
}
