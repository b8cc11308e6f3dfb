//! Abstract storage traits for the Plenum voting engine.
//!
//! Every storage backend (in-memory for testing, or a durable engine
//! supplied by the embedder) implements these traits. The engine depends
//! only on the traits and requires read-your-writes consistency per
//! proposal; the storage technology itself is the embedder's concern.
//!
//! Payloads are opaque bytes: the engine serializes its own records
//! (bincode) before handing them over, so backends never need to know the
//! domain types.

pub mod error;

pub use error::StoreError;

use plenum_types::{ParticipantId, ProposalId};

/// Storage for registered participants.
pub trait ParticipantStore: Send + Sync {
    /// Store (or overwrite) a participant record.
    fn put_participant(&self, id: &ParticipantId, data: &[u8]) -> Result<(), StoreError>;

    /// Load all participant records.
    fn list_participants(&self) -> Result<Vec<Vec<u8>>, StoreError>;
}

/// Storage for proposals, including their ballots and result.
pub trait ProposalStore: Send + Sync {
    /// Store (or overwrite) a proposal record.
    fn put_proposal(&self, id: &ProposalId, data: &[u8]) -> Result<(), StoreError>;

    /// Get a proposal record by id.
    fn get_proposal(&self, id: &ProposalId) -> Result<Vec<u8>, StoreError>;

    /// Load all proposal records.
    fn list_proposals(&self) -> Result<Vec<Vec<u8>>, StoreError>;
}

/// Append-only storage for audit records.
///
/// There is deliberately no update or delete: entries already written are
/// never reordered or removed.
pub trait AuditStore: Send + Sync {
    /// Append one audit record.
    fn append_audit(&self, data: &[u8]) -> Result<(), StoreError>;

    /// Load all audit records, in append order.
    fn load_audit(&self) -> Result<Vec<Vec<u8>>, StoreError>;
}

/// The single storage handle the engine holds.
pub trait StateStore: ParticipantStore + ProposalStore + AuditStore {}

impl<T: ParticipantStore + ProposalStore + AuditStore> StateStore for T {}
