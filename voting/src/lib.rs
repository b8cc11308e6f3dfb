//! Weighted voting and consensus engine.
//!
//! Proposals move through a monotonic lifecycle (Draft → Open →
//! Tallied/Cancelled) while registered participants cast weighted ballots
//! under one of six decision rules, with liquid-democracy delegation,
//! quorum enforcement, configurable tie-breaking, and an append-only
//! audit trail.
//!
//! ## Module overview
//!
//! - [`engine`] — The [`VotingEngine`] facade: lifecycle control, lazy
//!   deadline expiry, per-proposal serialization.
//! - [`registry`] — Participants, weights, and standing delegations.
//! - [`delegation`] — Close-time resolution of delegation chains into
//!   effective voter weights.
//! - [`proposal`] — Proposal structure, decision rules, tie-break
//!   policies, lifecycle states.
//! - [`ballot`] — Ballot choices, per-method validation, the ballot box.
//! - [`tally`] — The tally implementations (majority family, ranked
//!   choice, approval, quadratic) and tie-breaking.
//! - [`result`] — The immutable tally record.
//! - [`audit`] — Append-only audit log of every state change.
//! - [`error`] — Engine error types.

pub mod audit;
pub mod ballot;
pub mod delegation;
pub mod engine;
pub mod error;
pub mod proposal;
pub mod registry;
pub mod result;
pub mod tally;

pub use audit::{AuditEvent, AuditLog, AuditRecord};
pub use ballot::{Ballot, BallotBox, Choice};
pub use delegation::{Exclusion, ExclusionReason, Resolution};
pub use engine::{EngineConfig, VotingEngine};
pub use error::VotingError;
pub use proposal::{Proposal, ProposalState, TieBreakPolicy, VotingMethod};
pub use registry::{Participant, ParticipantRegistry};
pub use result::ProposalResult;
