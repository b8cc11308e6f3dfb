//! Fundamental types for the Plenum voting engine.
//!
//! This crate defines the types shared across every other crate in the
//! workspace: participant and proposal identifiers, timestamps, and the
//! injectable clock collaborator.

pub mod clock;
pub mod id;
pub mod time;

pub use clock::{Clock, SystemClock};
pub use id::{ParticipantId, ProposalId};
pub use time::Timestamp;
