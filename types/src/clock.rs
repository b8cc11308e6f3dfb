//! The clock collaborator.
//!
//! The engine never calls `Timestamp::now()` directly; it reads time from
//! an injected `Clock` so deadline behavior is deterministic under test.

use crate::Timestamp;

/// A source of current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time from the operating system.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}
