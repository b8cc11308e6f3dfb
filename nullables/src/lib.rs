//! Nullable infrastructure for deterministic testing.
//!
//! The engine's external collaborators (clock, storage) are abstracted
//! behind traits. This crate provides test-friendly implementations that
//! return deterministic values, can be controlled programmatically, and
//! never touch the filesystem.
//!
//! Usage: swap real implementations for nullables in tests, or use
//! `NullStore` directly when no durability is wanted.

pub mod clock;
pub mod store;

pub use clock::NullClock;
pub use store::NullStore;
