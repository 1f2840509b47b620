//! # session-core
//!
//! Pure logic for syncbind sessions (no I/O, instant tests).
//!
//! This crate implements the session state machine, the retry backoff
//! calculation and error classification without any network, disk or
//! timer I/O, enabling fast unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about state transitions
//!
//! The actual I/O (transport calls, authentication round trips) is performed
//! by `session-client`, which interprets the actions produced here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backoff;
pub mod policy;
pub mod state;

pub use backoff::Backoff;
pub use policy::{CodeRange, ErrorClass, ErrorPolicy};
pub use state::{Action, Event, SessionState};
