//! # session-types
//!
//! Value types for the syncbind session lifecycle manager.
//!
//! This crate provides the foundational types used across all syncbind crates:
//! - [`SessionId`] - Identity of a session, used in logs
//! - [`AccessToken`] - Short-lived token authorizing a bind to one target
//! - [`Credentials`] - Refresh credential exchanged for access tokens
//! - [`ErrorCode`] - Numeric error codes reported by the transport layer
//! - [`SessionError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod code;
mod credentials;
mod error;
mod ids;
mod token;

pub use code::ErrorCode;
pub use credentials::{Credentials, LoginType};
pub use error::SessionError;
pub use ids::SessionId;
pub use token::{now_millis, AccessToken};
