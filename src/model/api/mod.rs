//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way, e.g. IDs
//! are serialised as hex strings.

pub mod auth;
pub mod ballot;
pub mod election;
pub mod id;
pub mod receipt;
pub mod session;
pub mod statistics;
