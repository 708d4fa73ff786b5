//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in an DB-friendly way, e.g.:
//!
//! - datetimes are serialised in MongoDB's own format.

pub mod election;
pub mod voter;
