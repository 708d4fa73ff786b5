//! Types shared between the database, API and tally representations.

pub mod election;
pub mod voter;
