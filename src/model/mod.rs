//! Data models.
//!
//! The same data is shaped differently depending on where it is going:
//! [`db`] for MongoDB documents, [`api`] for JSON over HTTP, and [`common`]
//! for the plain types both are built from.

pub mod api;
pub mod common;
pub mod db;
pub mod mongodb;
