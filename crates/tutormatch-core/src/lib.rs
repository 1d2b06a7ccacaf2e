//! Core types and trait definitions for the tutor matchmaking engine.
//!
//! No HTTP, database or runtime dependencies. Every other crate in the
//! workspace depends on this one.

pub mod actor;
pub mod error;
pub mod matching;
pub mod notification;
pub mod participant;
pub mod schedule;
pub mod store;
pub mod subject;

pub use actor::Actor;
pub use error::{Error, Result};
