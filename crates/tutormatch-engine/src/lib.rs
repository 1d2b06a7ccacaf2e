//! Matchmaking engine: candidate ranking, live offer delivery, and the match
//! state machine.
//!
//! The [`Matchmaker`] is the entry point. It is generic over any
//! [`tutormatch_core::store::MatchStore`] and any [`Notifier`], and owns the
//! [`OfferRegistry`] that tutors subscribe to for live offers.

pub mod config;
pub mod notify;
pub mod orchestrator;
pub mod ranker;
pub mod registry;

pub use config::EngineConfig;
pub use notify::{LogNotifier, NotificationRecorder, Notifier, NotifyError};
pub use orchestrator::{Matchmaker, RecoveryReport};
pub use ranker::{CandidateRanker, MAX_SCHEDULED_LIMIT};
pub use registry::{OfferRegistry, OfferSubscription, OfferTicket};
