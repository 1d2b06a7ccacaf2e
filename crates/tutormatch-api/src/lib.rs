//! JSON and SSE HTTP API for the matchmaking engine.
//!
//! Exposes an axum [`Router`] backed by a [`Matchmaker`]. The caller is
//! asserted by the `x-actor` header (`student:<uuid>` or `tutor:<uuid>`);
//! verifying that assertion is the job of whatever sits in front.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", tutormatch_api::api_router(engine.clone()))
//! ```

pub mod caller;
pub mod candidates;
pub mod error;
pub mod matches;
pub mod notifications;
pub mod offers;
pub mod presence;

use axum::{
  Router,
  routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tutormatch_core::store::MatchStore;
use tutormatch_engine::{Matchmaker, Notifier};

pub use caller::Caller;
pub use error::ApiError;

/// Build the API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, N>(engine: Matchmaker<S, N>) -> Router<()>
where
  S: MatchStore + 'static,
  N: Notifier,
{
  Router::new()
    // On-demand
    .route("/matches/on-demand", post(matches::request_on_demand::<S, N>))
    .route("/matches/on-demand/{id}/accept", post(matches::accept_on_demand::<S, N>))
    // Scheduled
    .route("/matches/scheduled", post(matches::request_scheduled::<S, N>))
    .route("/matches/scheduled/{id}/accept", post(matches::accept_scheduled::<S, N>))
    .route("/candidates/scheduled", get(candidates::scheduled::<S, N>))
    // Either mode
    .route("/matches/pending", get(matches::pending::<S, N>))
    .route("/matches/{id}", get(matches::check::<S, N>))
    // Tutors
    .route("/offers", get(offers::subscribe::<S, N>))
    .route("/heartbeat", post(presence::heartbeat::<S, N>))
    // Notifications
    .route("/notifications", get(notifications::list::<S, N>))
    .route("/notifications/{id}/read", post(notifications::mark_read::<S, N>))
    .layer(TraceLayer::new_for_http())
    .with_state(engine)
}

#[cfg(test)]
mod tests;
