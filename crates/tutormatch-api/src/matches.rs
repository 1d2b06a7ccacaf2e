//! Handlers for `/matches` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/matches/on-demand` | Body: [`SubjectBody`]; returns 202 + `{"match_id"}` |
//! | `POST` | `/matches/on-demand/:id/accept` | Tutor only; returns the lesson |
//! | `POST` | `/matches/scheduled` | Body: [`ScheduledBody`]; returns 201 + the match |
//! | `POST` | `/matches/scheduled/:id/accept` | Designated tutor only; returns the lesson |
//! | `GET`  | `/matches/pending` | Caller's matches still waiting |
//! | `GET`  | `/matches/:id` | Student poll; returns a [`MatchOutcome`] |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tutormatch_core::{
  matching::{Lesson, Match, MatchOutcome},
  store::MatchStore,
  subject::SubjectRef,
};
use tutormatch_engine::{Matchmaker, Notifier};
use uuid::Uuid;

use crate::{caller::Caller, error::ApiError};

/// A subject as named by clients.
#[derive(Debug, Deserialize)]
pub struct SubjectBody {
  pub subject:  String,
  pub standard: String,
}

impl From<SubjectBody> for SubjectRef {
  fn from(b: SubjectBody) -> Self { SubjectRef::new(b.subject, b.standard) }
}

#[derive(Debug, Serialize)]
pub struct MatchCreated {
  pub match_id: Uuid,
}

// ─── On-demand ────────────────────────────────────────────────────────────────

/// `POST /matches/on-demand`: returns 202 while candidates are tried in the
/// background.
pub async fn request_on_demand<S, N>(
  State(engine): State<Matchmaker<S, N>>,
  Caller(actor): Caller,
  Json(body): Json<SubjectBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: MatchStore + 'static,
  N: Notifier,
{
  let m = engine.request_on_demand(actor, &body.into()).await?;
  Ok((
    StatusCode::ACCEPTED,
    Json(MatchCreated {
      match_id: m.match_id,
    }),
  ))
}

/// `POST /matches/on-demand/:id/accept`
pub async fn accept_on_demand<S, N>(
  State(engine): State<Matchmaker<S, N>>,
  Caller(actor): Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Lesson>, ApiError>
where
  S: MatchStore + 'static,
  N: Notifier,
{
  Ok(Json(engine.accept_on_demand(actor, id).await?))
}

// ─── Scheduled ────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /matches/scheduled`.
#[derive(Debug, Deserialize)]
pub struct ScheduledBody {
  pub tutor_id: Uuid,
  pub subject:  String,
  pub standard: String,
  pub start:    DateTime<Utc>,
  pub end:      DateTime<Utc>,
}

/// `POST /matches/scheduled`: returns 201 + the stored [`Match`].
pub async fn request_scheduled<S, N>(
  State(engine): State<Matchmaker<S, N>>,
  Caller(actor): Caller,
  Json(body): Json<ScheduledBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: MatchStore + 'static,
  N: Notifier,
{
  let subject = SubjectRef::new(body.subject, body.standard);
  let m = engine
    .request_scheduled(actor, body.tutor_id, &subject, body.start, body.end)
    .await?;
  Ok((StatusCode::CREATED, Json(m)))
}

/// `POST /matches/scheduled/:id/accept`
pub async fn accept_scheduled<S, N>(
  State(engine): State<Matchmaker<S, N>>,
  Caller(actor): Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Lesson>, ApiError>
where
  S: MatchStore + 'static,
  N: Notifier,
{
  Ok(Json(engine.accept_scheduled(actor, id).await?))
}

// ─── Either mode ──────────────────────────────────────────────────────────────

/// `GET /matches/pending`
pub async fn pending<S, N>(
  State(engine): State<Matchmaker<S, N>>,
  Caller(actor): Caller,
) -> Result<Json<Vec<Match>>, ApiError>
where
  S: MatchStore + 'static,
  N: Notifier,
{
  Ok(Json(engine.pending_matches(actor).await?))
}

/// `GET /matches/:id`
pub async fn check<S, N>(
  State(engine): State<Matchmaker<S, N>>,
  Caller(actor): Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<MatchOutcome>, ApiError>
where
  S: MatchStore + 'static,
  N: Notifier,
{
  Ok(Json(engine.check_for_match(actor, id).await?))
}
