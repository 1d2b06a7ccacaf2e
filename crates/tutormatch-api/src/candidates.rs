//! Handler for `GET /candidates/scheduled`.

use axum::{
  Json,
  extract::{Query, State},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tutormatch_core::{store::MatchStore, subject::SubjectRef};
use tutormatch_engine::{Matchmaker, Notifier};
use uuid::Uuid;

use crate::{caller::Caller, error::ApiError};

const DEFAULT_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
pub struct CandidateParams {
  pub subject:  String,
  pub standard: String,
  pub start:    DateTime<Utc>,
  pub end:      DateTime<Utc>,
  pub limit:    Option<usize>,
}

/// `GET /candidates/scheduled?subject=...&standard=...&start=...&end=...[&limit=...]`
///
/// Tutor ids, best first. 404 when nobody is free.
pub async fn scheduled<S, N>(
  State(engine): State<Matchmaker<S, N>>,
  Caller(actor): Caller,
  Query(params): Query<CandidateParams>,
) -> Result<Json<Vec<Uuid>>, ApiError>
where
  S: MatchStore + 'static,
  N: Notifier,
{
  let subject = SubjectRef::new(params.subject, params.standard);
  let tutors = engine
    .rank_scheduled_candidates(
      actor,
      &subject,
      params.start,
      params.end,
      params.limit.unwrap_or(DEFAULT_LIMIT),
    )
    .await?;
  Ok(Json(tutors))
}
