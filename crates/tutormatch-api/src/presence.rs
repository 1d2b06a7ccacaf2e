//! Handler for `POST /heartbeat`.

use axum::{
  Json,
  extract::State,
  http::StatusCode,
};
use serde::Deserialize;
use tutormatch_core::{participant::PresenceStatus, store::MatchStore};
use tutormatch_engine::{Matchmaker, Notifier};

use crate::{caller::Caller, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct HeartbeatBody {
  pub status: PresenceStatus,
}

/// `POST /heartbeat`: body `{"status":"online"|"active"|"offline"}`.
pub async fn heartbeat<S, N>(
  State(engine): State<Matchmaker<S, N>>,
  Caller(actor): Caller,
  Json(body): Json<HeartbeatBody>,
) -> Result<StatusCode, ApiError>
where
  S: MatchStore + 'static,
  N: Notifier,
{
  engine.record_heartbeat(actor, body.status).await?;
  Ok(StatusCode::NO_CONTENT)
}
