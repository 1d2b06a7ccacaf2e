//! Handlers for `/notifications` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/notifications` | Optional `since`, `until`; defaults to the last 30 days |
//! | `POST` | `/notifications/:id/read` | Recipient only; returns 204 |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tutormatch_core::{notification::Notification, store::MatchStore};
use tutormatch_engine::{Matchmaker, Notifier};
use uuid::Uuid;

use crate::{caller::Caller, error::ApiError};

const DEFAULT_LOOKBACK_DAYS: i64 = 30;

#[derive(Debug, Deserialize, Default)]
pub struct ListParams {
  pub since: Option<DateTime<Utc>>,
  pub until: Option<DateTime<Utc>>,
}

/// `GET /notifications[?since=...][&until=...]`, oldest first.
pub async fn list<S, N>(
  State(engine): State<Matchmaker<S, N>>,
  Caller(actor): Caller,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Notification>>, ApiError>
where
  S: MatchStore + 'static,
  N: Notifier,
{
  let until = params.until.unwrap_or_else(Utc::now);
  let since = params
    .since
    .unwrap_or_else(|| until - Duration::days(DEFAULT_LOOKBACK_DAYS));
  Ok(Json(engine.notifications(actor, since, until).await?))
}

/// `POST /notifications/:id/read`
pub async fn mark_read<S, N>(
  State(engine): State<Matchmaker<S, N>>,
  Caller(actor): Caller,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: MatchStore + 'static,
  N: Notifier,
{
  engine.mark_notification_read(actor, id).await?;
  Ok(StatusCode::NO_CONTENT)
}
