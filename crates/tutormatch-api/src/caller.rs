//! The `x-actor` header extractor.

use axum::{extract::FromRequestParts, http::request::Parts};
use tutormatch_core::Actor;

use crate::error::ApiError;

pub const ACTOR_HEADER: &str = "x-actor";

/// The party making the request, parsed from `x-actor: student:<uuid>` or
/// `x-actor: tutor:<uuid>`. Rejects with 401 when the header is absent or
/// malformed.
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Actor);

impl<St> FromRequestParts<St> for Caller
where
  St: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
    let value = parts
      .headers
      .get(ACTOR_HEADER)
      .ok_or_else(|| ApiError::Unauthenticated(format!("missing {ACTOR_HEADER} header")))?
      .to_str()
      .map_err(|_| ApiError::Unauthenticated(format!("malformed {ACTOR_HEADER} header")))?;

    value
      .parse()
      .map(Caller)
      .map_err(|e| ApiError::Unauthenticated(e.to_string()))
  }
}
