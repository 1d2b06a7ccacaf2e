//! Error taxonomy shared by every layer of the engine.

use thiserror::Error;
use uuid::Uuid;

use crate::matching::MatchStatus;

#[derive(Debug, Error)]
pub enum Error {
  #[error("{kind} not found: {id}")]
  NotFound { kind: &'static str, id: Uuid },

  /// The caller is not the party the operation belongs to.
  #[error("unauthorized")]
  Unauthorized,

  #[error("match {match_id} is {status}, not matching")]
  InvalidState { match_id: Uuid, status: MatchStatus },

  #[error("no eligible tutors found")]
  NoCandidates,

  #[error("invalid request: {0}")]
  InvalidRequest(String),

  /// The store or another collaborator failed.
  #[error("upstream unavailable: {0}")]
  UpstreamUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn not_found(kind: &'static str, id: Uuid) -> Self {
    Self::NotFound { kind, id }
  }

  pub fn upstream<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::UpstreamUnavailable(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
