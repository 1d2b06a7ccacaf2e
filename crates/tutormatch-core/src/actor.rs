//! The caller of an operation: either a student or a tutor.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;

/// An authenticated party. Resolving credentials into an `Actor` is the
/// transport layer's job; everything below it only pattern-matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "role", content = "id", rename_all = "lowercase")]
pub enum Actor {
  Student(Uuid),
  Tutor(Uuid),
}

impl Actor {
  pub fn id(&self) -> Uuid {
    match self {
      Self::Student(id) | Self::Tutor(id) => *id,
    }
  }

  /// The student id, or [`Error::Unauthorized`] for a tutor.
  pub fn student(&self) -> Result<Uuid, Error> {
    match self {
      Self::Student(id) => Ok(*id),
      Self::Tutor(_) => Err(Error::Unauthorized),
    }
  }

  /// The tutor id, or [`Error::Unauthorized`] for a student.
  pub fn tutor(&self) -> Result<Uuid, Error> {
    match self {
      Self::Tutor(id) => Ok(*id),
      Self::Student(_) => Err(Error::Unauthorized),
    }
  }
}

/// `student:<uuid>` / `tutor:<uuid>`.
impl fmt::Display for Actor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Student(id) => write!(f, "student:{id}"),
      Self::Tutor(id) => write!(f, "tutor:{id}"),
    }
  }
}

impl FromStr for Actor {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (role, id) = s
      .split_once(':')
      .ok_or_else(|| Error::InvalidRequest(format!("malformed actor: {s:?}")))?;
    let id = Uuid::parse_str(id.trim())
      .map_err(|e| Error::InvalidRequest(format!("malformed actor id: {e}")))?;
    match role.trim() {
      "student" => Ok(Self::Student(id)),
      "tutor" => Ok(Self::Tutor(id)),
      other => Err(Error::InvalidRequest(format!("unknown role: {other:?}"))),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display_and_parse_agree() {
    let id = Uuid::new_v4();
    let actor = Actor::Tutor(id);
    let parsed: Actor = actor.to_string().parse().unwrap();
    assert_eq!(parsed, actor);
  }

  #[test]
  fn parse_rejects_unknown_role() {
    let err = format!("admin:{}", Uuid::new_v4()).parse::<Actor>().unwrap_err();
    assert!(matches!(err, Error::InvalidRequest(_)));
  }

  #[test]
  fn role_accessors_reject_the_other_party() {
    let student = Actor::Student(Uuid::new_v4());
    assert!(student.student().is_ok());
    assert!(matches!(student.tutor(), Err(Error::Unauthorized)));
  }
}
