//! Subjects: what a tutor teaches and a student asks for.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A subject at a given standard, e.g. "Math" at "O-Level". Immutable once
/// created; the `(name, standard)` pair is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
  pub subject_id: Uuid,
  pub name:       String,
  pub standard:   String,
}

/// A subject as named by a caller, resolved by get-or-create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectRef {
  pub name:     String,
  pub standard: String,
}

impl SubjectRef {
  pub fn new(name: impl Into<String>, standard: impl Into<String>) -> Self {
    Self { name: name.into(), standard: standard.into() }
  }
}
