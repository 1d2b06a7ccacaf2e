//! The slice of student and tutor accounts that matching reads.
//!
//! Profile management lives elsewhere; these records only carry what the
//! engine needs to rank tutors and address notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Presence reported by a tutor's client heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
  /// Connected and idle: eligible for on-demand offers.
  Online,
  /// Connected but busy in a lesson.
  Active,
  #[default]
  Offline,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
  pub student_id: Uuid,
  pub first_name: String,
  /// Device registration token for push delivery.
  #[serde(skip_serializing)]
  pub push_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tutor {
  pub tutor_id:   Uuid,
  pub first_name: String,
  #[serde(skip_serializing)]
  pub push_token: Option<String>,
  pub presence:   PresenceStatus,
  pub last_seen:  DateTime<Utc>,
}

/// Input to [`crate::store::MatchStore::add_student`].
#[derive(Debug, Clone)]
pub struct NewStudent {
  pub first_name: String,
  pub push_token: Option<String>,
}

/// Input to [`crate::store::MatchStore::add_tutor`]. New tutors start
/// [`PresenceStatus::Offline`].
#[derive(Debug, Clone)]
pub struct NewTutor {
  pub first_name: String,
  pub push_token: Option<String>,
}

/// Relationship score between a student and a tutor for one subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Affinity {
  pub tutor_id:   Uuid,
  pub student_id: Uuid,
  pub subject_id: Uuid,
  pub score:      i64,
}
