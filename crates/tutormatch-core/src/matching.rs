//! Matches, the lessons they resolve into, and the offers sent while they
//! are pending.
//!
//! A match starts in [`MatchStatus::Matching`] and moves exactly once, to
//! either [`MatchStatus::Matched`] or [`MatchStatus::Failed`]. The store only
//! ever performs that move as a conditional update on the current status.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{schedule::TimeWindow, subject::Subject};

// ─── Mode & status ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
  /// Best tutor currently online, resolved through sequential offers.
  OnDemand,
  /// A named tutor for a future window, resolved within the expiry period.
  Scheduled,
}

impl MatchMode {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::OnDemand => "on_demand",
      Self::Scheduled => "scheduled",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
  Matching,
  Matched,
  Failed,
}

impl MatchStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Matching => "matching",
      Self::Matched => "matched",
      Self::Failed => "failed",
    }
  }

  pub fn is_terminal(self) -> bool { !matches!(self, Self::Matching) }
}

impl fmt::Display for MatchStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Match ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
  pub match_id:   Uuid,
  pub mode:       MatchMode,
  pub status:     MatchStatus,
  pub student_id: Uuid,
  /// Fixed for scheduled matches; set on acceptance for on-demand ones.
  pub tutor_id:   Option<Uuid>,
  pub subject_id: Uuid,
  /// Scheduled matches only.
  pub window:     Option<TimeWindow>,
  /// Set exactly when the match becomes [`MatchStatus::Matched`].
  pub lesson_id:  Option<Uuid>,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::MatchStore::create_match`]. Every match is
/// created in [`MatchStatus::Matching`].
#[derive(Debug, Clone)]
pub struct NewMatch {
  pub mode:       MatchMode,
  pub student_id: Uuid,
  pub tutor_id:   Option<Uuid>,
  pub subject_id: Uuid,
  pub window:     Option<TimeWindow>,
}

impl NewMatch {
  pub fn on_demand(student_id: Uuid, subject_id: Uuid) -> Self {
    Self {
      mode: MatchMode::OnDemand,
      student_id,
      tutor_id: None,
      subject_id,
      window: None,
    }
  }

  pub fn scheduled(
    student_id: Uuid,
    tutor_id: Uuid,
    subject_id: Uuid,
    window: TimeWindow,
  ) -> Self {
    Self {
      mode: MatchMode::Scheduled,
      student_id,
      tutor_id: Some(tutor_id),
      subject_id,
      window: Some(window),
    }
  }
}

/// Parameters for [`crate::store::MatchStore::list_matches`].
#[derive(Debug, Clone, Default)]
pub struct MatchFilter {
  pub status:     Option<MatchStatus>,
  pub mode:       Option<MatchMode>,
  pub student_id: Option<Uuid>,
  pub tutor_id:   Option<Uuid>,
}

// ─── Lesson ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
  pub lesson_id:  Uuid,
  pub subject_id: Uuid,
  pub tutor_id:   Uuid,
  pub student_id: Uuid,
  pub scheduled:  bool,
  pub window:     TimeWindow,
  pub summary:    Option<String>,
}

/// The lesson inserted alongside a match's transition to matched. Tutor,
/// student and subject come from the match row itself.
#[derive(Debug, Clone, Copy)]
pub struct NewLesson {
  pub scheduled: bool,
  pub window:    TimeWindow,
}

// ─── Poll result ─────────────────────────────────────────────────────────────

/// What a student sees when polling a match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "lesson", rename_all = "snake_case")]
pub enum MatchOutcome {
  Pending,
  Matched(Lesson),
  /// An on-demand match ran out of candidates.
  Failed,
  /// A scheduled match was not accepted in time.
  Expired,
}

// ─── Offer ───────────────────────────────────────────────────────────────────

/// The student details a tutor sees in an offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentSnapshot {
  pub student_id: Uuid,
  pub first_name: String,
}

/// A transient request for one tutor to accept a pending on-demand match.
/// Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOffer {
  pub match_id:   Uuid,
  pub student:    StudentSnapshot,
  pub subject:    Subject,
  /// End of the window in which this tutor is being asked.
  pub expires_at: DateTime<Utc>,
}
