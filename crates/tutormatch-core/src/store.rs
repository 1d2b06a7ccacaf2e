//! The `MatchStore` trait: the persistence contract the engine requires.
//!
//! Implemented by storage backends (e.g. `tutormatch-store-sqlite`). The
//! engine and the HTTP layer depend on this abstraction, never on a concrete
//! backend. Absent rows are reported as `Ok(None)`.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  Actor,
  matching::{Lesson, Match, MatchFilter, NewLesson, NewMatch},
  notification::{NewNotification, Notification},
  participant::{Affinity, NewStudent, NewTutor, PresenceStatus, Student, Tutor},
  schedule::{Availability, TimeWindow, WeeklySlot},
  subject::Subject,
};

/// Abstraction over a matchmaking store backend.
///
/// All methods return `Send` futures so the trait can be used from tasks
/// spawned on a multi-threaded runtime.
pub trait MatchStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Subjects ──────────────────────────────────────────────────────────

  /// Get-or-create the subject identified by `(name, standard)`.
  fn subject_for<'a>(
    &'a self,
    name: &'a str,
    standard: &'a str,
  ) -> impl Future<Output = Result<Subject, Self::Error>> + Send + 'a;

  fn get_subject(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Subject>, Self::Error>> + Send + '_;

  // ── Participants ──────────────────────────────────────────────────────

  fn add_student(
    &self,
    input: NewStudent,
  ) -> impl Future<Output = Result<Student, Self::Error>> + Send + '_;

  fn get_student(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Student>, Self::Error>> + Send + '_;

  fn add_tutor(
    &self,
    input: NewTutor,
  ) -> impl Future<Output = Result<Tutor, Self::Error>> + Send + '_;

  fn get_tutor(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Tutor>, Self::Error>> + Send + '_;

  /// Record that `tutor_id` teaches `subject_id`. Idempotent.
  fn add_teaching(
    &self,
    tutor_id: Uuid,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn teaches(
    &self,
    tutor_id: Uuid,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Update a tutor's presence and last-seen time. Returns `false` if the
  /// tutor does not exist.
  fn record_heartbeat(
    &self,
    tutor_id: Uuid,
    status: PresenceStatus,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Affinity ──────────────────────────────────────────────────────────

  /// Get-or-create the affinity row for the triple, starting at score 0.
  fn affinity_for(
    &self,
    tutor_id: Uuid,
    student_id: Uuid,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<Affinity, Self::Error>> + Send + '_;

  /// Overwrite a score. The engine never calls this; it exists for the
  /// collaborator that maintains scores.
  fn set_affinity_score(
    &self,
    affinity: Affinity,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Availability ──────────────────────────────────────────────────────

  fn add_availability(
    &self,
    tutor_id: Uuid,
    slot: WeeklySlot,
  ) -> impl Future<Output = Result<Availability, Self::Error>> + Send + '_;

  /// Remove a tutor's slot. Returns `false` if no such slot existed.
  fn remove_availability(
    &self,
    tutor_id: Uuid,
    slot: WeeklySlot,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn list_availability(
    &self,
    tutor_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Availability>, Self::Error>> + Send + '_;

  // ── Ranking queries ───────────────────────────────────────────────────

  /// Tutors teaching the subject who are online and seen after `since`,
  /// with an affinity row for `student_id`, by descending score.
  fn online_affinity_tutors(
    &self,
    student_id: Uuid,
    subject_id: Uuid,
    since: DateTime<Utc>,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;

  /// Up to `count` online tutors teaching the subject, in random order.
  fn online_random_tutors(
    &self,
    subject_id: Uuid,
    since: DateTime<Utc>,
    count: usize,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;

  /// Tutors teaching the subject whose availability covers `window`, with an
  /// affinity row for `student_id`, by descending score.
  fn available_affinity_tutors(
    &self,
    student_id: Uuid,
    subject_id: Uuid,
    window: TimeWindow,
    limit: usize,
    offset: usize,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;

  /// Up to `count` tutors teaching the subject whose availability covers
  /// `window`, in random order.
  fn random_available_tutors(
    &self,
    subject_id: Uuid,
    window: TimeWindow,
    count: usize,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;

  /// Whether the tutor has a scheduled lesson overlapping `window`.
  fn has_conflicting_lesson(
    &self,
    tutor_id: Uuid,
    window: TimeWindow,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Matches ───────────────────────────────────────────────────────────

  /// Persist a new match in the matching state.
  fn create_match(
    &self,
    input: NewMatch,
  ) -> impl Future<Output = Result<Match, Self::Error>> + Send + '_;

  fn get_match(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Match>, Self::Error>> + Send + '_;

  fn list_matches<'a>(
    &'a self,
    filter: &'a MatchFilter,
  ) -> impl Future<Output = Result<Vec<Match>, Self::Error>> + Send + 'a;

  /// Atomically insert a lesson and move the match to matched, bound to
  /// `tutor_id`. Both happen only if the match is still matching; otherwise
  /// nothing is written and `None` is returned. At most one call per match
  /// can ever return `Some`.
  fn complete_match(
    &self,
    match_id: Uuid,
    tutor_id: Uuid,
    lesson: NewLesson,
  ) -> impl Future<Output = Result<Option<Lesson>, Self::Error>> + Send + '_;

  /// Move the match to failed if it is still matching. Returns whether the
  /// transition happened.
  fn fail_match(
    &self,
    match_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Lessons ───────────────────────────────────────────────────────────

  fn get_lesson(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Lesson>, Self::Error>> + Send + '_;

  // ── Notifications ─────────────────────────────────────────────────────

  fn create_notification(
    &self,
    input: NewNotification,
  ) -> impl Future<Output = Result<Notification, Self::Error>> + Send + '_;

  fn get_notification(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Notification>, Self::Error>> + Send + '_;

  /// Notifications for `recipient` created in `[since, until)`, oldest first.
  fn list_notifications(
    &self,
    recipient: Actor,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<Notification>, Self::Error>> + Send + '_;

  /// Set `read` on a notification. Returns `false` if it does not exist.
  fn mark_notification_read(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
