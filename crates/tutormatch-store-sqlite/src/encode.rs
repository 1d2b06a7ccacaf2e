//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microsecond
//! precision, `Z` suffix) so that lexicographic comparison in SQL matches
//! chronological order. UUIDs are stored as hyphenated lowercase strings and
//! enums as lowercase text.

use chrono::{DateTime, SecondsFormat, Utc};
use tutormatch_core::{
  Actor,
  matching::{Lesson, Match, MatchMode, MatchStatus},
  notification::Notification,
  participant::{PresenceStatus, Student, Tutor},
  schedule::{Availability, TimeWindow, WeeklySlot},
  subject::Subject,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_window(start: &str, end: &str) -> Result<TimeWindow> {
  TimeWindow::new(decode_dt(start)?, decode_dt(end)?)
    .map_err(|e| Error::Decode(e.to_string()))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn encode_mode(m: MatchMode) -> &'static str { m.as_str() }

pub fn decode_mode(s: &str) -> Result<MatchMode> {
  match s {
    "on_demand" => Ok(MatchMode::OnDemand),
    "scheduled" => Ok(MatchMode::Scheduled),
    other => Err(Error::Decode(format!("unknown match mode: {other:?}"))),
  }
}

pub fn encode_status(s: MatchStatus) -> &'static str { s.as_str() }

pub fn decode_status(s: &str) -> Result<MatchStatus> {
  match s {
    "matching" => Ok(MatchStatus::Matching),
    "matched" => Ok(MatchStatus::Matched),
    "failed" => Ok(MatchStatus::Failed),
    other => Err(Error::Decode(format!("unknown match status: {other:?}"))),
  }
}

pub fn encode_presence(p: PresenceStatus) -> &'static str {
  match p {
    PresenceStatus::Online => "online",
    PresenceStatus::Active => "active",
    PresenceStatus::Offline => "offline",
  }
}

pub fn decode_presence(s: &str) -> Result<PresenceStatus> {
  match s {
    "online" => Ok(PresenceStatus::Online),
    "active" => Ok(PresenceStatus::Active),
    "offline" => Ok(PresenceStatus::Offline),
    other => Err(Error::Decode(format!("unknown presence: {other:?}"))),
  }
}

/// `(recipient_role, recipient_id)` columns.
pub fn encode_actor(actor: Actor) -> (&'static str, String) {
  match actor {
    Actor::Student(id) => ("student", encode_uuid(id)),
    Actor::Tutor(id) => ("tutor", encode_uuid(id)),
  }
}

pub fn decode_actor(role: &str, id: &str) -> Result<Actor> {
  let id = decode_uuid(id)?;
  match role {
    "student" => Ok(Actor::Student(id)),
    "tutor" => Ok(Actor::Tutor(id)),
    other => Err(Error::Decode(format!("unknown recipient role: {other:?}"))),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `subjects` row.
pub struct RawSubject {
  pub subject_id: String,
  pub name:       String,
  pub standard:   String,
}

impl RawSubject {
  pub fn into_subject(self) -> Result<Subject> {
    Ok(Subject {
      subject_id: decode_uuid(&self.subject_id)?,
      name:       self.name,
      standard:   self.standard,
    })
  }
}

pub struct RawStudent {
  pub student_id: String,
  pub first_name: String,
  pub push_token: Option<String>,
}

impl RawStudent {
  pub fn into_student(self) -> Result<Student> {
    Ok(Student {
      student_id: decode_uuid(&self.student_id)?,
      first_name: self.first_name,
      push_token: self.push_token,
    })
  }
}

pub struct RawTutor {
  pub tutor_id:   String,
  pub first_name: String,
  pub push_token: Option<String>,
  pub presence:   String,
  pub last_seen:  String,
}

impl RawTutor {
  pub fn into_tutor(self) -> Result<Tutor> {
    Ok(Tutor {
      tutor_id:   decode_uuid(&self.tutor_id)?,
      first_name: self.first_name,
      push_token: self.push_token,
      presence:   decode_presence(&self.presence)?,
      last_seen:  decode_dt(&self.last_seen)?,
    })
  }
}

pub struct RawAvailability {
  pub availability_id: String,
  pub tutor_id:        String,
  pub start_offset:    i64,
  pub end_offset:      i64,
}

impl RawAvailability {
  pub fn into_availability(self) -> Result<Availability> {
    Ok(Availability {
      availability_id: decode_uuid(&self.availability_id)?,
      tutor_id:        decode_uuid(&self.tutor_id)?,
      slot:            WeeklySlot::new(self.start_offset, self.end_offset)
        .map_err(|e| Error::Decode(e.to_string()))?,
    })
  }
}

/// Column list matching [`RawMatch::from_row`].
pub const MATCH_COLUMNS: &str = "match_id, mode, status, student_id, tutor_id, \
   subject_id, window_start, window_end, lesson_id, created_at";

pub struct RawMatch {
  pub match_id:     String,
  pub mode:         String,
  pub status:       String,
  pub student_id:   String,
  pub tutor_id:     Option<String>,
  pub subject_id:   String,
  pub window_start: Option<String>,
  pub window_end:   Option<String>,
  pub lesson_id:    Option<String>,
  pub created_at:   String,
}

impl RawMatch {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      match_id:     row.get(0)?,
      mode:         row.get(1)?,
      status:       row.get(2)?,
      student_id:   row.get(3)?,
      tutor_id:     row.get(4)?,
      subject_id:   row.get(5)?,
      window_start: row.get(6)?,
      window_end:   row.get(7)?,
      lesson_id:    row.get(8)?,
      created_at:   row.get(9)?,
    })
  }

  pub fn into_match(self) -> Result<Match> {
    let window = match (self.window_start, self.window_end) {
      (Some(start), Some(end)) => Some(decode_window(&start, &end)?),
      _ => None,
    };

    Ok(Match {
      match_id: decode_uuid(&self.match_id)?,
      mode: decode_mode(&self.mode)?,
      status: decode_status(&self.status)?,
      student_id: decode_uuid(&self.student_id)?,
      tutor_id: self.tutor_id.as_deref().map(decode_uuid).transpose()?,
      subject_id: decode_uuid(&self.subject_id)?,
      window,
      lesson_id: self.lesson_id.as_deref().map(decode_uuid).transpose()?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawLesson {
  pub lesson_id:  String,
  pub subject_id: String,
  pub tutor_id:   String,
  pub student_id: String,
  pub scheduled:  bool,
  pub start_at:   String,
  pub end_at:     String,
  pub summary:    Option<String>,
}

impl RawLesson {
  pub fn into_lesson(self) -> Result<Lesson> {
    Ok(Lesson {
      lesson_id:  decode_uuid(&self.lesson_id)?,
      subject_id: decode_uuid(&self.subject_id)?,
      tutor_id:   decode_uuid(&self.tutor_id)?,
      student_id: decode_uuid(&self.student_id)?,
      scheduled:  self.scheduled,
      window:     decode_window(&self.start_at, &self.end_at)?,
      summary:    self.summary,
    })
  }
}

/// Column list matching [`RawNotification::from_row`].
pub const NOTIFICATION_COLUMNS: &str = "notification_id, recipient_role, \
   recipient_id, title, subtitle, image, read, created_at";

pub struct RawNotification {
  pub notification_id: String,
  pub recipient_role:  String,
  pub recipient_id:    String,
  pub title:           String,
  pub subtitle:        String,
  pub image:           String,
  pub read:            bool,
  pub created_at:      String,
}

impl RawNotification {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      notification_id: row.get(0)?,
      recipient_role:  row.get(1)?,
      recipient_id:    row.get(2)?,
      title:           row.get(3)?,
      subtitle:        row.get(4)?,
      image:           row.get(5)?,
      read:            row.get(6)?,
      created_at:      row.get(7)?,
    })
  }

  pub fn into_notification(self) -> Result<Notification> {
    Ok(Notification {
      notification_id: decode_uuid(&self.notification_id)?,
      recipient:       decode_actor(&self.recipient_role, &self.recipient_id)?,
      title:           self.title,
      subtitle:        self.subtitle,
      image:           self.image,
      read:            self.read,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}
