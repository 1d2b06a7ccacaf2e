//! The SQLite implementation of [`MatchStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use tutormatch_core::{
  Actor,
  matching::{Lesson, Match, MatchFilter, MatchStatus, NewLesson, NewMatch},
  notification::{NewNotification, Notification},
  participant::{Affinity, NewStudent, NewTutor, PresenceStatus, Student, Tutor},
  schedule::{Availability, TimeWindow, WEEK_SECS, WeeklySlot},
  store::MatchStore,
  subject::Subject,
};
use uuid::Uuid;

use crate::{
  Result,
  encode::{
    MATCH_COLUMNS, NOTIFICATION_COLUMNS, RawAvailability, RawLesson, RawMatch,
    RawNotification, RawStudent, RawSubject, RawTutor, decode_uuid, encode_actor,
    encode_dt, encode_mode, encode_presence, encode_status, encode_uuid,
  },
  schema::SCHEMA,
};

/// Availability predicate shared by the scheduled ranking queries. Expects
/// the tutor column as `te.tutor_id`, the folded window bounds bound to
/// `:ws`/`:we` and the week length to `:wk`.
const COVERS_WINDOW: &str = "EXISTS (
       SELECT 1 FROM availabilities av
       WHERE av.tutor_id = te.tutor_id
         AND ((av.start_offset <= :ws AND av.end_offset >= :we)
           OR (av.start_offset <= :ws + :wk AND av.end_offset >= :we + :wk)))";

fn collect_ids(raw: Vec<String>) -> Result<Vec<Uuid>> {
  raw.iter().map(|s| decode_uuid(s)).collect()
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A matchmaking store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    tracing::debug!("schema initialised");
    Ok(())
  }

  /// Run a single-column id query with named parameters.
  async fn query_ids(
    &self,
    sql: String,
    params: Vec<(&'static str, rusqlite::types::Value)>,
  ) -> Result<Vec<Uuid>> {
    let raw: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let named: Vec<(&str, &dyn rusqlite::ToSql)> = params
          .iter()
          .map(|(name, value)| (*name, value as &dyn rusqlite::ToSql))
          .collect();
        let rows = stmt
          .query_map(named.as_slice(), |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;
    collect_ids(raw)
  }
}

fn text(s: String) -> rusqlite::types::Value { rusqlite::types::Value::Text(s) }

fn int(i: i64) -> rusqlite::types::Value { rusqlite::types::Value::Integer(i) }

/// Named parameters describing a window folded onto the week.
fn window_params(window: &TimeWindow) -> [(&'static str, rusqlite::types::Value); 3] {
  let (start, end) = window.week_offsets();
  [(":ws", int(start)), (":we", int(end)), (":wk", int(WEEK_SECS))]
}

// ─── MatchStore impl ─────────────────────────────────────────────────────────

impl MatchStore for SqliteStore {
  type Error = crate::Error;

  // ── Subjects ──────────────────────────────────────────────────────────────

  async fn subject_for(&self, name: &str, standard: &str) -> Result<Subject> {
    let new_id   = encode_uuid(Uuid::new_v4());
    let name     = name.to_owned();
    let standard = standard.to_owned();

    let raw: RawSubject = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO subjects (subject_id, name, standard)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![new_id, name, standard],
        )?;
        Ok(conn.query_row(
          "SELECT subject_id, name, standard FROM subjects
           WHERE name = ?1 AND standard = ?2",
          rusqlite::params![name, standard],
          |row| {
            Ok(RawSubject {
              subject_id: row.get(0)?,
              name:       row.get(1)?,
              standard:   row.get(2)?,
            })
          },
        )?)
      })
      .await?;

    raw.into_subject()
  }

  async fn get_subject(&self, id: Uuid) -> Result<Option<Subject>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawSubject> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT subject_id, name, standard FROM subjects WHERE subject_id = ?1",
            rusqlite::params![id_str],
            |row| {
              Ok(RawSubject {
                subject_id: row.get(0)?,
                name:       row.get(1)?,
                standard:   row.get(2)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSubject::into_subject).transpose()
  }

  // ── Participants ──────────────────────────────────────────────────────────

  async fn add_student(&self, input: NewStudent) -> Result<Student> {
    let student = Student {
      student_id: Uuid::new_v4(),
      first_name: input.first_name,
      push_token: input.push_token,
    };

    let id_str = encode_uuid(student.student_id);
    let name   = student.first_name.clone();
    let token  = student.push_token.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO students (student_id, first_name, push_token) VALUES (?1, ?2, ?3)",
          rusqlite::params![id_str, name, token],
        )?;
        Ok(())
      })
      .await?;

    Ok(student)
  }

  async fn get_student(&self, id: Uuid) -> Result<Option<Student>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawStudent> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT student_id, first_name, push_token FROM students WHERE student_id = ?1",
            rusqlite::params![id_str],
            |row| {
              Ok(RawStudent {
                student_id: row.get(0)?,
                first_name: row.get(1)?,
                push_token: row.get(2)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawStudent::into_student).transpose()
  }

  async fn add_tutor(&self, input: NewTutor) -> Result<Tutor> {
    let tutor = Tutor {
      tutor_id:   Uuid::new_v4(),
      first_name: input.first_name,
      push_token: input.push_token,
      presence:   PresenceStatus::Offline,
      last_seen:  Utc::now(),
    };

    let id_str   = encode_uuid(tutor.tutor_id);
    let name     = tutor.first_name.clone();
    let token    = tutor.push_token.clone();
    let presence = encode_presence(tutor.presence);
    let seen_str = encode_dt(tutor.last_seen);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO tutors (tutor_id, first_name, push_token, presence, last_seen)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, name, token, presence, seen_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(tutor)
  }

  async fn get_tutor(&self, id: Uuid) -> Result<Option<Tutor>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawTutor> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT tutor_id, first_name, push_token, presence, last_seen
             FROM tutors WHERE tutor_id = ?1",
            rusqlite::params![id_str],
            |row| {
              Ok(RawTutor {
                tutor_id:   row.get(0)?,
                first_name: row.get(1)?,
                push_token: row.get(2)?,
                presence:   row.get(3)?,
                last_seen:  row.get(4)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawTutor::into_tutor).transpose()
  }

  async fn add_teaching(&self, tutor_id: Uuid, subject_id: Uuid) -> Result<()> {
    let tutor_str   = encode_uuid(tutor_id);
    let subject_str = encode_uuid(subject_id);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO teaching (tutor_id, subject_id) VALUES (?1, ?2)",
          rusqlite::params![tutor_str, subject_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn teaches(&self, tutor_id: Uuid, subject_id: Uuid) -> Result<bool> {
    let tutor_str   = encode_uuid(tutor_id);
    let subject_str = encode_uuid(subject_id);

    let found = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT EXISTS (
             SELECT 1 FROM teaching WHERE tutor_id = ?1 AND subject_id = ?2)",
          rusqlite::params![tutor_str, subject_str],
          |row| row.get::<_, bool>(0),
        )?)
      })
      .await?;

    Ok(found)
  }

  async fn record_heartbeat(
    &self,
    tutor_id: Uuid,
    status:   PresenceStatus,
    at:       DateTime<Utc>,
  ) -> Result<bool> {
    let id_str   = encode_uuid(tutor_id);
    let presence = encode_presence(status);
    let at_str   = encode_dt(at);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE tutors SET presence = ?2, last_seen = ?3 WHERE tutor_id = ?1",
          rusqlite::params![id_str, presence, at_str],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  // ── Affinity ──────────────────────────────────────────────────────────────

  async fn affinity_for(
    &self,
    tutor_id:   Uuid,
    student_id: Uuid,
    subject_id: Uuid,
  ) -> Result<Affinity> {
    let tutor_str   = encode_uuid(tutor_id);
    let student_str = encode_uuid(student_id);
    let subject_str = encode_uuid(subject_id);

    let score: i64 = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO affinity (tutor_id, student_id, subject_id, score)
           VALUES (?1, ?2, ?3, 0)",
          rusqlite::params![tutor_str, student_str, subject_str],
        )?;
        Ok(conn.query_row(
          "SELECT score FROM affinity
           WHERE tutor_id = ?1 AND student_id = ?2 AND subject_id = ?3",
          rusqlite::params![tutor_str, student_str, subject_str],
          |row| row.get(0),
        )?)
      })
      .await?;

    Ok(Affinity { tutor_id, student_id, subject_id, score })
  }

  async fn set_affinity_score(&self, affinity: Affinity) -> Result<()> {
    let tutor_str   = encode_uuid(affinity.tutor_id);
    let student_str = encode_uuid(affinity.student_id);
    let subject_str = encode_uuid(affinity.subject_id);
    let score       = affinity.score;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO affinity (tutor_id, student_id, subject_id, score)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (tutor_id, student_id, subject_id)
           DO UPDATE SET score = excluded.score",
          rusqlite::params![tutor_str, student_str, subject_str, score],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Availability ──────────────────────────────────────────────────────────

  async fn add_availability(
    &self,
    tutor_id: Uuid,
    slot:     WeeklySlot,
  ) -> Result<Availability> {
    let availability = Availability {
      availability_id: Uuid::new_v4(),
      tutor_id,
      slot,
    };

    let id_str    = encode_uuid(availability.availability_id);
    let tutor_str = encode_uuid(tutor_id);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO availabilities (availability_id, tutor_id, start_offset, end_offset)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, tutor_str, slot.start, slot.end],
        )?;
        Ok(())
      })
      .await?;

    Ok(availability)
  }

  async fn remove_availability(&self, tutor_id: Uuid, slot: WeeklySlot) -> Result<bool> {
    let tutor_str = encode_uuid(tutor_id);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM availabilities
           WHERE tutor_id = ?1 AND start_offset = ?2 AND end_offset = ?3",
          rusqlite::params![tutor_str, slot.start, slot.end],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn list_availability(&self, tutor_id: Uuid) -> Result<Vec<Availability>> {
    let tutor_str = encode_uuid(tutor_id);

    let raws: Vec<RawAvailability> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT availability_id, tutor_id, start_offset, end_offset
           FROM availabilities WHERE tutor_id = ?1 ORDER BY start_offset",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![tutor_str], |row| {
            Ok(RawAvailability {
              availability_id: row.get(0)?,
              tutor_id:        row.get(1)?,
              start_offset:    row.get(2)?,
              end_offset:      row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAvailability::into_availability).collect()
  }

  // ── Ranking queries ───────────────────────────────────────────────────────

  async fn online_affinity_tutors(
    &self,
    student_id: Uuid,
    subject_id: Uuid,
    since:      DateTime<Utc>,
    limit:      usize,
  ) -> Result<Vec<Uuid>> {
    let sql = "SELECT a.tutor_id
       FROM affinity a
       JOIN teaching te ON te.tutor_id = a.tutor_id AND te.subject_id = a.subject_id
       JOIN tutors t    ON t.tutor_id  = a.tutor_id
       WHERE a.student_id = :student
         AND a.subject_id = :subject
         AND t.presence   = 'online'
         AND t.last_seen >= :since
       ORDER BY a.score DESC, a.tutor_id
       LIMIT :limit"
      .to_owned();

    self
      .query_ids(sql, vec![
        (":student", text(encode_uuid(student_id))),
        (":subject", text(encode_uuid(subject_id))),
        (":since", text(encode_dt(since))),
        (":limit", int(limit as i64)),
      ])
      .await
  }

  async fn online_random_tutors(
    &self,
    subject_id: Uuid,
    since:      DateTime<Utc>,
    count:      usize,
  ) -> Result<Vec<Uuid>> {
    let sql = "SELECT te.tutor_id
       FROM teaching te
       JOIN tutors t ON t.tutor_id = te.tutor_id
       WHERE te.subject_id = :subject
         AND t.presence    = 'online'
         AND t.last_seen  >= :since
       ORDER BY RANDOM()
       LIMIT :limit"
      .to_owned();

    self
      .query_ids(sql, vec![
        (":subject", text(encode_uuid(subject_id))),
        (":since", text(encode_dt(since))),
        (":limit", int(count as i64)),
      ])
      .await
  }

  async fn available_affinity_tutors(
    &self,
    student_id: Uuid,
    subject_id: Uuid,
    window:     TimeWindow,
    limit:      usize,
    offset:     usize,
  ) -> Result<Vec<Uuid>> {
    let sql = format!(
      "SELECT a.tutor_id
       FROM affinity a
       JOIN teaching te ON te.tutor_id = a.tutor_id AND te.subject_id = a.subject_id
       WHERE a.student_id = :student
         AND a.subject_id = :subject
         AND {COVERS_WINDOW}
       ORDER BY a.score DESC, a.tutor_id
       LIMIT :limit OFFSET :offset"
    );

    let mut params = vec![
      (":student", text(encode_uuid(student_id))),
      (":subject", text(encode_uuid(subject_id))),
      (":limit", int(limit as i64)),
      (":offset", int(offset as i64)),
    ];
    params.extend(window_params(&window));

    self.query_ids(sql, params).await
  }

  async fn random_available_tutors(
    &self,
    subject_id: Uuid,
    window:     TimeWindow,
    count:      usize,
  ) -> Result<Vec<Uuid>> {
    let sql = format!(
      "SELECT te.tutor_id
       FROM teaching te
       WHERE te.subject_id = :subject
         AND {COVERS_WINDOW}
       ORDER BY RANDOM()
       LIMIT :limit"
    );

    let mut params = vec![
      (":subject", text(encode_uuid(subject_id))),
      (":limit", int(count as i64)),
    ];
    params.extend(window_params(&window));

    self.query_ids(sql, params).await
  }

  async fn has_conflicting_lesson(&self, tutor_id: Uuid, window: TimeWindow) -> Result<bool> {
    let tutor_str = encode_uuid(tutor_id);
    let start_str = encode_dt(window.start);
    let end_str   = encode_dt(window.end);

    let conflict = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT EXISTS (
             SELECT 1 FROM lessons
             WHERE tutor_id  = ?1
               AND scheduled = 1
               AND start_at  < ?3
               AND end_at    > ?2)",
          rusqlite::params![tutor_str, start_str, end_str],
          |row| row.get::<_, bool>(0),
        )?)
      })
      .await?;

    Ok(conflict)
  }

  // ── Matches ───────────────────────────────────────────────────────────────

  async fn create_match(&self, input: NewMatch) -> Result<Match> {
    let m = Match {
      match_id:   Uuid::new_v4(),
      mode:       input.mode,
      status:     MatchStatus::Matching,
      student_id: input.student_id,
      tutor_id:   input.tutor_id,
      subject_id: input.subject_id,
      window:     input.window,
      lesson_id:  None,
      created_at: Utc::now(),
    };

    let id_str       = encode_uuid(m.match_id);
    let mode_str     = encode_mode(m.mode);
    let status_str   = encode_status(m.status);
    let student_str  = encode_uuid(m.student_id);
    let tutor_str    = m.tutor_id.map(encode_uuid);
    let subject_str  = encode_uuid(m.subject_id);
    let window_start = m.window.map(|w| encode_dt(w.start));
    let window_end   = m.window.map(|w| encode_dt(w.end));
    let created_str  = encode_dt(m.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO matches (
             match_id, mode, status, student_id, tutor_id, subject_id,
             window_start, window_end, lesson_id, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL, ?9)",
          rusqlite::params![
            id_str,
            mode_str,
            status_str,
            student_str,
            tutor_str,
            subject_str,
            window_start,
            window_end,
            created_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    tracing::debug!(match_id = %m.match_id, mode = mode_str, "match created");
    Ok(m)
  }

  async fn get_match(&self, id: Uuid) -> Result<Option<Match>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawMatch> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {MATCH_COLUMNS} FROM matches WHERE match_id = ?1"),
            rusqlite::params![id_str],
            RawMatch::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawMatch::into_match).transpose()
  }

  async fn list_matches(&self, filter: &MatchFilter) -> Result<Vec<Match>> {
    let status_str  = filter.status.map(encode_status);
    let mode_str    = filter.mode.map(encode_mode);
    let student_str = filter.student_id.map(encode_uuid);
    let tutor_str   = filter.tutor_id.map(encode_uuid);

    let raws: Vec<RawMatch> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {MATCH_COLUMNS} FROM matches
           WHERE (?1 IS NULL OR status     = ?1)
             AND (?2 IS NULL OR mode       = ?2)
             AND (?3 IS NULL OR student_id = ?3)
             AND (?4 IS NULL OR tutor_id   = ?4)
           ORDER BY created_at"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![status_str, mode_str, student_str, tutor_str],
            RawMatch::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMatch::into_match).collect()
  }

  async fn complete_match(
    &self,
    match_id: Uuid,
    tutor_id: Uuid,
    lesson:   NewLesson,
  ) -> Result<Option<Lesson>> {
    let lesson_id   = Uuid::new_v4();
    let match_str   = encode_uuid(match_id);
    let lesson_str  = encode_uuid(lesson_id);
    let tutor_str   = encode_uuid(tutor_id);
    let start_str   = encode_dt(lesson.window.start);
    let end_str     = encode_dt(lesson.window.end);
    let scheduled   = lesson.scheduled;

    // Lesson insert and status transition commit together or not at all.
    let bound: Option<(String, String)> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let parties: Option<(String, String)> = tx
          .query_row(
            "SELECT student_id, subject_id FROM matches
             WHERE match_id = ?1 AND status = 'matching'",
            rusqlite::params![match_str],
            |row| Ok((row.get(0)?, row.get(1)?)),
          )
          .optional()?;

        let Some((student_str, subject_str)) = parties else {
          return Ok(None);
        };

        tx.execute(
          "INSERT INTO lessons (
             lesson_id, subject_id, tutor_id, student_id, scheduled, start_at, end_at, summary
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL)",
          rusqlite::params![
            lesson_str,
            subject_str,
            tutor_str,
            student_str,
            scheduled,
            start_str,
            end_str,
          ],
        )?;

        let changed = tx.execute(
          "UPDATE matches SET status = 'matched', tutor_id = ?2, lesson_id = ?3
           WHERE match_id = ?1 AND status = 'matching'",
          rusqlite::params![match_str, tutor_str, lesson_str],
        )?;

        if changed != 1 {
          // Dropping the transaction rolls the lesson back.
          return Ok(None);
        }

        tx.commit()?;
        Ok(Some((student_str, subject_str)))
      })
      .await?;

    let Some((student_str, subject_str)) = bound else {
      return Ok(None);
    };

    Ok(Some(Lesson {
      lesson_id,
      subject_id: decode_uuid(&subject_str)?,
      tutor_id,
      student_id: decode_uuid(&student_str)?,
      scheduled,
      window: lesson.window,
      summary: None,
    }))
  }

  async fn fail_match(&self, match_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(match_id);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE matches SET status = 'failed'
           WHERE match_id = ?1 AND status = 'matching'",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    Ok(changed == 1)
  }

  // ── Lessons ───────────────────────────────────────────────────────────────

  async fn get_lesson(&self, id: Uuid) -> Result<Option<Lesson>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawLesson> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT lesson_id, subject_id, tutor_id, student_id, scheduled,
                    start_at, end_at, summary
             FROM lessons WHERE lesson_id = ?1",
            rusqlite::params![id_str],
            |row| {
              Ok(RawLesson {
                lesson_id:  row.get(0)?,
                subject_id: row.get(1)?,
                tutor_id:   row.get(2)?,
                student_id: row.get(3)?,
                scheduled:  row.get(4)?,
                start_at:   row.get(5)?,
                end_at:     row.get(6)?,
                summary:    row.get(7)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawLesson::into_lesson).transpose()
  }

  // ── Notifications ─────────────────────────────────────────────────────────

  async fn create_notification(&self, input: NewNotification) -> Result<Notification> {
    let n = Notification {
      notification_id: Uuid::new_v4(),
      recipient:       input.recipient,
      title:           input.title,
      subtitle:        input.subtitle,
      image:           input.image,
      read:            false,
      created_at:      Utc::now(),
    };

    let id_str              = encode_uuid(n.notification_id);
    let (role, recipient)   = encode_actor(n.recipient);
    let title               = n.title.clone();
    let subtitle            = n.subtitle.clone();
    let image               = n.image.clone();
    let created_str         = encode_dt(n.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO notifications (
             notification_id, recipient_role, recipient_id, title, subtitle,
             image, read, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)",
          rusqlite::params![id_str, role, recipient, title, subtitle, image, created_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(n)
  }

  async fn get_notification(&self, id: Uuid) -> Result<Option<Notification>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawNotification> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE notification_id = ?1"
            ),
            rusqlite::params![id_str],
            RawNotification::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawNotification::into_notification).transpose()
  }

  async fn list_notifications(
    &self,
    recipient: Actor,
    since:     DateTime<Utc>,
    until:     DateTime<Utc>,
  ) -> Result<Vec<Notification>> {
    let (role, recipient_str) = encode_actor(recipient);
    let since_str             = encode_dt(since);
    let until_str             = encode_dt(until);

    let raws: Vec<RawNotification> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {NOTIFICATION_COLUMNS} FROM notifications
           WHERE recipient_role = ?1
             AND recipient_id   = ?2
             AND created_at    >= ?3
             AND created_at     < ?4
           ORDER BY created_at"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![role, recipient_str, since_str, until_str],
            RawNotification::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawNotification::into_notification).collect()
  }

  async fn mark_notification_read(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE notifications SET read = 1 WHERE notification_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }
}
