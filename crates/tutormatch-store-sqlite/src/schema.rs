//! SQL schema for the matchmaking SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS subjects (
    subject_id  TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    standard    TEXT NOT NULL,
    UNIQUE (name, standard)
);

CREATE TABLE IF NOT EXISTS students (
    student_id  TEXT PRIMARY KEY,
    first_name  TEXT NOT NULL,
    push_token  TEXT
);

CREATE TABLE IF NOT EXISTS tutors (
    tutor_id    TEXT PRIMARY KEY,
    first_name  TEXT NOT NULL,
    push_token  TEXT,
    presence    TEXT NOT NULL DEFAULT 'offline',  -- 'online' | 'active' | 'offline'
    last_seen   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS teaching (
    tutor_id    TEXT NOT NULL REFERENCES tutors(tutor_id),
    subject_id  TEXT NOT NULL REFERENCES subjects(subject_id),
    PRIMARY KEY (tutor_id, subject_id)
);

-- Scores are maintained outside the engine; one row per triple.
CREATE TABLE IF NOT EXISTS affinity (
    tutor_id    TEXT NOT NULL REFERENCES tutors(tutor_id),
    student_id  TEXT NOT NULL REFERENCES students(student_id),
    subject_id  TEXT NOT NULL REFERENCES subjects(subject_id),
    score       INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (tutor_id, student_id, subject_id)
);

-- Offsets are seconds into the week starting Thursday 00:00 UTC.
CREATE TABLE IF NOT EXISTS availabilities (
    availability_id TEXT PRIMARY KEY,
    tutor_id        TEXT NOT NULL REFERENCES tutors(tutor_id),
    start_offset    INTEGER NOT NULL,
    end_offset      INTEGER NOT NULL,
    CHECK (start_offset < end_offset)
);

CREATE TABLE IF NOT EXISTS lessons (
    lesson_id   TEXT PRIMARY KEY,
    subject_id  TEXT NOT NULL REFERENCES subjects(subject_id),
    tutor_id    TEXT NOT NULL REFERENCES tutors(tutor_id),
    student_id  TEXT NOT NULL REFERENCES students(student_id),
    scheduled   INTEGER NOT NULL,
    start_at    TEXT NOT NULL,
    end_at      TEXT NOT NULL,
    summary     TEXT
);

-- status moves only out of 'matching', via conditional UPDATE.
CREATE TABLE IF NOT EXISTS matches (
    match_id     TEXT PRIMARY KEY,
    mode         TEXT NOT NULL,   -- 'on_demand' | 'scheduled'
    status       TEXT NOT NULL,   -- 'matching' | 'matched' | 'failed'
    student_id   TEXT NOT NULL REFERENCES students(student_id),
    tutor_id     TEXT REFERENCES tutors(tutor_id),
    subject_id   TEXT NOT NULL REFERENCES subjects(subject_id),
    window_start TEXT,
    window_end   TEXT,
    lesson_id    TEXT UNIQUE REFERENCES lessons(lesson_id),
    created_at   TEXT NOT NULL
);

-- Append-only apart from the read flag.
CREATE TABLE IF NOT EXISTS notifications (
    notification_id TEXT PRIMARY KEY,
    recipient_role  TEXT NOT NULL,   -- 'student' | 'tutor'
    recipient_id    TEXT NOT NULL,
    title           TEXT NOT NULL,
    subtitle        TEXT NOT NULL,
    image           TEXT NOT NULL,
    read            INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS tutors_presence_idx       ON tutors(presence, last_seen);
CREATE INDEX IF NOT EXISTS teaching_subject_idx      ON teaching(subject_id);
CREATE INDEX IF NOT EXISTS availabilities_tutor_idx  ON availabilities(tutor_id);
CREATE INDEX IF NOT EXISTS lessons_tutor_idx         ON lessons(tutor_id, scheduled);
CREATE INDEX IF NOT EXISTS matches_status_idx        ON matches(status);
CREATE INDEX IF NOT EXISTS notifications_recipient_idx
    ON notifications(recipient_id, created_at);

PRAGMA user_version = 1;
";
