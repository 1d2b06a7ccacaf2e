//! Time windows and recurring weekly availability.
//!
//! Availability is stored as a time-of-week interval: second offsets from the
//! Unix epoch (1970-01-01T00:00Z, a Thursday), folded modulo one week. An
//! absolute [`TimeWindow`] is compared against it by folding onto the same
//! week; the store runs that comparison in its ranking queries.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Seconds in one week.
pub const WEEK_SECS: i64 = 7 * 24 * 60 * 60;

// ─── TimeWindow ──────────────────────────────────────────────────────────────

/// A half-open absolute interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
  pub start: DateTime<Utc>,
  pub end:   DateTime<Utc>,
}

impl TimeWindow {
  pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
    if end <= start {
      return Err(Error::InvalidRequest(format!(
        "window end {end} is not after start {start}"
      )));
    }
    Ok(Self { start, end })
  }

  /// A window of `length` beginning at `start`.
  pub fn starting_at(start: DateTime<Utc>, length: Duration) -> Result<Self> {
    Self::new(start, start + length)
  }

  /// A window that can be booked as a scheduled lesson: at most one week
  /// long, so it folds onto a single recurring slot.
  pub fn bookable(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
    let window = Self::new(start, end)?;
    if window.duration().num_seconds() > WEEK_SECS {
      return Err(Error::InvalidRequest(
        "scheduled window must not exceed one week".to_owned(),
      ));
    }
    Ok(window)
  }

  pub fn duration(&self) -> Duration { self.end - self.start }

  /// `(start, end)` as offsets into the recurring week. `end` may exceed
  /// [`WEEK_SECS`] when the window crosses the week boundary.
  pub fn week_offsets(&self) -> (i64, i64) {
    let start = self.start.timestamp().rem_euclid(WEEK_SECS);
    (start, start + self.duration().num_seconds())
  }
}

// ─── WeeklySlot ──────────────────────────────────────────────────────────────

/// A recurring interval within the week. `0 <= start < WEEK_SECS` and
/// `start < end <= start + WEEK_SECS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklySlot {
  pub start: i64,
  pub end:   i64,
}

impl WeeklySlot {
  pub fn new(start: i64, end: i64) -> Result<Self> {
    if !(0..WEEK_SECS).contains(&start) || end <= start || end > start + WEEK_SECS
    {
      return Err(Error::InvalidRequest(format!(
        "invalid weekly slot [{start}, {end})"
      )));
    }
    Ok(Self { start, end })
  }

  /// The slot recurring at the same time of week as `window`.
  pub fn from_window(window: &TimeWindow) -> Result<Self> {
    let (start, end) = window.week_offsets();
    Self::new(start, end)
  }
}

/// A tutor's recurring availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
  pub availability_id: Uuid,
  pub tutor_id:        Uuid,
  pub slot:            WeeklySlot,
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone as _;

  use super::*;

  fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
  }

  #[test]
  fn window_rejects_inverted_bounds() {
    assert!(TimeWindow::new(at(2026, 3, 2, 15), at(2026, 3, 2, 14)).is_err());
    assert!(TimeWindow::new(at(2026, 3, 2, 14), at(2026, 3, 2, 14)).is_err());
  }

  #[test]
  fn bookable_rejects_windows_longer_than_a_week() {
    assert!(TimeWindow::bookable(at(2026, 3, 2, 0), at(2026, 3, 10, 0)).is_err());
    assert!(TimeWindow::bookable(at(2026, 3, 2, 0), at(2026, 3, 2, 1)).is_ok());
  }

  #[test]
  fn epoch_is_thursday_midnight() {
    // 2026-03-05 is a Thursday.
    let window = TimeWindow::new(at(2026, 3, 5, 0), at(2026, 3, 5, 1)).unwrap();
    assert_eq!(window.week_offsets(), (0, 3600));
  }

  #[test]
  fn same_time_of_week_folds_to_same_offsets() {
    // 2026-03-02 and 2026-03-09 are Mondays.
    let first = TimeWindow::new(at(2026, 3, 2, 14), at(2026, 3, 2, 15)).unwrap();
    let next = TimeWindow::new(at(2026, 3, 9, 14), at(2026, 3, 9, 15)).unwrap();
    assert_eq!(first.week_offsets(), next.week_offsets());
    assert_eq!(
      WeeklySlot::from_window(&first).unwrap(),
      WeeklySlot::from_window(&next).unwrap()
    );
  }

  #[test]
  fn slot_bounds_are_validated() {
    assert!(WeeklySlot::new(WEEK_SECS - 7200, WEEK_SECS + 7200).is_ok());
    assert!(WeeklySlot::new(-1, 3600).is_err());
    assert!(WeeklySlot::new(WEEK_SECS, WEEK_SECS + 1).is_err());
    assert!(WeeklySlot::new(3600, 3600).is_err());
    assert!(WeeklySlot::new(0, WEEK_SECS + 1).is_err());
  }
}
