//! Engine timing and ranking parameters.

use std::time::Duration;

use serde::Deserialize;

/// Tunables for the [`crate::Matchmaker`]. Every field has a default, so a
/// config file only needs to name what it overrides.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// How long each on-demand candidate has to accept before the next one is
  /// offered.
  pub offer_window_ms:      u64,
  /// How long a scheduled request waits for its tutor.
  pub scheduled_expiry_ms:  u64,
  /// A tutor counts as online if their last heartbeat is this recent.
  pub online_window_secs:   u64,
  /// Candidates tried per on-demand match.
  pub on_demand_candidates: usize,
  /// Random-fill pool size as a multiple of the remaining need.
  pub random_oversample:    usize,
  /// Tutors fetched per random batch when filling scheduled candidates.
  pub scheduled_batch_size: usize,
  /// Upper bound on random batches per scheduled ranking.
  pub max_fill_rounds:      usize,
  /// Length of an on-demand lesson.
  pub lesson_duration_mins: i64,
  /// Push a durable notification when a live offer could not be delivered.
  pub push_fallback:        bool,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      offer_window_ms:      30_000,
      scheduled_expiry_ms:  24 * 60 * 60 * 1000,
      online_window_secs:   60,
      on_demand_candidates: 5,
      random_oversample:    100,
      scheduled_batch_size: 100,
      max_fill_rounds:      10,
      lesson_duration_mins: 15,
      push_fallback:        true,
    }
  }
}

impl EngineConfig {
  pub fn offer_window(&self) -> Duration { Duration::from_millis(self.offer_window_ms) }

  pub fn scheduled_expiry(&self) -> Duration {
    Duration::from_millis(self.scheduled_expiry_ms)
  }

  pub fn online_window(&self) -> chrono::Duration {
    chrono::Duration::seconds(self.online_window_secs as i64)
  }

  pub fn lesson_duration(&self) -> chrono::Duration {
    chrono::Duration::minutes(self.lesson_duration_mins)
  }
}
