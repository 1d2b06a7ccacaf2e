//! Candidate selection for on-demand and scheduled matches.
//!
//! Both rankings put tutors the student already has affinity with first, by
//! descending score, and fill the rest with a uniform sample of eligible
//! tutors. A tutor never appears twice in one ranking.

use std::{collections::HashSet, sync::Arc};

use chrono::Utc;
use rand::seq::SliceRandom;
use tutormatch_core::{Error, Result, schedule::TimeWindow, store::MatchStore};
use uuid::Uuid;

use crate::config::EngineConfig;

/// Largest `limit` a scheduled ranking accepts.
pub const MAX_SCHEDULED_LIMIT: usize = 100;

pub struct CandidateRanker<S> {
  store:  Arc<S>,
  config: EngineConfig,
}

impl<S> Clone for CandidateRanker<S> {
  fn clone(&self) -> Self {
    Self {
      store:  Arc::clone(&self.store),
      config: self.config.clone(),
    }
  }
}

impl<S: MatchStore> CandidateRanker<S> {
  pub fn new(store: Arc<S>, config: EngineConfig) -> Self { Self { store, config } }

  /// Up to `limit` online tutors for the subject. An empty result is not an
  /// error; the caller fails the match.
  pub async fn rank_on_demand(
    &self,
    student_id: Uuid,
    subject_id: Uuid,
    limit: usize,
  ) -> Result<Vec<Uuid>> {
    if limit == 0 {
      return Ok(Vec::new());
    }
    let since = Utc::now() - self.config.online_window();

    let affinity = self
      .store
      .online_affinity_tutors(student_id, subject_id, since, limit)
      .await
      .map_err(Error::upstream)?;

    let mut seen = HashSet::new();
    let mut ranked: Vec<Uuid> =
      affinity.into_iter().filter(|id| seen.insert(*id)).take(limit).collect();

    let need = limit - ranked.len();
    if need > 0 {
      // Oversample so that the affinity tutors the pool may contain do not
      // starve the sample.
      let pool_size = need
        .saturating_mul(self.config.random_oversample.max(1))
        .saturating_add(ranked.len());
      let mut pool = self
        .store
        .online_random_tutors(subject_id, since, pool_size)
        .await
        .map_err(Error::upstream)?;
      pool.retain(|id| seen.insert(*id));
      ranked.extend(sample(&pool, need));
    }

    tracing::debug!(%student_id, %subject_id, count = ranked.len(), "ranked on-demand candidates");
    Ok(ranked)
  }

  /// Up to `limit` tutors whose availability covers `window` and who have no
  /// overlapping scheduled lesson. Fails with [`Error::NoCandidates`] when no
  /// tutor qualifies. `limit` must be in `1..=MAX_SCHEDULED_LIMIT`.
  pub async fn rank_scheduled(
    &self,
    student_id: Uuid,
    subject_id: Uuid,
    window: TimeWindow,
    limit: usize,
  ) -> Result<Vec<Uuid>> {
    if !(1..=MAX_SCHEDULED_LIMIT).contains(&limit) {
      return Err(Error::InvalidRequest(format!(
        "limit must be between 1 and {MAX_SCHEDULED_LIMIT}"
      )));
    }

    let mut seen = HashSet::new();
    let mut chosen = Vec::new();

    let mut offset = 0;
    while chosen.len() < limit {
      let page = self
        .store
        .available_affinity_tutors(student_id, subject_id, window, limit, offset)
        .await
        .map_err(Error::upstream)?;
      if page.is_empty() {
        break;
      }
      let last_page = page.len() < limit;
      offset += page.len();
      self.admit(page, window, limit, &mut seen, &mut chosen).await?;
      if last_page {
        break;
      }
    }

    let batch_size = self.config.scheduled_batch_size.max(1);
    let mut rounds = 0;
    while chosen.len() < limit && rounds < self.config.max_fill_rounds {
      rounds += 1;
      let batch = self
        .store
        .random_available_tutors(subject_id, window, batch_size)
        .await
        .map_err(Error::upstream)?;
      if batch.is_empty() {
        break;
      }
      // A batch made only of tutors already considered means the eligible
      // population is exhausted.
      if !self.admit(batch, window, limit, &mut seen, &mut chosen).await? {
        break;
      }
    }

    if chosen.is_empty() {
      return Err(Error::NoCandidates);
    }
    tracing::debug!(
      %student_id,
      %subject_id,
      count = chosen.len(),
      rounds,
      "ranked scheduled candidates"
    );
    Ok(chosen)
  }

  /// Append conflict-free tutors from `batch` to `chosen` until `limit`.
  /// Returns whether the batch contained any tutor not seen before.
  async fn admit(
    &self,
    batch: Vec<Uuid>,
    window: TimeWindow,
    limit: usize,
    seen: &mut HashSet<Uuid>,
    chosen: &mut Vec<Uuid>,
  ) -> Result<bool> {
    let mut fresh = false;
    for tutor_id in batch {
      if chosen.len() >= limit {
        break;
      }
      if !seen.insert(tutor_id) {
        continue;
      }
      fresh = true;
      let busy = self
        .store
        .has_conflicting_lesson(tutor_id, window)
        .await
        .map_err(Error::upstream)?;
      if busy {
        tracing::trace!(%tutor_id, "skipping tutor with conflicting lesson");
      } else {
        chosen.push(tutor_id);
      }
    }
    Ok(fresh)
  }
}

/// Uniform sample of `count` ids, in random order.
fn sample(pool: &[Uuid], count: usize) -> Vec<Uuid> {
  pool.choose_multiple(&mut rand::thread_rng(), count).copied().collect()
}
