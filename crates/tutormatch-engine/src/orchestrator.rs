//! The match state machine.
//!
//! A match starts in `Matching` and moves once to `Matched` or `Failed`. Each
//! match in `Matching` has exactly one background task: a dispatch loop for
//! on-demand matches, an expiry timer for scheduled ones. Tasks sleep on a
//! per-match [`CancellationToken`] which accepting fires, and always re-read
//! the stored match after waking. Every status write goes through the store's
//! conditional update, so a late task can never overwrite an accepted match.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, MutexGuard, PoisonError},
  time::Duration,
};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tutormatch_core::{
  Actor, Error, Result,
  matching::{
    Lesson, Match, MatchFilter, MatchMode, MatchOffer, MatchOutcome, MatchStatus,
    NewLesson, NewMatch, StudentSnapshot,
  },
  notification::Notification,
  participant::{PresenceStatus, Student},
  schedule::TimeWindow,
  store::MatchStore,
  subject::{Subject, SubjectRef},
};
use uuid::Uuid;

use crate::{
  config::EngineConfig,
  notify::{NotificationRecorder, Notifier},
  ranker::CandidateRanker,
  registry::{OfferRegistry, OfferSubscription},
};

// ─── Notification copy ───────────────────────────────────────────────────────

const OFFER_TITLE: &str = "New lesson request!";
const SCHEDULED_REQUEST_TITLE: &str = "New scheduled lesson request!";
const EXPIRED_TITLE: &str = "Match failed";
const CONFIRMED_TITLE: &str = "Scheduled lesson confirmed!";

/// What [`Matchmaker::recover`] did with matches left over from a previous
/// process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
  /// Orphaned on-demand matches marked failed.
  pub failed:  usize,
  /// Scheduled matches whose expiry timer was restarted.
  pub rearmed: usize,
}

/// Entry point for every matchmaking operation. Cheap to clone.
pub struct Matchmaker<S, N> {
  inner: Arc<Inner<S, N>>,
}

impl<S, N> Clone for Matchmaker<S, N> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

struct Inner<S, N> {
  store:    Arc<S>,
  ranker:   CandidateRanker<S>,
  registry: Arc<OfferRegistry>,
  recorder: NotificationRecorder<S, N>,
  config:   EngineConfig,
  root:     CancellationToken,
  pending:  Mutex<HashMap<Uuid, CancellationToken>>,
}

impl<S, N> Matchmaker<S, N>
where
  S: MatchStore + 'static,
  N: Notifier,
{
  pub fn new(store: Arc<S>, notifier: Arc<N>, config: EngineConfig) -> Self {
    let inner = Inner {
      ranker: CandidateRanker::new(Arc::clone(&store), config.clone()),
      recorder: NotificationRecorder::new(Arc::clone(&store), notifier),
      registry: Arc::new(OfferRegistry::new()),
      root: CancellationToken::new(),
      pending: Mutex::new(HashMap::new()),
      store,
      config,
    };
    Self {
      inner: Arc::new(inner),
    }
  }

  pub fn store(&self) -> &Arc<S> { &self.inner.store }

  pub fn registry(&self) -> &Arc<OfferRegistry> { &self.inner.registry }

  pub fn config(&self) -> &EngineConfig { &self.inner.config }

  /// Number of matches with a live background task.
  pub fn in_flight(&self) -> usize { self.inner.pending().len() }

  // ── On-demand ─────────────────────────────────────────────────────────

  /// Create an on-demand match and start offering it to candidates in the
  /// background. Returns as soon as the match is stored.
  pub async fn request_on_demand(&self, caller: Actor, subject: &SubjectRef) -> Result<Match> {
    let student_id = caller.student()?;
    let inner = &self.inner;

    let student = inner.load_student(student_id).await?;
    let subject = inner
      .store
      .subject_for(&subject.name, &subject.standard)
      .await
      .map_err(Error::upstream)?;
    let m = inner
      .store
      .create_match(NewMatch::on_demand(student_id, subject.subject_id))
      .await
      .map_err(Error::upstream)?;

    tracing::info!(match_id = %m.match_id, %student_id, subject = %subject.name, "on-demand match requested");

    let token = inner.arm(m.match_id);
    tokio::spawn(Arc::clone(inner).dispatch(m.match_id, student, subject, token));
    Ok(m)
  }

  /// Claim an on-demand match for the calling tutor and create its lesson.
  /// Only tutors who teach the match's subject may accept.
  pub async fn accept_on_demand(&self, caller: Actor, match_id: Uuid) -> Result<Lesson> {
    let tutor_id = caller.tutor()?;
    let inner = &self.inner;

    let m = inner.load_match(match_id).await?;
    if m.mode != MatchMode::OnDemand || m.status != MatchStatus::Matching {
      return Err(Error::InvalidState {
        match_id,
        status: m.status,
      });
    }
    inner.load_tutor_name(tutor_id).await?;
    let teaches = inner
      .store
      .teaches(tutor_id, m.subject_id)
      .await
      .map_err(Error::upstream)?;
    if !teaches {
      tracing::debug!(%match_id, %tutor_id, "tutor does not teach the requested subject");
      return Err(Error::Unauthorized);
    }

    let window = TimeWindow::starting_at(Utc::now(), inner.config.lesson_duration())?;
    let lesson = inner
      .complete(
        match_id,
        tutor_id,
        NewLesson {
          scheduled: false,
          window,
        },
      )
      .await?;

    tracing::info!(%match_id, %tutor_id, lesson_id = %lesson.lesson_id, "on-demand match accepted");
    Ok(lesson)
  }

  /// Poll a match on behalf of its student.
  pub async fn check_for_match(&self, caller: Actor, match_id: Uuid) -> Result<MatchOutcome> {
    let student_id = caller.student()?;
    let m = self.inner.load_match(match_id).await?;
    if m.student_id != student_id {
      return Err(Error::Unauthorized);
    }

    Ok(match (m.status, m.mode) {
      (MatchStatus::Matching, _) => MatchOutcome::Pending,
      (MatchStatus::Failed, MatchMode::OnDemand) => MatchOutcome::Failed,
      (MatchStatus::Failed, MatchMode::Scheduled) => MatchOutcome::Expired,
      (MatchStatus::Matched, _) => {
        let lesson_id = m
          .lesson_id
          .ok_or_else(|| Error::not_found("lesson", match_id))?;
        let lesson = self
          .inner
          .store
          .get_lesson(lesson_id)
          .await
          .map_err(Error::upstream)?
          .ok_or_else(|| Error::not_found("lesson", lesson_id))?;
        MatchOutcome::Matched(lesson)
      }
    })
  }

  // ── Scheduled ─────────────────────────────────────────────────────────

  /// Ask a specific tutor for a lesson over `[start, end)`. The request
  /// expires if the tutor does not accept in time.
  pub async fn request_scheduled(
    &self,
    caller: Actor,
    tutor_id: Uuid,
    subject: &SubjectRef,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> Result<Match> {
    let student_id = caller.student()?;
    let window = TimeWindow::bookable(start, end)?;
    let inner = &self.inner;

    let student = inner.load_student(student_id).await?;
    inner.load_tutor_name(tutor_id).await?;
    let subject = inner
      .store
      .subject_for(&subject.name, &subject.standard)
      .await
      .map_err(Error::upstream)?;
    let m = inner
      .store
      .create_match(NewMatch::scheduled(
        student_id,
        tutor_id,
        subject.subject_id,
        window,
      ))
      .await
      .map_err(Error::upstream)?;

    tracing::info!(match_id = %m.match_id, %student_id, %tutor_id, "scheduled match requested");

    let token = inner.arm(m.match_id);
    tokio::spawn(Arc::clone(inner).expire(m.clone(), inner.config.scheduled_expiry(), token));

    inner
      .notify(
        Actor::Tutor(tutor_id),
        SCHEDULED_REQUEST_TITLE,
        format!(
          "You have received a new match request from {}",
          student.first_name
        ),
      )
      .await;

    Ok(m)
  }

  /// Confirm a scheduled match as its designated tutor.
  pub async fn accept_scheduled(&self, caller: Actor, match_id: Uuid) -> Result<Lesson> {
    let tutor_id = caller.tutor()?;
    let inner = &self.inner;

    let m = inner.load_match(match_id).await?;
    if m.tutor_id != Some(tutor_id) {
      return Err(Error::Unauthorized);
    }
    let window = match (m.mode, m.status, m.window) {
      (MatchMode::Scheduled, MatchStatus::Matching, Some(window)) => window,
      _ => {
        return Err(Error::InvalidState {
          match_id,
          status: m.status,
        });
      }
    };
    let tutor_name = inner.load_tutor_name(tutor_id).await?;

    let lesson = inner
      .complete(
        match_id,
        tutor_id,
        NewLesson {
          scheduled: true,
          window,
        },
      )
      .await?;

    tracing::info!(%match_id, %tutor_id, lesson_id = %lesson.lesson_id, "scheduled match accepted");

    inner
      .notify(
        Actor::Student(m.student_id),
        CONFIRMED_TITLE,
        format!("Successfully matched you with {tutor_name}"),
      )
      .await;

    Ok(lesson)
  }

  /// Rank tutors the calling student could book over `[start, end)`.
  pub async fn rank_scheduled_candidates(
    &self,
    caller: Actor,
    subject: &SubjectRef,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    limit: usize,
  ) -> Result<Vec<Uuid>> {
    let student_id = caller.student()?;
    let window = TimeWindow::bookable(start, end)?;
    let subject = self
      .inner
      .store
      .subject_for(&subject.name, &subject.standard)
      .await
      .map_err(Error::upstream)?;
    self
      .inner
      .ranker
      .rank_scheduled(student_id, subject.subject_id, window, limit)
      .await
  }

  // ── Participants ──────────────────────────────────────────────────────

  /// Matches still waiting on the caller, as student or designated tutor.
  pub async fn pending_matches(&self, caller: Actor) -> Result<Vec<Match>> {
    let mut filter = MatchFilter {
      status: Some(MatchStatus::Matching),
      ..Default::default()
    };
    match caller {
      Actor::Student(id) => filter.student_id = Some(id),
      Actor::Tutor(id) => filter.tutor_id = Some(id),
    }
    self
      .inner
      .store
      .list_matches(&filter)
      .await
      .map_err(Error::upstream)
  }

  pub async fn record_heartbeat(&self, caller: Actor, status: PresenceStatus) -> Result<()> {
    let tutor_id = caller.tutor()?;
    let found = self
      .inner
      .store
      .record_heartbeat(tutor_id, status, Utc::now())
      .await
      .map_err(Error::upstream)?;
    if !found {
      return Err(Error::not_found("tutor", tutor_id));
    }
    tracing::trace!(%tutor_id, ?status, "heartbeat");
    Ok(())
  }

  /// Register the calling tutor for live offers.
  pub fn subscribe_offers(&self, caller: Actor) -> Result<OfferSubscription> {
    let tutor_id = caller.tutor()?;
    tracing::debug!(%tutor_id, "tutor subscribed to offers");
    Ok(self.inner.registry.open(tutor_id))
  }

  // ── Notifications ─────────────────────────────────────────────────────

  pub async fn notifications(
    &self,
    caller: Actor,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
  ) -> Result<Vec<Notification>> {
    if until <= since {
      return Err(Error::InvalidRequest("until must be after since".into()));
    }
    self
      .inner
      .store
      .list_notifications(caller, since, until)
      .await
      .map_err(Error::upstream)
  }

  pub async fn mark_notification_read(&self, caller: Actor, notification_id: Uuid) -> Result<()> {
    let store = &self.inner.store;
    let notification = store
      .get_notification(notification_id)
      .await
      .map_err(Error::upstream)?
      .ok_or_else(|| Error::not_found("notification", notification_id))?;
    if notification.recipient != caller {
      return Err(Error::Unauthorized);
    }
    store
      .mark_notification_read(notification_id)
      .await
      .map_err(Error::upstream)?;
    Ok(())
  }

  // ── Lifecycle ─────────────────────────────────────────────────────────

  /// Resolve matches left in `Matching` by a previous process. On-demand
  /// matches lost their dispatch loop and are failed; scheduled matches get
  /// their expiry timer back with whatever time remains.
  pub async fn recover(&self) -> Result<RecoveryReport> {
    let inner = &self.inner;
    let filter = MatchFilter {
      status: Some(MatchStatus::Matching),
      ..Default::default()
    };
    let matches = inner
      .store
      .list_matches(&filter)
      .await
      .map_err(Error::upstream)?;

    let mut report = RecoveryReport::default();
    let now = Utc::now();
    for m in matches {
      if inner.pending().contains_key(&m.match_id) {
        continue;
      }
      match m.mode {
        MatchMode::OnDemand => {
          if inner.store.fail_match(m.match_id).await.map_err(Error::upstream)? {
            tracing::info!(match_id = %m.match_id, "failed orphaned on-demand match");
            report.failed += 1;
          }
        }
        MatchMode::Scheduled => {
          let elapsed = (now - m.created_at).to_std().unwrap_or(Duration::ZERO);
          let remaining = inner.config.scheduled_expiry().saturating_sub(elapsed);
          let token = inner.arm(m.match_id);
          tracing::debug!(match_id = %m.match_id, ?remaining, "re-arming scheduled expiry");
          tokio::spawn(Arc::clone(inner).expire(m, remaining, token));
          report.rearmed += 1;
        }
      }
    }

    tracing::info!(failed = report.failed, rearmed = report.rearmed, "recovered pending matches");
    Ok(report)
  }

  /// Stop every background task. Matches they were driving stay in
  /// `Matching` for [`Matchmaker::recover`] to pick up.
  pub fn shutdown(&self) {
    tracing::info!(in_flight = self.in_flight(), "matchmaker shutting down");
    self.inner.root.cancel();
  }
}

impl<S, N> Inner<S, N>
where
  S: MatchStore + 'static,
  N: Notifier,
{
  fn pending(&self) -> MutexGuard<'_, HashMap<Uuid, CancellationToken>> {
    self.pending.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn arm(&self, match_id: Uuid) -> CancellationToken {
    let token = self.root.child_token();
    self.pending().insert(match_id, token.clone());
    token
  }

  fn disarm(&self, match_id: Uuid) { self.pending().remove(&match_id); }

  /// Wake the task driving `match_id`, if any.
  fn wake(&self, match_id: Uuid) {
    if let Some(token) = self.pending().get(&match_id) {
      token.cancel();
    }
  }

  async fn load_match(&self, match_id: Uuid) -> Result<Match> {
    self
      .store
      .get_match(match_id)
      .await
      .map_err(Error::upstream)?
      .ok_or_else(|| Error::not_found("match", match_id))
  }

  async fn load_student(&self, student_id: Uuid) -> Result<Student> {
    self
      .store
      .get_student(student_id)
      .await
      .map_err(Error::upstream)?
      .ok_or_else(|| Error::not_found("student", student_id))
  }

  async fn load_tutor_name(&self, tutor_id: Uuid) -> Result<String> {
    self
      .store
      .get_tutor(tutor_id)
      .await
      .map_err(Error::upstream)?
      .map(|t| t.first_name)
      .ok_or_else(|| Error::not_found("tutor", tutor_id))
  }

  /// Run the conditional accept and wake the match's task on success.
  async fn complete(&self, match_id: Uuid, tutor_id: Uuid, lesson: NewLesson) -> Result<Lesson> {
    let completed = self
      .store
      .complete_match(match_id, tutor_id, lesson)
      .await
      .map_err(Error::upstream)?;

    match completed {
      Some(lesson) => {
        self.wake(match_id);
        Ok(lesson)
      }
      None => {
        let status = self.load_match(match_id).await?.status;
        tracing::debug!(%match_id, %tutor_id, %status, "lost accept race");
        Err(Error::InvalidState { match_id, status })
      }
    }
  }

  /// Record and push a notification. Failures are logged, never returned:
  /// the match operation that triggered it has already taken effect.
  async fn notify(&self, recipient: Actor, title: &str, subtitle: String) {
    if let Err(e) = self.recorder.notify(recipient, title, subtitle).await {
      tracing::error!(%recipient, title, error = %e, "failed to record notification");
    }
  }

  async fn fail(&self, match_id: Uuid) {
    match self.store.fail_match(match_id).await {
      Ok(true) => tracing::info!(%match_id, "match failed"),
      Ok(false) => tracing::debug!(%match_id, "match already resolved"),
      Err(e) => tracing::error!(%match_id, error = %e, "failed to mark match failed"),
    }
  }

  // ── Background tasks ──────────────────────────────────────────────────

  async fn dispatch(
    self: Arc<Self>,
    match_id: Uuid,
    student: Student,
    subject: Subject,
    token: CancellationToken,
  ) {
    self.offer_to_candidates(match_id, student, subject, &token).await;
    self.disarm(match_id);
  }

  async fn offer_to_candidates(
    &self,
    match_id: Uuid,
    student: Student,
    subject: Subject,
    token: &CancellationToken,
  ) {
    let candidates = match self
      .ranker
      .rank_on_demand(
        student.student_id,
        subject.subject_id,
        self.config.on_demand_candidates,
      )
      .await
    {
      Ok(candidates) => candidates,
      Err(e) => {
        tracing::error!(%match_id, error = %e, "candidate ranking failed");
        self.fail(match_id).await;
        return;
      }
    };
    if candidates.is_empty() {
      tracing::info!(%match_id, "no online tutors for on-demand match");
      self.fail(match_id).await;
      return;
    }

    let window = self.config.offer_window();
    let snapshot = StudentSnapshot {
      student_id: student.student_id,
      first_name: student.first_name,
    };

    for (position, tutor_id) in candidates.into_iter().enumerate() {
      let offer = MatchOffer {
        match_id,
        student: snapshot.clone(),
        subject: subject.clone(),
        expires_at: Utc::now()
          + chrono::Duration::milliseconds(self.config.offer_window_ms as i64),
      };
      let delivered = self.registry.send(tutor_id, offer);
      tracing::debug!(%match_id, %tutor_id, position, delivered, "offered match");

      if !delivered && self.config.push_fallback {
        self
          .notify(
            Actor::Tutor(tutor_id),
            OFFER_TITLE,
            format!(
              "{} needs help with {} ({})",
              snapshot.first_name, subject.name, subject.standard
            ),
          )
          .await;
      }

      tokio::select! {
        () = tokio::time::sleep(window) => {}
        () = token.cancelled() => {}
      }
      if self.root.is_cancelled() {
        tracing::debug!(%match_id, "dispatch cancelled by shutdown");
        return;
      }

      match self.store.get_match(match_id).await {
        Ok(Some(m)) if m.status == MatchStatus::Matching => continue,
        Ok(Some(m)) => {
          tracing::debug!(%match_id, status = %m.status, "dispatch finished");
          return;
        }
        Ok(None) => {
          tracing::error!(%match_id, "match vanished during dispatch");
          return;
        }
        Err(e) => {
          tracing::error!(%match_id, error = %e, "failed to re-read match");
          self.fail(match_id).await;
          return;
        }
      }
    }

    tracing::info!(%match_id, "all candidates passed on on-demand match");
    self.fail(match_id).await;
  }

  async fn expire(self: Arc<Self>, m: Match, after: Duration, token: CancellationToken) {
    self.expire_after(&m, after, &token).await;
    self.disarm(m.match_id);
  }

  async fn expire_after(&self, m: &Match, after: Duration, token: &CancellationToken) {
    let match_id = m.match_id;
    tokio::select! {
      () = tokio::time::sleep(after) => {}
      () = token.cancelled() => {}
    }
    if self.root.is_cancelled() {
      tracing::debug!(%match_id, "expiry cancelled by shutdown");
      return;
    }

    match self.store.fail_match(match_id).await {
      Ok(true) => {}
      Ok(false) => {
        tracing::debug!(%match_id, "scheduled match already resolved");
        return;
      }
      Err(e) => {
        tracing::error!(%match_id, error = %e, "failed to expire scheduled match");
        return;
      }
    }
    tracing::info!(%match_id, "scheduled match expired");

    let tutor_name = match m.tutor_id {
      Some(tutor_id) => match self.load_tutor_name(tutor_id).await {
        Ok(name) => name,
        Err(e) => {
          tracing::warn!(%match_id, error = %e, "tutor lookup failed");
          "your tutor".to_owned()
        }
      },
      None => "your tutor".to_owned(),
    };
    self
      .notify(
        Actor::Student(m.student_id),
        EXPIRED_TITLE,
        format!("Your scheduled match with {tutor_name} has expired"),
      )
      .await;
  }
}
