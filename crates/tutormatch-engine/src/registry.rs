//! Live offer delivery to connected tutors.
//!
//! Each connected tutor owns at most one bounded channel. Delivery never
//! blocks: an offer that does not fit is dropped, and the caller decides
//! whether to fall back to a push notification.

use std::{
  collections::HashMap,
  sync::{
    Mutex, MutexGuard, PoisonError,
    atomic::{AtomicU64, Ordering},
  },
};

use tokio::sync::mpsc::{self, error::TrySendError};
use tutormatch_core::matching::MatchOffer;
use uuid::Uuid;

/// Offers buffered per tutor before further sends are dropped.
const OFFER_BUFFER: usize = 1;

/// Identifies one registration in the [`OfferRegistry`], so that releasing it
/// never evicts a newer registration for the same tutor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfferTicket {
  tutor_id:   Uuid,
  generation: u64,
}

impl OfferTicket {
  pub fn tutor_id(&self) -> Uuid { self.tutor_id }
}

/// The receiving half of a tutor's offer channel.
#[derive(Debug)]
pub struct OfferSubscription {
  ticket:   OfferTicket,
  receiver: mpsc::Receiver<MatchOffer>,
}

impl OfferSubscription {
  pub fn tutor_id(&self) -> Uuid { self.ticket.tutor_id }

  pub fn ticket(&self) -> OfferTicket { self.ticket }

  /// Wait for the next offer. Returns `None` once the registration has been
  /// replaced or closed.
  pub async fn recv(&mut self) -> Option<MatchOffer> { self.receiver.recv().await }

  pub fn split(self) -> (OfferTicket, mpsc::Receiver<MatchOffer>) {
    (self.ticket, self.receiver)
  }
}

#[derive(Debug)]
struct Registration {
  generation: u64,
  sender:     mpsc::Sender<MatchOffer>,
}

/// Map from tutor to their live offer channel.
#[derive(Debug, Default)]
pub struct OfferRegistry {
  channels:   Mutex<HashMap<Uuid, Registration>>,
  generation: AtomicU64,
}

impl OfferRegistry {
  pub fn new() -> Self { Self::default() }

  fn channels(&self) -> MutexGuard<'_, HashMap<Uuid, Registration>> {
    self.channels.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Register a fresh channel for `tutor_id`, replacing any existing one. The
  /// replaced subscriber sees its stream end.
  pub fn open(&self, tutor_id: Uuid) -> OfferSubscription {
    let (sender, receiver) = mpsc::channel(OFFER_BUFFER);
    let generation = self.generation.fetch_add(1, Ordering::Relaxed);
    let replaced = self
      .channels()
      .insert(tutor_id, Registration { generation, sender });
    if replaced.is_some() {
      tracing::debug!(%tutor_id, "replaced existing offer channel");
    }
    OfferSubscription {
      ticket: OfferTicket {
        tutor_id,
        generation,
      },
      receiver,
    }
  }

  /// Remove whatever channel is registered for `tutor_id`. Idempotent:
  /// returns `false` when nothing was registered.
  pub fn close(&self, tutor_id: Uuid) -> bool {
    self.channels().remove(&tutor_id).is_some()
  }

  /// Remove the registration behind `ticket`, if it is still the current one.
  pub fn release(&self, ticket: OfferTicket) -> bool {
    let mut channels = self.channels();
    let current = channels
      .get(&ticket.tutor_id)
      .is_some_and(|r| r.generation == ticket.generation);
    if current {
      channels.remove(&ticket.tutor_id);
    }
    current
  }

  /// Try to deliver an offer without waiting. Returns `true` only if the
  /// offer was enqueued for a connected tutor.
  pub fn send(&self, tutor_id: Uuid, offer: MatchOffer) -> bool {
    let Some((generation, sender)) = self
      .channels()
      .get(&tutor_id)
      .map(|r| (r.generation, r.sender.clone()))
    else {
      tracing::debug!(%tutor_id, "tutor not connected");
      return false;
    };

    match sender.try_send(offer) {
      Ok(()) => true,
      Err(TrySendError::Full(_)) => {
        tracing::debug!(%tutor_id, "offer buffer full, dropping offer");
        false
      }
      Err(TrySendError::Closed(_)) => {
        tracing::debug!(%tutor_id, "offer channel closed, pruning");
        self.release(OfferTicket {
          tutor_id,
          generation,
        });
        false
      }
    }
  }

  pub fn is_connected(&self, tutor_id: Uuid) -> bool {
    self.channels().contains_key(&tutor_id)
  }

  pub fn len(&self) -> usize { self.channels().len() }

  pub fn is_empty(&self) -> bool { self.channels().is_empty() }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use tutormatch_core::{
    matching::StudentSnapshot,
    subject::Subject,
  };

  use super::*;

  fn offer() -> MatchOffer {
    MatchOffer {
      match_id:   Uuid::new_v4(),
      student:    StudentSnapshot {
        student_id: Uuid::new_v4(),
        first_name: "Ada".into(),
      },
      subject:    Subject {
        subject_id: Uuid::new_v4(),
        name:       "Algebra".into(),
        standard:   "9".into(),
      },
      expires_at: Utc::now(),
    }
  }

  #[tokio::test]
  async fn delivers_to_connected_tutor() {
    let registry = OfferRegistry::new();
    let tutor = Uuid::new_v4();
    let mut sub = registry.open(tutor);

    let sent = offer();
    assert!(registry.send(tutor, sent.clone()));
    assert_eq!(sub.recv().await, Some(sent));
  }

  #[test]
  fn send_to_unknown_tutor_is_dropped() {
    let registry = OfferRegistry::new();
    assert!(!registry.send(Uuid::new_v4(), offer()));
  }

  #[test]
  fn full_buffer_drops_without_blocking() {
    let registry = OfferRegistry::new();
    let tutor = Uuid::new_v4();
    let _sub = registry.open(tutor);

    assert!(registry.send(tutor, offer()));
    assert!(!registry.send(tutor, offer()));
    assert!(registry.is_connected(tutor));
  }

  #[test]
  fn closed_channel_is_pruned() {
    let registry = OfferRegistry::new();
    let tutor = Uuid::new_v4();
    drop(registry.open(tutor));

    assert!(!registry.send(tutor, offer()));
    assert!(!registry.is_connected(tutor));
  }

  #[tokio::test]
  async fn reopening_replaces_previous_channel() {
    let registry = OfferRegistry::new();
    let tutor = Uuid::new_v4();
    let mut first = registry.open(tutor);
    let mut second = registry.open(tutor);

    assert_eq!(first.recv().await, None);
    let sent = offer();
    assert!(registry.send(tutor, sent.clone()));
    assert_eq!(second.recv().await, Some(sent));
    assert_eq!(registry.len(), 1);
  }

  #[tokio::test]
  async fn close_is_idempotent() {
    let registry = OfferRegistry::new();
    let tutor = Uuid::new_v4();
    let mut sub = registry.open(tutor);

    assert!(registry.close(tutor));
    assert!(!registry.close(tutor));
    assert!(!registry.send(tutor, offer()));
    assert!(!registry.is_connected(tutor));
    assert_eq!(sub.recv().await, None);
  }

  #[test]
  fn stale_release_keeps_newer_registration() {
    let registry = OfferRegistry::new();
    let tutor = Uuid::new_v4();
    let first = registry.open(tutor);
    let second = registry.open(tutor);

    assert!(!registry.release(first.ticket()));
    assert!(registry.is_connected(tutor));
    assert!(registry.release(second.ticket()));
    assert!(!registry.is_connected(tutor));
  }
}
