//! Durable notifications. Append-only; `read` is the only field that ever
//! changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Actor;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
  pub notification_id: Uuid,
  pub recipient:       Actor,
  pub title:           String,
  pub subtitle:        String,
  pub image:           String,
  pub read:            bool,
  pub created_at:      DateTime<Utc>,
}

/// Input to [`crate::store::MatchStore::create_notification`].
#[derive(Debug, Clone)]
pub struct NewNotification {
  pub recipient: Actor,
  pub title:     String,
  pub subtitle:  String,
  pub image:     String,
}

impl NewNotification {
  pub fn new(
    recipient: Actor,
    title: impl Into<String>,
    subtitle: impl Into<String>,
  ) -> Self {
    Self {
      recipient,
      title: title.into(),
      subtitle: subtitle.into(),
      image: String::new(),
    }
  }
}
