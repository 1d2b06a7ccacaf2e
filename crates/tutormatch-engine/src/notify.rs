//! Durable notifications and the push side-channel.

use std::{future::Future, sync::Arc};

use thiserror::Error;
use tutormatch_core::{
  Actor, Error, Result,
  notification::{NewNotification, Notification},
  store::MatchStore,
};

#[derive(Debug, Error)]
pub enum NotifyError {
  /// The push provider refused the message.
  #[error("push rejected: {0}")]
  Rejected(String),

  #[error("push transport failed: {0}")]
  Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Delivers a stored notification to a device. Failures are logged by the
/// caller and never affect match state.
pub trait Notifier: Send + Sync + 'static {
  fn send<'a>(
    &'a self,
    notification: &'a Notification,
    device_token: &'a str,
  ) -> impl Future<Output = Result<(), NotifyError>> + Send + 'a;
}

/// A notifier that only logs. Used when no push provider is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
  async fn send(
    &self,
    notification: &Notification,
    _device_token: &str,
  ) -> Result<(), NotifyError> {
    tracing::info!(
      recipient = %notification.recipient,
      title = %notification.title,
      "push notification"
    );
    Ok(())
  }
}

/// Persists a notification, then pushes it if the recipient has a device
/// token.
pub struct NotificationRecorder<S, N> {
  store:    Arc<S>,
  notifier: Arc<N>,
}

impl<S, N> Clone for NotificationRecorder<S, N> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      notifier: Arc::clone(&self.notifier),
    }
  }
}

impl<S: MatchStore, N: Notifier> NotificationRecorder<S, N> {
  pub fn new(store: Arc<S>, notifier: Arc<N>) -> Self { Self { store, notifier } }

  /// Store a notification for `recipient` and push it. Only the store write
  /// can fail; push problems are logged.
  pub async fn notify(
    &self,
    recipient: Actor,
    title: &str,
    subtitle: String,
  ) -> Result<Notification> {
    let notification = self
      .store
      .create_notification(NewNotification::new(recipient, title, subtitle))
      .await
      .map_err(Error::upstream)?;

    match self.device_token(recipient).await {
      Ok(Some(token)) => {
        if let Err(e) = self.notifier.send(&notification, &token).await {
          tracing::warn!(%recipient, error = %e, "push delivery failed");
        }
      }
      Ok(None) => {
        tracing::debug!(%recipient, "no device token, skipping push");
      }
      Err(e) => {
        tracing::warn!(%recipient, error = %e, "device token lookup failed");
      }
    }

    Ok(notification)
  }

  async fn device_token(&self, recipient: Actor) -> Result<Option<String>, S::Error> {
    Ok(match recipient {
      Actor::Student(id) => {
        self.store.get_student(id).await?.and_then(|s| s.push_token)
      }
      Actor::Tutor(id) => self.store.get_tutor(id).await?.and_then(|t| t.push_token),
    })
  }
}
