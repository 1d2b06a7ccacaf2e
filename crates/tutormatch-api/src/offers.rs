//! Handler for `GET /offers`: live match offers as server-sent events.
//!
//! A tutor holds this stream open to receive offers. Each offer is an
//! `offer` event whose data is the JSON [`MatchOffer`]. Opening a second
//! stream for the same tutor ends the first one.

use std::{convert::Infallible, sync::Arc};

use axum::{
  extract::State,
  response::sse::{Event, KeepAlive, Sse},
};
use futures::{
  Stream,
  future,
  stream::{self, StreamExt},
};
use tokio_stream::wrappers::ReceiverStream;
use tutormatch_core::{matching::MatchOffer, store::MatchStore};
use tutormatch_engine::{Matchmaker, Notifier, OfferRegistry, OfferTicket};

use crate::{caller::Caller, error::ApiError};

/// Releases the tutor's registration when the stream is dropped.
struct Registration {
  registry: Arc<OfferRegistry>,
  ticket:   OfferTicket,
}

impl Drop for Registration {
  fn drop(&mut self) {
    if self.registry.release(self.ticket) {
      tracing::debug!(tutor_id = %self.ticket.tutor_id(), "offer stream closed");
    }
  }
}

/// `GET /offers` (tutor only)
pub async fn subscribe<S, N>(
  State(engine): State<Matchmaker<S, N>>,
  Caller(actor): Caller,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError>
where
  S: MatchStore + 'static,
  N: Notifier,
{
  let (ticket, receiver) = engine.subscribe_offers(actor)?.split();
  let registration = Registration {
    registry: Arc::clone(engine.registry()),
    ticket,
  };

  let connected =
    stream::once(async { Ok::<_, Infallible>(Event::default().event("connected").data("ok")) });

  let offers = ReceiverStream::new(receiver).filter_map(move |offer| {
    let _registration = &registration;
    future::ready(offer_event(&offer).map(Ok))
  });

  Ok(Sse::new(connected.chain(offers)).keep_alive(KeepAlive::default()))
}

fn offer_event(offer: &MatchOffer) -> Option<Event> {
  Event::default()
    .event("offer")
    .id(offer.match_id.to_string())
    .json_data(offer)
    .inspect_err(|e| tracing::warn!(match_id = %offer.match_id, error = %e, "failed to encode offer"))
    .ok()
}
