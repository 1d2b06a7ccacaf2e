//! Router tests against an in-memory store.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt as _;
use tutormatch_core::{
  Actor,
  participant::{NewStudent, NewTutor, Student, Tutor},
  store::MatchStore,
};
use tutormatch_engine::{EngineConfig, LogNotifier, Matchmaker};
use tutormatch_store_sqlite::SqliteStore;
use uuid::Uuid;

use crate::api_router;

type Engine = Matchmaker<SqliteStore, LogNotifier>;

async fn setup() -> (Engine, Router) {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let config = EngineConfig {
    offer_window_ms: 60_000,
    scheduled_expiry_ms: 60_000,
    ..EngineConfig::default()
  };
  let engine = Matchmaker::new(Arc::new(store), Arc::new(LogNotifier), config);
  let app = api_router(engine.clone());
  (engine, app)
}

async fn student(engine: &Engine) -> Student {
  engine
    .store()
    .add_student(NewStudent { first_name: "Ada".into(), push_token: None })
    .await
    .unwrap()
}

async fn tutor(engine: &Engine) -> Tutor {
  engine
    .store()
    .add_tutor(NewTutor { first_name: "Tom".into(), push_token: None })
    .await
    .unwrap()
}

async fn call(
  app:   &Router,
  method: &str,
  uri:   &str,
  actor: Option<String>,
  body:  Option<Value>,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(actor) = actor {
    builder = builder.header("x-actor", actor);
  }
  let body = match body {
    Some(json) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(json.to_string())
    }
    None => Body::empty(),
  };
  let resp = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, value)
}

fn as_student(s: &Student) -> Option<String> { Some(Actor::Student(s.student_id).to_string()) }

fn as_tutor(t: &Tutor) -> Option<String> { Some(Actor::Tutor(t.tutor_id).to_string()) }

fn scheduled_body(tutor: &Tutor) -> Value {
  json!({
    "tutor_id": tutor.tutor_id,
    "subject": "Algebra",
    "standard": "Grade 9",
    "start": "2027-03-01T10:00:00Z",
    "end": "2027-03-01T11:00:00Z",
  })
}

// ── Caller ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_or_malformed_actor_is_401() {
  let (_engine, app) = setup().await;

  let (status, _) = call(&app, "GET", "/matches/pending", None, None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let (status, body) = call(&app, "GET", "/matches/pending", Some("admin:1".into()), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert!(body["error"].is_string());
}

#[tokio::test]
async fn wrong_role_is_403() {
  let (engine, app) = setup().await;
  let tom = tutor(&engine).await;

  let body = json!({ "subject": "Algebra", "standard": "Grade 9" });
  let (status, _) = call(&app, "POST", "/matches/on-demand", as_tutor(&tom), Some(body)).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

// ── On-demand ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn on_demand_request_is_accepted_and_pollable() {
  let (engine, app) = setup().await;
  let ada = student(&engine).await;

  let body = json!({ "subject": "Algebra", "standard": "Grade 9" });
  let (status, created) =
    call(&app, "POST", "/matches/on-demand", as_student(&ada), Some(body)).await;
  assert_eq!(status, StatusCode::ACCEPTED);
  let match_id = created["match_id"].as_str().unwrap().to_owned();

  let (status, outcome) = call(&app, "GET", &format!("/matches/{match_id}"), as_student(&ada), None).await;
  assert_eq!(status, StatusCode::OK);
  let outcome = outcome["outcome"].as_str().unwrap();
  assert!(outcome == "pending" || outcome == "failed", "outcome: {outcome}");
}

#[tokio::test]
async fn unknown_match_is_404() {
  let (engine, app) = setup().await;
  let ada = student(&engine).await;
  let tom = tutor(&engine).await;

  let uri = format!("/matches/{}", Uuid::new_v4());
  let (status, _) = call(&app, "GET", &uri, as_student(&ada), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let uri = format!("/matches/on-demand/{}/accept", Uuid::new_v4());
  let (status, _) = call(&app, "POST", &uri, as_tutor(&tom), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Scheduled ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn scheduled_request_accept_and_conflict() {
  let (engine, app) = setup().await;
  let ada = student(&engine).await;
  let tom = tutor(&engine).await;

  let (status, m) =
    call(&app, "POST", "/matches/scheduled", as_student(&ada), Some(scheduled_body(&tom))).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(m["status"], "matching");
  let match_id = m["match_id"].as_str().unwrap().to_owned();

  let (status, pending) = call(&app, "GET", "/matches/pending", as_tutor(&tom), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(pending.as_array().unwrap().len(), 1);

  let accept = format!("/matches/scheduled/{match_id}/accept");
  let (status, lesson) = call(&app, "POST", &accept, as_tutor(&tom), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(lesson["scheduled"], true);

  let (status, outcome) = call(&app, "GET", &format!("/matches/{match_id}"), as_student(&ada), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(outcome["outcome"], "matched");
  assert_eq!(outcome["lesson"]["lesson_id"], lesson["lesson_id"]);

  let (status, _) = call(&app, "POST", &accept, as_tutor(&tom), None).await;
  assert_eq!(status, StatusCode::CONFLICT);
  engine.shutdown();
}

#[tokio::test]
async fn inverted_window_is_400() {
  let (engine, app) = setup().await;
  let ada = student(&engine).await;
  let tom = tutor(&engine).await;

  let mut body = scheduled_body(&tom);
  body["end"] = json!("2027-03-01T09:00:00Z");
  let (status, _) = call(&app, "POST", "/matches/scheduled", as_student(&ada), Some(body)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn no_scheduled_candidates_is_404() {
  let (engine, app) = setup().await;
  let ada = student(&engine).await;

  let uri = "/candidates/scheduled?subject=Algebra&standard=9\
             &start=2027-03-01T10:00:00Z&end=2027-03-01T11:00:00Z";
  let (status, body) = call(&app, "GET", uri, as_student(&ada), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["error"], "no eligible tutors found");
}

#[tokio::test]
async fn oversized_candidate_limit_is_400() {
  let (engine, app) = setup().await;
  let ada = student(&engine).await;

  for limit in ["18446744073709551615", "1000000000000", "0"] {
    let uri = format!(
      "/candidates/scheduled?subject=Algebra&standard=9\
       &start=2027-03-01T10:00:00Z&end=2027-03-01T11:00:00Z&limit={limit}"
    );
    let (status, body) = call(&app, "GET", &uri, as_student(&ada), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "limit={limit}");
    assert!(body["error"].is_string());
  }
}

// ── Tutors ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn heartbeat_is_tutor_only() {
  let (engine, app) = setup().await;
  let ada = student(&engine).await;
  let tom = tutor(&engine).await;

  let body = json!({ "status": "online" });
  let (status, _) = call(&app, "POST", "/heartbeat", as_tutor(&tom), Some(body.clone())).await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (status, _) = call(&app, "POST", "/heartbeat", as_student(&ada), Some(body)).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let stored = engine.store().get_tutor(tom.tutor_id).await.unwrap().unwrap();
  assert_eq!(stored.presence, tutormatch_core::participant::PresenceStatus::Online);
}

#[tokio::test]
async fn offer_stream_registers_until_dropped() {
  let (engine, app) = setup().await;
  let tom = tutor(&engine).await;

  let req = Request::builder()
    .uri("/offers")
    .header("x-actor", Actor::Tutor(tom.tutor_id).to_string())
    .body(Body::empty())
    .unwrap();
  let resp = app.clone().oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::OK);
  let content_type = resp.headers().get(header::CONTENT_TYPE).unwrap().to_str().unwrap();
  assert!(content_type.starts_with("text/event-stream"), "content-type: {content_type}");
  assert!(engine.registry().is_connected(tom.tutor_id));

  drop(resp);
  assert!(!engine.registry().is_connected(tom.tutor_id));
}

#[tokio::test]
async fn offer_stream_rejects_students() {
  let (engine, app) = setup().await;
  let ada = student(&engine).await;

  let (status, _) = call(&app, "GET", "/offers", as_student(&ada), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert!(engine.registry().is_empty());
}

// ── Notifications ───────────────────────────────────────────────────────────

#[tokio::test]
async fn notification_feed_and_mark_read() {
  let (engine, app) = setup().await;
  let ada = student(&engine).await;
  let tom = tutor(&engine).await;

  call(&app, "POST", "/matches/scheduled", as_student(&ada), Some(scheduled_body(&tom))).await;

  let (status, feed) = call(&app, "GET", "/notifications", as_tutor(&tom), None).await;
  assert_eq!(status, StatusCode::OK);
  let feed = feed.as_array().unwrap();
  assert_eq!(feed.len(), 1);
  assert_eq!(feed[0]["title"], "New scheduled lesson request!");
  let id = feed[0]["notification_id"].as_str().unwrap().to_owned();

  let uri = format!("/notifications/{id}/read");
  let (status, _) = call(&app, "POST", &uri, as_student(&ada), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, _) = call(&app, "POST", &uri, as_tutor(&tom), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (_, feed) = call(&app, "GET", "/notifications", as_tutor(&tom), None).await;
  assert_eq!(feed[0]["read"], true);
  engine.shutdown();
}
