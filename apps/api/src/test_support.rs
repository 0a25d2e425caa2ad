//! In-process stand-in for the external recommendation backend, bound to an
//! ephemeral port so client and session tests exercise real HTTP.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct FakeBackend {
    pub stage1_track: String,
    pub fail_final: bool,
    pub html_recommendation: bool,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            stage1_track: "frontend".to_string(),
            fail_final: false,
            html_recommendation: false,
        }
    }
}

struct Shared {
    config: FakeBackend,
    last_auth: Mutex<Option<String>>,
    last_question_query: Mutex<Option<HashMap<String, String>>>,
}

pub struct RunningBackend {
    pub base_url: String,
    shared: Arc<Shared>,
}

impl RunningBackend {
    pub fn last_auth(&self) -> Option<String> {
        self.shared.last_auth.lock().unwrap().clone()
    }

    pub fn last_question_query(&self) -> Option<HashMap<String, String>> {
        self.shared.last_question_query.lock().unwrap().clone()
    }
}

pub async fn spawn_backend(config: FakeBackend) -> RunningBackend {
    let shared = Arc::new(Shared {
        config,
        last_auth: Mutex::new(None),
        last_question_query: Mutex::new(None),
    });

    let app = Router::new()
        .route("/jobs", get(|| async { Json(jobs()) }))
        .route("/job-details", get(|| async { Json(job_details()) }))
        .route("/career-tracks", get(|| async { Json(career_tracks()) }))
        .route("/survey-questions", get(survey_questions))
        .route("/recommendation", post(recommendation))
        .route("/recommendation/stage1", post(stage1))
        .route("/recommendation/final", post(final_scoring))
        .with_state(shared.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    RunningBackend {
        base_url: format!("http://{addr}"),
        shared,
    }
}

fn record_auth(shared: &Shared, headers: &HeaderMap) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    *shared.last_auth.lock().unwrap() = auth;
}

fn jobs() -> Value {
    json!([
        {"id": "frontend", "name": "Frontend Developer", "track": "frontend", "subfields": ["web", "mobile"]},
        {"id": "backend", "name": "Backend Developer", "track": "backend", "subfields": ["server", "cloud"]},
        {"id": "ai", "name": "AI Engineer", "track": "ai", "subfields": ["ml", "data"]}
    ])
}

fn job_details() -> Value {
    json!([
        {"jobId": "frontend", "title": "Frontend Developer", "strengths": ["Visual sense"], "similarJobs": ["UI Designer"]},
        {"jobId": "backend", "title": "Backend Developer", "strengths": ["Systems thinking"], "similarJobs": ["DevOps"]},
        {"jobId": "ai", "title": "AI Engineer", "strengths": ["Analysis"], "similarJobs": ["Data Scientist"]}
    ])
}

fn career_tracks() -> Value {
    json!([
        {"id": "frontend", "name": "Frontend"},
        {"id": "backend", "name": "Backend"},
        {"id": "ai", "name": "AI"}
    ])
}

async fn survey_questions(
    State(shared): State<Arc<Shared>>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    *shared.last_question_query.lock().unwrap() = Some(params.clone());
    let stage = params.get("stage").map(String::as_str);
    let track = params.get("track").map(String::as_str);
    let questions = match (stage, track) {
        // No parameters: the single-stage survey, scored straight into jobs.
        (None, None) => json!([
            {"id": "q-1", "question": "Pick a weekend project", "options": [
                {"id": "ui", "text": "A slick landing page", "score": {"frontend": 3}},
                {"id": "api", "text": "A chat server", "score": {"backend": 3}}
            ]},
            {"id": "q-2", "question": "What do you notice first?", "options": [
                {"id": "look", "text": "How it looks", "score": {"frontend": 2}},
                {"id": "data", "text": "The numbers", "score": {"ai": 2}}
            ]}
        ]),
        (Some("1"), _) => json!([
            {"id": "s1-1", "question": "Pick a weekend project", "options": [
                {"id": "ui", "text": "A slick landing page", "score": {"frontend": 3}},
                {"id": "api", "text": "A chat server", "score": {"backend": 3}}
            ]},
            {"id": "s1-it", "question": "Favourite CS course", "condition": {"major": "it"}, "options": [
                {"id": "ml", "text": "Machine learning", "score": {"ai": 3}}
            ]},
            {"id": "s1-2", "question": "What do you notice first?", "options": [
                {"id": "look", "text": "How it looks", "score": {"frontend": 2}},
                {"id": "data", "text": "The numbers", "score": {"ai": 2}}
            ]}
        ]),
        (Some("2"), Some("frontend")) => json!([
            {"id": 21, "question": "Which screen would you build?", "options": [
                {"text": "Web dashboard", "score": {"frontend": 5}, "subfieldScores": {"web": 2}},
                {"text": "Phone app", "score": {"frontend": 5}, "subfieldScores": {"mobile": 2}}
            ]}
        ]),
        (Some("2"), Some("ai")) => json!([
            {"id": 31, "question": "Which dataset?", "options": [
                {"text": "Images", "score": {"ai": 5}}
            ]}
        ]),
        _ => json!([]),
    };
    Json(questions)
}

async fn recommendation(State(shared): State<Arc<Shared>>, headers: HeaderMap) -> Response {
    record_auth(&shared, &headers);
    if shared.config.html_recommendation {
        return Html("<!doctype html><html><body>app shell</body></html>").into_response();
    }
    Json(json!({"topJob": "frontend", "scores": {"frontend": 5, "backend": 3, "ai": 0}}))
        .into_response()
}

async fn stage1(
    State(shared): State<Arc<Shared>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    record_auth(&shared, &headers);
    if body.get("answers").and_then(Value::as_array).is_none() || body.get("profile").is_none() {
        return (StatusCode::BAD_REQUEST, "missing answers or profile").into_response();
    }
    Json(json!({
        "topTrack": shared.config.stage1_track,
        "traitScores": {"creative": 4, "analytical": 2},
        "confidence": 0.7
    }))
    .into_response()
}

async fn final_scoring(
    State(shared): State<Arc<Shared>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    record_auth(&shared, &headers);
    if shared.config.fail_final {
        return (StatusCode::INTERNAL_SERVER_ERROR, "scoring exploded").into_response();
    }
    let track = body
        .get("track")
        .and_then(Value::as_str)
        .unwrap_or("frontend")
        .to_string();
    Json(json!({
        "topTrack": track,
        "topJob": track,
        "topSubfield": "web",
        "scores": {"frontend": 5, "backend": 1, "ai": 0},
        "ranking": [{"jobId": "frontend", "score": 5}, {"jobId": "backend", "score": 1}, {"jobId": "ai", "score": 0}],
        "traitScores": {"creative": 4},
        "skillScores": {"html": 3},
        "readiness": 0.5,
        "confidence": 0.8
    }))
    .into_response()
}
