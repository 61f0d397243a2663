// tests/api_tests.rs

use std::sync::Arc;

use assessment::{
    config::{Config, StoreConfig},
    handlers::session::SAVE_FAILED_WARNING,
    routes,
    scoring::ScoringEngine,
    state::AppState,
    store::{DynStore, MemoryStore, StoreOp},
};
use serde_json::{Value, json};

struct TestApp {
    address: String,
    store: Arc<MemoryStore>,
}

/// Spawns the app on a random port backed by an in-memory store.
async fn spawn_app() -> TestApp {
    let config = Config {
        store: StoreConfig {
            url: "postgres://localhost/unused".to_string(),
            access_key: "unused".to_string(),
        },
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
    };

    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(store.clone() as DynStore, ScoringEngine::standard(), config);
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp { address, store }
}

/// Registers a participant and returns the bearer token.
async fn register(app: &TestApp, client: &reqwest::Client, email: &str) -> String {
    let response = client
        .post(format!("{}/api/session/register", app.address))
        .json(&json!({ "name": "Rina", "email": email }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 201);

    let body: Value = response.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

async fn answer(app: &TestApp, client: &reqwest::Client, token: &str, component: &str, selected: Value) -> Value {
    let response = client
        .post(format!("{}/api/session/answer", app.address))
        .bearer_auth(token)
        .json(&json!({ "component": component, "selected": selected }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);
    response.json().await.unwrap()
}

#[tokio::test]
async fn health_check_404() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/random_path_that_does_not_exist", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_creates_person_and_session() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/session/register", app.address))
        .json(&json!({ "name": "Rina", "email": "  Rina@Example.com " }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["type"], "Bearer");
    assert_eq!(body["scene"], "sqlTutorial");

    let persons = app.store.persons().await;
    assert_eq!(persons.len(), 1);
    assert_eq!(persons[0].email.as_deref(), Some("rina@example.com"));
    assert_eq!(body["person_id"], persons[0].id.to_string());
}

#[tokio::test]
async fn register_rejects_invalid_email() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/session/register", app.address))
        .json(&json!({ "name": "Rina", "email": "not-an-email" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
    assert!(app.store.persons().await.is_empty());
}

#[tokio::test]
async fn session_routes_require_token() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/session/answer", app.address))
        .json(&json!({ "component": "logical-1", "selected": "a" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 401);

    let response = client
        .get(format!("{}/api/session/scores", app.address))
        .bearer_auth("garbage")
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn answers_are_scored_and_totalled() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let token = register(&app, &client, "rina@example.com").await;

    let first = answer(&app, &client, &token, "logical-1", json!("a")).await;
    assert_eq!(first["questionId"], "Quiz1Q1");
    assert_eq!(first["isCorrect"], true);
    assert_eq!(first["correctAnswer"], "a");

    let wrong = answer(&app, &client, &token, "numerical-2", json!(["c"])).await;
    assert_eq!(wrong["isCorrect"], false);

    answer(&app, &client, &token, "data-interpretation-4", json!(["b", "A"])).await;

    // Resubmitting replaces the earlier answer.
    answer(&app, &client, &token, "numerical-2", json!("B")).await;

    let response = client
        .get(format!("{}/api/session/scores", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);

    let scores: Value = response.json().await.unwrap();
    assert_eq!(scores["quiz1Score"], json!({ "score": 1, "total": 5 }));
    assert_eq!(scores["quiz2Score"], json!({ "score": 1, "total": 5 }));
    assert_eq!(scores["quiz3Score"], json!({ "score": 1, "total": 4 }));
    assert_eq!(scores["totalScore"], 3);
}

#[tokio::test]
async fn scene_navigation_stops_at_registration() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let token = register(&app, &client, "rina@example.com").await;

    let back = client
        .post(format!("{}/api/session/scene/back", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(back.status().as_u16(), 409);

    let next = client
        .post(format!("{}/api/session/scene/next", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(next.status().as_u16(), 200);
    let body: Value = next.json().await.unwrap();
    assert_eq!(body["scene"], "quiz1Cover");

    let back = client
        .post(format!("{}/api/session/scene/back", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request");
    let body: Value = back.json().await.unwrap();
    assert_eq!(body["scene"], "sqlTutorial");
}

#[tokio::test]
async fn finish_persists_scores_and_essays_once() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let token = register(&app, &client, "rina@example.com").await;

    answer(&app, &client, &token, "logical-5", json!("e")).await;
    let essay = client
        .post(format!("{}/api/session/essay", app.address))
        .bearer_auth(&token)
        .json(&json!({ "essay": "essay1", "answer": "Joins first<script>x()</script>" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(essay.status().as_u16(), 200);

    for _ in 0..2 {
        let response = client
            .post(format!("{}/api/session/finish", app.address))
            .bearer_auth(&token)
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["saved"], true);
        assert!(body.get("warning").is_none());
        assert_eq!(body["scores"]["totalScore"], 1);
    }

    let scores = app.store.scores().await;
    assert_eq!(scores.len(), 1);
    assert_eq!(scores[0].quiz_one_score, 1);
    assert_eq!(scores[0].quiz_two_score, 0);

    let person = app.store.person(scores[0].person).await.unwrap();
    assert_eq!(person.essay1_answer.as_deref(), Some("Joins first"));
    assert_eq!(person.essay2_answer, None);
}

#[tokio::test]
async fn failed_save_still_shows_results() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let token = register(&app, &client, "rina@example.com").await;
    answer(&app, &client, &token, "logical-1", json!("a")).await;

    app.store.fail(StoreOp::UpsertScore).await;
    let response = client
        .post(format!("{}/api/session/finish", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["saved"], false);
    assert_eq!(body["warning"], SAVE_FAILED_WARNING);
    assert_eq!(body["scores"]["totalScore"], 1);
    assert!(app.store.scores().await.is_empty());

    // A retry after the store recovers goes through.
    app.store.recover(StoreOp::UpsertScore).await;
    let response = client
        .post(format!("{}/api/session/finish", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request");
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["saved"], true);
    assert_eq!(app.store.scores().await.len(), 1);
}

#[tokio::test]
async fn answers_are_frozen_after_finish() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let token = register(&app, &client, "rina@example.com").await;

    let first: Value = client
        .post(format!("{}/api/session/finish", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .unwrap();
    assert_eq!(first["saved"], true);
    assert_eq!(first["scores"]["totalScore"], 0);

    let late_answer = client
        .post(format!("{}/api/session/answer", app.address))
        .bearer_auth(&token)
        .json(&json!({ "component": "logical-1", "selected": "a" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(late_answer.status().as_u16(), 409);

    let late_essay = client
        .post(format!("{}/api/session/essay", app.address))
        .bearer_auth(&token)
        .json(&json!({ "essay": "essay2", "answer": "too late" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(late_essay.status().as_u16(), 409);

    let second: Value = client
        .post(format!("{}/api/session/finish", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .unwrap();
    assert_eq!(second["saved"], true);
    assert_eq!(second["scores"]["totalScore"], 0);

    let scores = app.store.scores().await;
    assert_eq!(scores.len(), 1);
    assert_eq!(scores[0].quiz_one_score, 0);
    let person = app.store.person(scores[0].person).await.unwrap();
    assert_eq!(person.essay2_answer, None);
}

#[tokio::test]
async fn concurrent_finish_writes_one_score_row() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let token = register(&app, &client, "rina@example.com").await;
    answer(&app, &client, &token, "logical-1", json!("a")).await;

    let finish = || {
        client
            .post(format!("{}/api/session/finish", app.address))
            .bearer_auth(&token)
            .send()
    };
    let (a, b) = tokio::join!(finish(), finish());
    let statuses = [
        a.expect("Failed to execute request").status().as_u16(),
        b.expect("Failed to execute request").status().as_u16(),
    ];

    assert!(statuses.contains(&200));
    assert!(statuses.iter().all(|s| *s == 200 || *s == 409));
    assert_eq!(app.store.scores().await.len(), 1);
}

#[tokio::test]
async fn scene_conflict_uses_wire_name() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let token = register(&app, &client, "rina@example.com").await;

    let back = client
        .post(format!("{}/api/session/scene/back", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(back.status().as_u16(), 409);
    let body: Value = back.json().await.unwrap();
    assert_eq!(body["error"], "Cannot go back from sqlTutorial");
}
