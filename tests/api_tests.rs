// tests/api_tests.rs

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use review_backend::{
    config::Config, db::MemoryStore, routes, state::AppState, utils::jwt::sign_jwt,
};
use serde_json::{Value, json};
use tower::ServiceExt;

const SECRET: &str = "test_secret_for_integration_tests";

struct TestApp {
    address: String,
    client: reqwest::Client,
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.address, path)
    }

    fn token(user_id: i64, role: &str) -> String {
        sign_jwt(user_id, role, SECRET, 600).expect("Failed to sign token")
    }

    async fn record(&self, user_id: i64, body: Value) -> reqwest::Response {
        self.client
            .post(self.url("/wrong-answers"))
            .bearer_auth(Self::token(user_id, "user"))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    async fn record_ok(&self, user_id: i64, body: Value) -> Value {
        let response = self.record(user_id, body).await;
        assert_eq!(response.status().as_u16(), 200);
        response.json().await.expect("Invalid JSON")
    }
}

/// Spawns the app over an in-memory store on a random port.
async fn spawn_app() -> TestApp {
    let config = Config::for_secret(SECRET);
    let state = AppState::new(Arc::new(MemoryStore::new()), config);
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
    }
}

fn wrong_answer(question_id: i64, source: &str, difficulty: &str) -> Value {
    json!({
        "question_id": question_id,
        "source": source,
        "is_correct": false,
        "difficulty": difficulty,
        "question_title": format!("Question {}", question_id),
    })
}

#[tokio::test]
async fn unknown_path_is_404() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(format!("{}/random_path_that_does_not_exist", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn requests_without_token_are_rejected() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(app.url("/wrong-answers"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn non_admin_cannot_change_scheduler_config() {
    let state = AppState::new(Arc::new(MemoryStore::new()), Config::for_secret(SECRET));
    let app = routes::create_router(state);

    let request = Request::builder()
        .method("PUT")
        .uri("/api/scheduler/config")
        .header(header::AUTHORIZATION, format!("Bearer {}", TestApp::token(3, "user")))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"strategy":"fsrs"}"#))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn missing_outcome_fails_validation() {
    let app = spawn_app().await;

    let response = app
        .record(
            1,
            json!({ "question_id": 10, "source": "question_bank" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);

    // Nothing was stored.
    let list: Value = app
        .client
        .get(app.url("/wrong-answers"))
        .bearer_auth(TestApp::token(1, "user"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn record_then_review_flow() {
    let app = spawn_app().await;
    let token = TestApp::token(7, "user");

    let record = app.record_ok(7, wrong_answer(100, "ai_interview", "hard")).await;
    assert_eq!(record["wrong_count"], 1);
    assert_eq!(record["review_status"], "reviewing");
    assert_eq!(record["review_priority"], "high");
    assert_eq!(record["interval_days"], 1);
    assert!(record.get("version").is_none());
    let id = record["id"].as_i64().unwrap();

    // Same question again updates the same record.
    let again = app.record_ok(7, wrong_answer(100, "ai_interview", "hard")).await;
    assert_eq!(again["id"].as_i64().unwrap(), id);
    assert_eq!(again["wrong_count"], 2);

    let reviewed: Value = app
        .client
        .post(app.url(&format!("/wrong-answers/{}/review", id)))
        .bearer_auth(&token)
        .json(&json!({ "result": "pass", "time_spent_sec": 45, "notes": "<b>ok</b><script>x</script>" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(reviewed["correct_count"], 1);
    assert_eq!(reviewed["last_quality"], 5);

    let logs: Value = app
        .client
        .get(app.url(&format!("/wrong-answers/{}/logs", id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(logs["total"], 1);
    assert_eq!(logs["items"][0]["result"], "pass");
    assert_eq!(logs["items"][0]["previous_status"], "reviewing");
    assert_eq!(logs["items"][0]["notes"], "<b>ok</b>");
}

#[tokio::test]
async fn invalid_review_result_is_rejected_without_side_effects() {
    let app = spawn_app().await;
    let token = TestApp::token(3, "user");
    let record = app.record_ok(3, wrong_answer(5, "custom", "easy")).await;
    let id = record["id"].as_i64().unwrap();

    let response = app
        .client
        .post(app.url(&format!("/wrong-answers/{}/review", id)))
        .bearer_auth(&token)
        .json(&json!({ "result": "sort-of" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let current: Value = app
        .client
        .get(app.url(&format!("/wrong-answers/{}", id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(current["wrong_count"], 1);
    assert_eq!(current["correct_count"], 0);
}

#[tokio::test]
async fn records_of_other_users_are_not_found() {
    let app = spawn_app().await;
    let record = app.record_ok(1, wrong_answer(1, "mock_exam", "medium")).await;
    let id = record["id"].as_i64().unwrap();

    let response = app
        .client
        .put(app.url(&format!("/wrong-answers/{}/mark-mastered", id)))
        .bearer_auth(TestApp::token(2, "user"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn statistics_reflect_status_source_and_difficulty() {
    let app = spawn_app().await;
    let token = TestApp::token(11, "user");

    app.record_ok(11, wrong_answer(1, "ai_interview", "medium")).await;
    let hard = app.record_ok(11, wrong_answer(2, "ai_interview", "hard")).await;
    app.record_ok(11, wrong_answer(3, "question_bank", "easy")).await;

    let response = app
        .client
        .put(app.url(&format!("/wrong-answers/{}/mark-mastered", hard["id"])))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let mastered: Value = response.json().await.unwrap();
    assert!(mastered["next_review_time"].is_null());

    let stats: Value = app
        .client
        .get(app.url("/wrong-answers/statistics"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(stats["total_wrong_count"], 3);
    assert_eq!(stats["mastered_count"], 1);
    assert_eq!(stats["reviewing_count"], 2);
    let pct = stats["mastered_percentage"].as_f64().unwrap();
    assert!((pct - 33.33).abs() < 0.01);
    assert_eq!(stats["count_by_source"]["ai_interview"], 2);
    assert_eq!(stats["count_by_source"]["question_bank"], 1);
    assert_eq!(stats["count_by_source"]["mock_exam"], 0);
    assert_eq!(stats["today_count"], 3);
}

#[tokio::test]
async fn batch_delete_counts_partial_success() {
    let app = spawn_app().await;
    let token = TestApp::token(5, "user");

    let mut ids = Vec::new();
    for question_id in 1..=3 {
        let record = app.record_ok(5, wrong_answer(question_id, "custom", "easy")).await;
        ids.push(record["id"].as_i64().unwrap());
    }
    // One id that does not exist, one owned by someone else.
    let foreign = app.record_ok(6, wrong_answer(1, "custom", "easy")).await;
    ids.push(9_999);
    ids.push(foreign["id"].as_i64().unwrap());

    let response = app
        .client
        .post(app.url("/wrong-answers/batch/delete"))
        .bearer_auth(&token)
        .json(&json!({ "record_ids": ids }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let result: Value = response.json().await.unwrap();
    assert_eq!(result["operation"], "delete");
    assert_eq!(result["success_count"], 3);
    assert_eq!(result["total_count"], 5);
}

#[tokio::test]
async fn batch_status_validation_fails_upfront() {
    let app = spawn_app().await;
    let token = TestApp::token(5, "user");
    let record = app.record_ok(5, wrong_answer(1, "custom", "easy")).await;

    for body in [
        json!({ "record_ids": [record["id"]], "status": "unreveiwed" }),
        json!({ "record_ids": [], "status": "mastered" }),
    ] {
        let response = app
            .client
            .put(app.url("/wrong-answers/batch/update-status"))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 400);
    }

    let result: Value = app
        .client
        .put(app.url("/wrong-answers/batch/update-status"))
        .bearer_auth(&token)
        .json(&json!({ "record_ids": [record["id"]], "status": "unreviewed" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(result["success_count"], 1);
}

#[tokio::test]
async fn batch_tags_add_and_remove() {
    let app = spawn_app().await;
    let token = TestApp::token(8, "user");
    let record = app.record_ok(8, wrong_answer(1, "custom", "easy")).await;
    let id = record["id"].clone();

    for (path, tags) in [
        ("/wrong-answers/batch/add-tags", json!(["graphs", "bfs", "graphs"])),
        ("/wrong-answers/batch/remove-tags", json!(["bfs"])),
    ] {
        let response = app
            .client
            .post(app.url(path))
            .bearer_auth(&token)
            .json(&json!({ "record_ids": [id], "tags": tags }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
    }

    let current: Value = app
        .client
        .get(app.url(&format!("/wrong-answers/{}", id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(current["user_tags"], json!(["graphs"]));
}

#[tokio::test]
async fn scheduler_config_requires_admin_and_ignores_bad_values() {
    let app = spawn_app().await;

    let response = app
        .client
        .put(app.url("/scheduler/config"))
        .bearer_auth(TestApp::token(1, "user"))
        .json(&json!({ "strategy": "fsrs" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    let effective: Value = app
        .client
        .put(app.url("/scheduler/config"))
        .bearer_auth(TestApp::token(1, "admin"))
        .json(&json!({ "strategy": "FSRS", "fsrs_alpha": 7.5 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(effective, json!({ "strategy": "fsrs", "fsrs_alpha": 1.0 }));

    let current: Value = app
        .client
        .get(app.url("/scheduler/config"))
        .bearer_auth(TestApp::token(2, "user"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(current["strategy"], "fsrs");
}

#[tokio::test]
async fn review_plan_and_analysis_endpoints() {
    let app = spawn_app().await;
    let token = TestApp::token(4, "user");
    let first = app.record_ok(4, wrong_answer(1, "question_bank", "hard")).await;
    let second = app.record_ok(4, wrong_answer(2, "question_bank", "easy")).await;

    let overview: Value = app
        .client
        .get(app.url("/wrong-answers/review-plan?hours_per_day=1"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(overview["summary"]["total"], 2);
    // One of two records scores past the overdue mark: 30 * 1.5.
    assert_eq!(overview["recommended_daily_count"], 45);
    // Hard question scores higher and comes first.
    assert_eq!(overview["queue"][0]["id"], first["id"]);

    let rescheduled: Value = app
        .client
        .post(app.url("/wrong-answers/review-plan"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(rescheduled["rescheduled"], 2);

    let report: Value = app
        .client
        .post(app.url("/wrong-answers/analysis/batch"))
        .bearer_auth(&token)
        .json(&json!({ "record_ids": [first["id"], second["id"], 9_999] }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(report["total_count"], 2);
    assert_eq!(report["success_count"], 2);

    let analysis: Value = app
        .client
        .get(app.url(&format!("/wrong-answers/{}/analysis", first["id"])))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(analysis["status"], "success");
    assert_eq!(analysis["plan"]["priority"], "HIGH");

    let response = app
        .client
        .get(app.url("/wrong-answers/analytics?days=0"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}
