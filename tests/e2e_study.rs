//! E2E tests for study sessions and learning statistics

mod common;

use common::TestServer;
use serde_json::{Value, json};

fn session_body(wordbook_id: &str, correct: &[&str], incorrect: &[&str]) -> Value {
    json!({
        "wordbookId": wordbook_id,
        "wordbookName": "Daily",
        "mode": "flashcard",
        "score": 80.0,
        "duration": 150,
        "correctWords": correct,
        "incorrectWords": incorrect,
    })
}

#[tokio::test]
async fn test_record_and_fetch_session() {
    let server = TestServer::new().await;
    let token = server.token_for("alice", "Alice");
    let wordbook = server.create_wordbook(&token, "Daily").await;
    let apple = server.add_word(&token, &wordbook, "apple").await;
    let tree = server.add_word(&token, &wordbook, "tree").await;
    let book = server.add_word(&token, &wordbook, "book").await;

    let response = server
        .post(
            "/api/study-sessions",
            Some(&token),
            session_body(&wordbook, &[&apple, &tree], &[&book]),
        )
        .await;
    assert_eq!(response.status(), 201);
    let session: Value = response.json().await.unwrap();
    assert_eq!(session["userId"], "alice");
    assert_eq!(session["correctWords"], json!([apple, tree]));
    let session_id = session["id"].as_str().unwrap().to_string();

    // A deleted word drops out of the resolved session
    server
        .delete(&format!("/api/wordbooks/{wordbook}/words/{tree}"), &token)
        .await;

    let detail = server
        .get_json(&format!("/api/study-sessions/{session_id}"), Some(&token))
        .await;
    assert_eq!(detail["correctWords"].as_array().unwrap().len(), 1);
    assert_eq!(detail["correctWords"][0]["word"], "apple");
    assert_eq!(detail["incorrectWords"][0]["word"], "book");
    assert_eq!(detail["score"], 80.0);
}

#[tokio::test]
async fn test_sessions_are_private() {
    let server = TestServer::new().await;
    let alice = server.token_for("alice", "Alice");
    let bob = server.token_for("bob", "Bob");
    let wordbook = server.create_wordbook(&alice, "Daily").await;

    let session: Value = server
        .post(
            "/api/study-sessions",
            Some(&alice),
            session_body(&wordbook, &[], &[]),
        )
        .await
        .json()
        .await
        .unwrap();
    let session_id = session["id"].as_str().unwrap();

    let response = server
        .get(&format!("/api/study-sessions/{session_id}"), Some(&bob))
        .await;
    assert_eq!(response.status(), 404);

    let listed = server.get_json("/api/study-sessions", Some(&bob)).await;
    assert_eq!(listed, json!([]));

    // Bob cannot record against Alice's wordbook
    let response = server
        .post(
            "/api/study-sessions",
            Some(&bob),
            session_body(&wordbook, &[], &[]),
        )
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_session_validation() {
    let server = TestServer::new().await;
    let token = server.token_for("alice", "Alice");
    let wordbook = server.create_wordbook(&token, "Daily").await;

    let mut zero_duration = session_body(&wordbook, &[], &[]);
    zero_duration["duration"] = json!(0);
    let response = server
        .post("/api/study-sessions", Some(&token), zero_duration)
        .await;
    assert_eq!(response.status(), 400);

    let mut no_mode = session_body(&wordbook, &[], &[]);
    no_mode.as_object_mut().unwrap().remove("mode");
    let response = server.post("/api/study-sessions", Some(&token), no_mode).await;
    assert_eq!(response.status(), 400);

    let mut no_score = session_body(&wordbook, &[], &[]);
    no_score.as_object_mut().unwrap().remove("score");
    let response = server
        .post("/api/study-sessions", Some(&token), no_score)
        .await;
    assert_eq!(response.status(), 400);

    let mut text_duration = session_body(&wordbook, &[], &[]);
    text_duration["duration"] = json!("90");
    let response = server
        .post("/api/study-sessions", Some(&token), text_duration)
        .await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("duration"));
}

#[tokio::test]
async fn test_list_newest_first() {
    let server = TestServer::new().await;
    let token = server.token_for("alice", "Alice");
    let first = server.create_wordbook(&token, "First").await;
    let second = server.create_wordbook(&token, "Second").await;

    server
        .post("/api/study-sessions", Some(&token), session_body(&first, &[], &[]))
        .await;
    server
        .post("/api/study-sessions", Some(&token), session_body(&second, &[], &[]))
        .await;

    let listed = server.get_json("/api/study-sessions", Some(&token)).await;
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["wordbookId"], second.as_str());
    assert_eq!(listed[1]["wordbookId"], first.as_str());
}

#[tokio::test]
async fn test_learning_stats_for_today() {
    let server = TestServer::new().await;
    let token = server.token_for("alice", "Alice");
    let wordbook = server.create_wordbook(&token, "Daily").await;

    let empty = server.get_json("/api/learning-stats", Some(&token)).await;
    assert_eq!(empty["wordsLearned"], 0);
    assert_eq!(empty["streak"], 0);
    assert_eq!(empty["weeklyData"].as_array().unwrap().len(), 7);

    server
        .post(
            "/api/study-sessions",
            Some(&token),
            session_body(&wordbook, &["a", "b"], &["c"]),
        )
        .await;

    let stats = server.get_json("/api/learning-stats", Some(&token)).await;
    assert_eq!(stats["wordsLearned"], 3);
    assert_eq!(stats["studyTime"], 3);
    assert_eq!(stats["streak"], 1);

    let weekly = stats["weeklyData"].as_array().unwrap();
    assert_eq!(weekly.len(), 7);
    assert_eq!(weekly[6]["words"], 3);
    assert_eq!(weekly[6]["time"], 3);
    assert_eq!(weekly[0]["words"], 0);
}

#[tokio::test]
async fn test_stats_require_auth() {
    let server = TestServer::new().await;
    let response = server.get("/api/learning-stats", None).await;
    assert_eq!(response.status(), 401);
}
