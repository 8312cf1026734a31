//! E2E tests for image ingestion and text analysis

mod common;

use common::TestServer;
use serde_json::{Value, json};

// "hello" as a PNG data URL; the fake detector ignores the bytes
const IMAGE: &str = "data:image/png;base64,aGVsbG8=";

#[tokio::test]
async fn test_ocr_extracts_vocabulary() {
    let server = TestServer::new().await;
    let token = server.token_for("alice", "Alice");

    let response = server
        .post("/api/ocr", Some(&token), json!({ "image": IMAGE }))
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();

    assert_eq!(body["fullText"], "The apples fall from trees, running!");
    assert_eq!(
        body["words"],
        json!([
            { "text": "apple", "original": "apples", "confidence": 1.0, "meaning": "사과" },
            { "text": "tree", "original": "trees", "confidence": 0.8, "meaning": "나무" },
            { "text": "run", "original": "running", "confidence": 1.0, "meaning": "run" },
        ])
    );
}

#[tokio::test]
async fn test_ocr_default_dictionary_drops_non_words() {
    let server = TestServer::with_builtin_dictionary().await;
    let token = server.token_for("alice", "Alice");

    let response = server
        .post("/api/ocr", Some(&token), json!({ "image": IMAGE }))
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();

    let originals: Vec<&str> = body["words"]
        .as_array()
        .unwrap()
        .iter()
        .map(|w| w["original"].as_str().unwrap())
        .collect();
    assert_eq!(originals, vec!["apples", "trees", "running"]);
    assert_eq!(body["words"][0]["text"], "apple");
    assert_eq!(body["words"][2]["text"], "run");
}

#[tokio::test]
async fn test_ocr_accepts_bare_base64() {
    let server = TestServer::new().await;
    let token = server.token_for("alice", "Alice");

    let response = server
        .post("/api/ocr", Some(&token), json!({ "image": "aGk=" }))
        .await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_ocr_rejects_bad_input() {
    let server = TestServer::new().await;
    let token = server.token_for("alice", "Alice");

    let response = server.post("/api/ocr", Some(&token), json!({})).await;
    assert_eq!(response.status(), 400);

    let response = server
        .post("/api/ocr", Some(&token), json!({ "image": "   " }))
        .await;
    assert_eq!(response.status(), 400);

    let response = server
        .post("/api/ocr", Some(&token), json!({ "image": "not*base64!" }))
        .await;
    assert_eq!(response.status(), 400);

    let response = server.post("/api/ocr", None, json!({ "image": IMAGE })).await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_ocr_unconfigured() {
    let server = TestServer::without_integrations().await;
    let token = server.token_for("alice", "Alice");

    let response = server
        .post("/api/ocr", Some(&token), json!({ "image": IMAGE }))
        .await;
    assert_eq!(response.status(), 503);
}

#[tokio::test]
async fn test_analysis_dedupes_terms() {
    let server = TestServer::new().await;
    let token = server.token_for("alice", "Alice");

    let response = server
        .post(
            "/api/gemini-analysis",
            Some(&token),
            json!({ "text": "Apple apple tree" }),
        )
        .await;
    assert_eq!(response.status(), 200);
    let terms: Value = response.json().await.unwrap();
    let terms = terms.as_array().unwrap();

    assert_eq!(terms.len(), 2);
    assert_eq!(terms[0]["original"], "apple");
    assert_eq!(terms[0]["meaning"], "뜻:apple");
    assert_eq!(terms[0]["partOfSpeech"], "n");
    assert_eq!(terms[1]["text"], "tree");
}

#[tokio::test]
async fn test_analysis_validation_and_unconfigured() {
    let server = TestServer::new().await;
    let token = server.token_for("alice", "Alice");

    let response = server
        .post("/api/gemini-analysis", Some(&token), json!({ "text": " " }))
        .await;
    assert_eq!(response.status(), 400);

    let bare = TestServer::without_integrations().await;
    let token = bare.token_for("alice", "Alice");
    let response = bare
        .post("/api/gemini-analysis", Some(&token), json!({ "text": "apple" }))
        .await;
    assert_eq!(response.status(), 503);
}
