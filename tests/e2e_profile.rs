//! E2E tests for user profiles

mod common;

use common::TestServer;
use serde_json::{Value, json};

#[tokio::test]
async fn test_own_profile_defaults() {
    let server = TestServer::new().await;
    let token = server.token_for("alice", "Alice");

    let profile = server.get_json("/api/user/profile", Some(&token)).await;
    assert_eq!(profile["uid"], "alice");
    assert_eq!(profile["email"], "alice@example.com");
    assert_eq!(profile["bio"], "");
    assert_eq!(profile["photoURL"], "");
}

#[tokio::test]
async fn test_update_merges_fields() {
    let server = TestServer::new().await;
    let token = server.token_for("alice", "Alice");

    let response = server
        .put(
            "/api/user/profile",
            &token,
            json!({ "username": "ally", "bio": "Learning every day" }),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Profile updated");

    let profile = server.get_json("/api/user/profile", Some(&token)).await;
    assert_eq!(profile["name"], "Alice");
    assert_eq!(profile["username"], "ally");
    assert_eq!(profile["bio"], "Learning every day");
}

#[tokio::test]
async fn test_rename_updates_author_stamps() {
    let server = TestServer::new().await;
    let token = server.token_for("alice", "Alice");

    let response = server
        .post(
            "/api/community/discussions",
            Some(&token),
            json!({ "title": "Hi", "content": "Hello", "category": "general" }),
        )
        .await;
    let post: Value = response.json().await.unwrap();
    let post_id = post["id"].as_str().unwrap().to_string();
    server
        .post(
            &format!("/api/community/discussions/{post_id}/comments"),
            Some(&token),
            json!({ "content": "self reply" }),
        )
        .await;

    server
        .put("/api/user/profile", &token, json!({ "name": "Alicia" }))
        .await;

    let post = server
        .get_json(&format!("/api/community/discussions/{post_id}"), None)
        .await;
    assert_eq!(post["author"]["name"], "Alicia");
    assert_eq!(post["comments"][0]["author"]["name"], "Alicia");

    let profile = server.get_json("/api/user/profile", Some(&token)).await;
    assert_eq!(profile["name"], "Alicia");
}

#[tokio::test]
async fn test_public_profile_lists_published_content() {
    let server = TestServer::new().await;
    let alice = server.token_for("alice", "Alice");
    let bob = server.token_for("bob", "Bob");

    server
        .post(
            "/api/community/discussions",
            Some(&alice),
            json!({ "title": "Hi", "content": "Hello", "category": "general" }),
        )
        .await;
    server
        .post(
            "/api/community/wordbooks",
            Some(&alice),
            json!({ "name": "Shared", "words": [{ "word": "apple", "meaning": "사과" }] }),
        )
        .await;

    let profile = server.get_json("/api/user/alice/profile", Some(&bob)).await;
    assert_eq!(profile["uid"], "alice");
    assert_eq!(profile["name"], "Alice");
    assert_eq!(profile["followers"], 0);
    assert_eq!(profile["following"], 0);
    assert_eq!(profile["discussions"].as_array().unwrap().len(), 1);
    assert_eq!(profile["sharedWordbooks"][0]["name"], "Shared");
    assert_eq!(profile["sharedWordbooks"][0]["wordCount"], 1);
}

#[tokio::test]
async fn test_unknown_public_profile() {
    let server = TestServer::new().await;
    let token = server.token_for("alice", "Alice");

    let response = server.get("/api/user/nobody/profile", Some(&token)).await;
    assert_eq!(response.status(), 404);
}
