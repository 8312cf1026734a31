//! E2E tests for discussions, comments and community wordbooks

mod common;

use common::TestServer;
use serde_json::{Value, json};

async fn create_discussion(server: &TestServer, token: &str, title: &str) -> String {
    let response = server
        .post(
            "/api/community/discussions",
            Some(token),
            json!({ "title": title, "content": "Body", "category": "tips" }),
        )
        .await;
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_create_discussion_stamps_author() {
    let server = TestServer::new().await;
    let token = server.token_for("alice", "Alice");

    let response = server
        .post(
            "/api/community/discussions",
            Some(&token),
            json!({ "title": "Hello", "content": "First post", "category": "general" }),
        )
        .await;

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["author"]["uid"], "alice");
    assert_eq!(body["author"]["name"], "Alice");
    assert_eq!(body["likes"], 0);
    assert_eq!(body["commentCount"], 0);
    assert_eq!(body["views"], 0);
}

#[tokio::test]
async fn test_create_discussion_requires_fields_and_auth() {
    let server = TestServer::new().await;
    let token = server.token_for("alice", "Alice");

    let response = server
        .post(
            "/api/community/discussions",
            Some(&token),
            json!({ "title": "No body", "category": "general" }),
        )
        .await;
    assert_eq!(response.status(), 400);

    let response = server
        .post(
            "/api/community/discussions",
            None,
            json!({ "title": "t", "content": "c", "category": "general" }),
        )
        .await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_malformed_bodies_are_validation_errors() {
    let server = TestServer::new().await;
    let token = server.token_for("alice", "Alice");

    let response = server
        .post(
            "/api/community/discussions",
            Some(&token),
            json!({ "title": 5, "content": "c", "category": "general" }),
        )
        .await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("title"));

    let response = server
        .client
        .post(server.url("/api/community/discussions"))
        .bearer_auth(&token)
        .header("content-type", "application/json")
        .body("{\"title\": ")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let response = server
        .client
        .post(server.url("/api/community/discussions"))
        .bearer_auth(&token)
        .body(r#"{"title": "t", "content": "c", "category": "general"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_view_counts_and_includes_comments() {
    let server = TestServer::new().await;
    let token = server.token_for("alice", "Alice");
    let id = create_discussion(&server, &token, "Post").await;

    let path = format!("/api/community/discussions/{id}");
    server.get_json(&path, None).await;
    let post = server.get_json(&path, None).await;

    assert_eq!(post["views"], 2);
    assert_eq!(post["comments"], json!([]));

    let response = server.get("/api/community/discussions/missing", None).await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_only_author_can_edit_or_delete() {
    let server = TestServer::new().await;
    let alice = server.token_for("alice", "Alice");
    let bob = server.token_for("bob", "Bob");
    let id = create_discussion(&server, &alice, "Post").await;
    let path = format!("/api/community/discussions/{id}");
    let edit = json!({ "title": "Edited", "content": "New body", "category": "tips" });

    let response = server.put(&path, &bob, edit.clone()).await;
    assert_eq!(response.status(), 403);
    let response = server.delete(&path, &bob).await;
    assert_eq!(response.status(), 403);

    let response = server.put(&path, &alice, edit).await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["title"], "Edited");

    let response = server.delete(&path, &alice).await;
    assert_eq!(response.status(), 204);
    let response = server.get(&path, None).await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_like_toggles() {
    let server = TestServer::new().await;
    let alice = server.token_for("alice", "Alice");
    let bob = server.token_for("bob", "Bob");
    let id = create_discussion(&server, &alice, "Post").await;
    let path = format!("/api/community/discussions/{id}/like");

    let first: Value = server
        .post(&path, Some(&bob), json!({}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(first["likes"], 1);
    assert_eq!(first["likedBy"], json!(["bob"]));

    let second: Value = server
        .post(&path, Some(&bob), json!({}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(second["likes"], 0);
    assert_eq!(second["likedBy"], json!([]));

    let response = server
        .post("/api/community/discussions/missing/like", Some(&bob), json!({}))
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_sorting_and_hot_filter() {
    let server = TestServer::new().await;
    let tokens: Vec<String> = ["a", "b", "c"]
        .iter()
        .map(|uid| server.token_for(uid, uid))
        .collect();
    let quiet = create_discussion(&server, &tokens[0], "Quiet").await;
    let popular = create_discussion(&server, &tokens[0], "Popular").await;
    let _newest = create_discussion(&server, &tokens[0], "Newest").await;

    for token in &tokens {
        server
            .post(
                &format!("/api/community/discussions/{popular}/like"),
                Some(token),
                json!({}),
            )
            .await;
    }
    server
        .post(
            &format!("/api/community/discussions/{quiet}/like"),
            Some(&tokens[1]),
            json!({}),
        )
        .await;

    let by_date = server.get_json("/api/community/discussions", None).await;
    assert_eq!(by_date[0]["title"], "Newest");

    let by_likes = server
        .get_json("/api/community/discussions?sortBy=likes", None)
        .await;
    assert_eq!(by_likes[0]["title"], "Popular");
    assert_eq!(by_likes[1]["title"], "Quiet");

    let hot = server
        .get_json("/api/community/discussions?sortBy=hot", None)
        .await;
    assert_eq!(hot.as_array().unwrap().len(), 1);
    assert_eq!(hot[0]["title"], "Popular");

    let other = server
        .get_json("/api/community/discussions?category=other", None)
        .await;
    assert_eq!(other, json!([]));
    let all = server
        .get_json("/api/community/discussions?category=all", None)
        .await;
    assert_eq!(all.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_comments_update_counter() {
    let server = TestServer::new().await;
    let alice = server.token_for("alice", "Alice");
    let bob = server.token_for("bob", "Bob");
    let id = create_discussion(&server, &alice, "Post").await;
    let comments = format!("/api/community/discussions/{id}/comments");

    let response = server
        .post(&comments, Some(&bob), json!({ "content": "First!" }))
        .await;
    assert_eq!(response.status(), 201);
    let comment: Value = response.json().await.unwrap();
    let comment_id = comment["id"].as_str().unwrap().to_string();
    server
        .post(&comments, Some(&alice), json!({ "content": "Thanks" }))
        .await;

    let listed = server.get_json(&comments, None).await;
    assert_eq!(listed.as_array().unwrap().len(), 2);
    assert_eq!(listed[0]["content"], "Thanks");

    let post = server
        .get_json(&format!("/api/community/discussions/{id}"), None)
        .await;
    assert_eq!(post["commentCount"], 2);
    assert_eq!(post["comments"][0]["content"], "First!");

    let comment_path = format!("{comments}/{comment_id}");
    let response = server
        .put(&comment_path, &alice, json!({ "content": "hijack" }))
        .await;
    assert_eq!(response.status(), 403);

    let response = server
        .put(&comment_path, &bob, json!({ "content": "First, edited" }))
        .await;
    assert_eq!(response.status(), 200);
    let edited: Value = response.json().await.unwrap();
    assert_eq!(edited["content"], "First, edited");

    let response = server.delete(&comment_path, &bob).await;
    assert_eq!(response.status(), 204);
    let post = server
        .get_json(&format!("/api/community/discussions/{id}"), None)
        .await;
    assert_eq!(post["commentCount"], 1);
}

#[tokio::test]
async fn test_comment_on_missing_post() {
    let server = TestServer::new().await;
    let token = server.token_for("alice", "Alice");

    let response = server
        .post(
            "/api/community/discussions/missing/comments",
            Some(&token),
            json!({ "content": "hello" }),
        )
        .await;
    assert_eq!(response.status(), 404);

    let response = server
        .get("/api/community/discussions/missing/comments", None)
        .await;
    assert_eq!(response.status(), 404);

    let id = create_discussion(&server, &token, "Post").await;
    let response = server
        .post(
            &format!("/api/community/discussions/{id}/comments"),
            Some(&token),
            json!({ "content": " " }),
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_share_like_and_download_wordbook() {
    let server = TestServer::new().await;
    let alice = server.token_for("alice", "Alice");
    let bob = server.token_for("bob", "Bob");

    let wordbook = server.create_wordbook(&alice, "Fruits").await;
    let apple = server.add_word(&alice, &wordbook, "apple").await;
    server
        .put(
            &format!("/api/wordbooks/{wordbook}/words/{apple}"),
            &alice,
            json!({ "mastered": true }),
        )
        .await;

    let response = server
        .post(
            "/api/community/wordbooks",
            Some(&alice),
            json!({ "wordbookId": wordbook, "name": "Fruits", "category": "food" }),
        )
        .await;
    assert_eq!(response.status(), 201);
    let shared: Value = response.json().await.unwrap();
    let shared_id = shared["id"].as_str().unwrap().to_string();
    assert_eq!(shared["wordCount"], 1);
    assert_eq!(shared["author"]["name"], "Alice");

    let listed = server.get_json("/api/community/wordbooks", None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let like: Value = server
        .post(
            &format!("/api/community/wordbooks/{shared_id}/like"),
            Some(&bob),
            json!({}),
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(like, json!({ "newLikes": 1, "isLiked": true }));

    let response = server
        .post(
            &format!("/api/community/wordbooks/{shared_id}/download"),
            Some(&bob),
            json!({}),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    let copy_id = body["newWordbookId"].as_str().unwrap();

    let copy = server
        .get_json(&format!("/api/wordbooks/{copy_id}"), Some(&bob))
        .await;
    assert_eq!(copy["source"], shared_id.as_str());
    assert_eq!(copy["userId"], "bob");
    assert_eq!(copy["wordCount"], 1);
    assert_eq!(copy["progress"], 0);
    assert_eq!(copy["words"][0]["id"], apple.as_str());
    assert_eq!(copy["words"][0]["mastered"], false);

    let shared = server
        .get_json(&format!("/api/community/wordbooks/{shared_id}"), None)
        .await;
    assert_eq!(shared["downloads"], 1);
}

#[tokio::test]
async fn test_share_validation_and_missing() {
    let server = TestServer::new().await;
    let alice = server.token_for("alice", "Alice");
    let bob = server.token_for("bob", "Bob");
    let wordbook = server.create_wordbook(&bob, "Bob's").await;

    let response = server
        .post("/api/community/wordbooks", Some(&alice), json!({ "category": "x" }))
        .await;
    assert_eq!(response.status(), 400);

    let response = server
        .post(
            "/api/community/wordbooks",
            Some(&alice),
            json!({ "wordbookId": wordbook, "name": "Not mine" }),
        )
        .await;
    assert_eq!(response.status(), 404);

    let response = server.get("/api/community/wordbooks/missing", None).await;
    assert_eq!(response.status(), 404);

    let response = server
        .post("/api/community/wordbooks/missing/download", Some(&alice), json!({}))
        .await;
    assert_eq!(response.status(), 404);
}
