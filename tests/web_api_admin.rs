//! Web API Admin Tests
//!
//! Integration tests for the administrator dashboard endpoint.

mod common;

use axum::http::StatusCode;
use common::{names, TestApp};
use serde_json::Value;

#[tokio::test]
async fn test_admin_users_requires_admin() {
    let app = TestApp::new().await;
    let (_, member) = app.register("alice").await;

    let response = app.get("/api/admin/users", &member).await;
    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_users_lists_members_with_counts() {
    let app = TestApp::new().await;
    let (_, alice) = app.register("alice").await;
    app.register("bob").await;
    let (_, admin) = app.register_admin("root").await;

    let docs = app.create_folder(&alice, None, "Docs").await;
    app.create_folder(&alice, Some(docs), "2024").await;
    app.upload_ok(Some(docs), &alice, &[("a.txt", "a")]).await;

    let response = app.get("/api/admin/users", &admin).await;
    response.assert_status_ok();

    let body: Value = response.json();
    let users = &body["data"];
    assert_eq!(names_of_users(users), vec!["alice", "bob"]);
    assert_eq!(users[0]["folder_count"], 2);
    assert_eq!(users[0]["file_count"], 1);
    assert_eq!(users[1]["folder_count"], 0);
    assert!(users
        .as_array()
        .unwrap()
        .iter()
        .all(|u| u["role"] == "member"));

    // Bob's tree is reachable from the dashboard entry
    let bob_id = users[1]["id"].as_i64().unwrap();
    let body: Value = app
        .get(&format!("/api/files?user_id={}", bob_id), &admin)
        .await
        .json();
    assert_eq!(body["data"]["owner_id"], bob_id);
    assert!(names(&body["data"]["folders"]).is_empty());
}

fn names_of_users(users: &Value) -> Vec<String> {
    users
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap().to_string())
        .collect()
}
