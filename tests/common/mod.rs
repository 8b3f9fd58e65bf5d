//! Test helpers for the web API integration tests.
//!
//! Provides a [`TestApp`] bundling an axum-test server over an in-memory
//! database and a temporary storage directory.

#![allow(dead_code)]

use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestResponse, TestServer};
use serde_json::{json, Value};
use tempfile::TempDir;

use cabinet::db::{Role, UserRepository, UserUpdate};
use cabinet::file::FileStorage;
use cabinet::web::handlers::AppState;
use cabinet::web::middleware::JwtState;
use cabinet::web::router::create_router;
use cabinet::Database;

pub const JWT_SECRET: &str = "test-secret-key-for-testing-only";

/// A running API over throwaway state.
pub struct TestApp {
    pub server: TestServer,
    pub db: Database,
    pub storage_dir: TempDir,
}

impl TestApp {
    /// Create a test app with the default upload limit.
    pub async fn new() -> Self {
        Self::with_max_upload_size(1024 * 1024).await
    }

    /// Create a test app with a per-file upload limit in bytes.
    pub async fn with_max_upload_size(max_upload_size: u64) -> Self {
        let db = Database::open_in_memory()
            .await
            .expect("Failed to create test database");
        let storage_dir = TempDir::new().expect("Failed to create storage directory");
        let storage = FileStorage::new(storage_dir.path()).expect("Failed to create storage");

        let app_state = Arc::new(
            AppState::new(db.clone(), storage, JWT_SECRET, 900)
                .with_max_upload_size(max_upload_size),
        );
        let jwt_state = Arc::new(JwtState::new(JWT_SECRET));

        let router = create_router(app_state, jwt_state, &[]);
        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            db,
            storage_dir,
        }
    }

    /// Register a member and return `(user_id, token)`.
    pub async fn register(&self, username: &str) -> (i64, String) {
        let response = self
            .server
            .post("/api/auth/register")
            .json(&json!({
                "username": username,
                "password": "password123",
            }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);

        let body = response.json::<Value>();
        (
            body["data"]["user"]["id"].as_i64().unwrap(),
            body["data"]["access_token"].as_str().unwrap().to_string(),
        )
    }

    /// Register a user, promote them to administrator, and log in again.
    pub async fn register_admin(&self, username: &str) -> (i64, String) {
        let (id, _) = self.register(username).await;
        UserRepository::new(self.db.pool())
            .update(id, &UserUpdate::new().role(Role::Admin))
            .await
            .expect("Failed to promote user");
        (id, self.login(username, "password123").await)
    }

    /// Log in and return the access token.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .server
            .post("/api/auth/login")
            .json(&json!({ "username": username, "password": password }))
            .await;
        response.assert_status_ok();
        response.json::<Value>()["data"]["access_token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    /// GET with a bearer token.
    pub async fn get(&self, path: &str, token: &str) -> TestResponse {
        self.server
            .get(path)
            .add_header(AUTHORIZATION, format!("Bearer {}", token))
            .await
    }

    /// POST a JSON body with a bearer token.
    pub async fn post_json(&self, path: &str, token: &str, body: Value) -> TestResponse {
        self.server
            .post(path)
            .add_header(AUTHORIZATION, format!("Bearer {}", token))
            .json(&body)
            .await
    }

    /// POST without a body with a bearer token.
    pub async fn post(&self, path: &str, token: &str) -> TestResponse {
        self.server
            .post(path)
            .add_header(AUTHORIZATION, format!("Bearer {}", token))
            .await
    }

    /// Create a folder and return its ID.
    pub async fn create_folder(&self, token: &str, parent: Option<i64>, name: &str) -> i64 {
        let path = match parent {
            Some(id) => format!("/api/create-folder/{}", id),
            None => "/api/create-folder".to_string(),
        };
        let response = self.post_json(&path, token, json!({ "name": name })).await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<Value>()["data"]["id"].as_i64().unwrap()
    }

    /// Upload files as repeated `file` parts.
    pub async fn upload(
        &self,
        path: &str,
        token: &str,
        files: &[(&str, &str)],
    ) -> TestResponse {
        let mut form = MultipartForm::new();
        for (name, content) in files {
            form = form.add_part(
                "file",
                Part::bytes(content.as_bytes().to_vec())
                    .file_name(name.to_string())
                    .mime_type("application/octet-stream"),
            );
        }

        self.server
            .post(path)
            .add_header(AUTHORIZATION, format!("Bearer {}", token))
            .multipart(form)
            .await
    }

    /// Upload files and return the IDs of the created records.
    pub async fn upload_ok(
        &self,
        folder: Option<i64>,
        token: &str,
        files: &[(&str, &str)],
    ) -> Vec<i64> {
        let path = match folder {
            Some(id) => format!("/api/upload-file/{}", id),
            None => "/api/upload-file".to_string(),
        };
        let response = self.upload(&path, token, files).await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<Value>()["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["id"].as_i64().unwrap())
            .collect()
    }

    /// Number of regular files under the storage directory.
    pub fn stored_file_count(&self) -> usize {
        fn walk(dir: &std::path::Path) -> usize {
            std::fs::read_dir(dir)
                .map(|entries| {
                    entries
                        .flatten()
                        .map(|e| {
                            let path = e.path();
                            if path.is_dir() {
                                walk(&path)
                            } else {
                                1
                            }
                        })
                        .sum()
                })
                .unwrap_or(0)
        }
        walk(self.storage_dir.path())
    }
}

/// Names of the entries in a JSON array of folders or files.
pub fn names(items: &Value) -> Vec<String> {
    items
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["name"].as_str().unwrap().to_string())
        .collect()
}
