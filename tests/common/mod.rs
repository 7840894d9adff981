//! Common test utilities for E2E tests

#![allow(dead_code)]

use microsocial::{AppState, config};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const TEST_TOKEN_SECRET: &str = "test-secret-key-32-bytes-long!!!";
pub const TEST_PASSWORD: &str = "hunter22";

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

/// A signed-up and logged-in account
pub struct TestUser {
    pub email: String,
    pub username: String,
    pub token: String,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        Self::with_max_upload_bytes(1024 * 1024).await
    }

    /// Create a test server with a custom upload size cap
    pub async fn with_max_upload_bytes(max_upload_bytes: usize) -> Self {
        Self::start(max_upload_bytes, None).await
    }

    /// Create a test server whose posts.json already holds `posts_json`
    pub async fn with_posts_file(posts_json: &str) -> Self {
        Self::start(1024 * 1024, Some(posts_json)).await
    }

    async fn start(max_upload_bytes: usize, posts_json: Option<&str>) -> Self {
        // Create temporary directory for the collections and uploads
        let temp_dir = TempDir::new().unwrap();

        // Create test configuration
        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
            },
            storage: config::StorageConfig {
                data_dir: temp_dir.path().join("data"),
                uploads_dir: temp_dir.path().join("uploads"),
                max_upload_bytes,
            },
            auth: config::AuthConfig {
                token_secret: TEST_TOKEN_SECRET.to_string(),
                token_max_age: 3600,
            },
            feed: config::FeedConfig::default(),
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        if let Some(contents) = posts_json {
            std::fs::create_dir_all(&config.storage.data_dir).unwrap();
            std::fs::write(config.storage.posts_path(), contents).unwrap();
        }

        // Initialize app state
        let state = AppState::new(config).await.unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = microsocial::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Sign up `username` (email `<username>@example.com`) and log in
    pub async fn create_user(&self, username: &str) -> TestUser {
        let email = format!("{}@example.com", username);

        let response = self
            .client
            .post(self.url("/auth/signup"))
            .json(&json!({
                "email": email,
                "username": username,
                "password": TEST_PASSWORD,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201, "signup failed for {}", username);

        let response = self
            .client
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": TEST_PASSWORD }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200, "login failed for {}", username);
        let body: Value = response.json().await.unwrap();

        TestUser {
            email,
            username: username.to_string(),
            token: body["token"].as_str().unwrap().to_string(),
        }
    }

    /// Create a text-only post as `user`
    pub async fn create_post(&self, user: &TestUser, text: &str) -> Value {
        let response = self
            .client
            .post(self.url("/posts"))
            .bearer_auth(&user.token)
            .json(&json!({ "text": text }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);
        response.json().await.unwrap()
    }

    /// Read posts.json straight from disk
    pub async fn stored_posts(&self) -> Vec<microsocial::data::Post> {
        self.state.posts.load().await.unwrap()
    }

    /// Read users.json straight from disk
    pub async fn stored_users(&self) -> Vec<microsocial::data::User> {
        self.state.users.load().await.unwrap()
    }
}
