#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use uuid::Uuid;

use wakaa::auth::{AuthService, ClientInfo, RegisterInput};
use wakaa::database::MemoryStore;
use wakaa::handlers::{router, AppState};

/// One API server over a fresh in-memory store, bound to a free port
pub struct TestApp {
    pub port: u16,
    pub base_url: String,
    pub http: reqwest::Client,
    pub store: Arc<MemoryStore>,
}

/// Authenticated caller created through `/next_api/auth/register`
#[derive(Debug, Clone)]
pub struct TestUser {
    pub email: String,
    pub token: String,
    pub user_id: i64,
    pub merchant_id: Option<i64>,
}

impl TestApp {
    pub async fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("failed to bind {}", base_url))?;
        let store = Arc::new(MemoryStore::new());
        let app = router(AppState::new(store.clone()));
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self { port, base_url, http: reqwest::Client::new(), store })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and return the status with the decoded body
    pub async fn call(&self, method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let mut req = self.http.request(method, self.url(path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let res = req.send().await?;
        let status = res.status();
        let text = res.text().await?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok((status, body))
    }

    pub async fn get(&self, path: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.call(Method::GET, path, Some(token), None).await
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.call(Method::POST, path, Some(token), Some(body)).await
    }

    pub async fn put(&self, path: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.call(Method::PUT, path, Some(token), Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.call(Method::DELETE, path, Some(token), None).await
    }

    pub async fn register(&self, body: Value) -> Result<(StatusCode, Value)> {
        self.call(Method::POST, "/next_api/auth/register", None, Some(body)).await
    }

    pub async fn register_merchant(&self, business_name: &str) -> Result<TestUser> {
        let email = unique_email("merchant");
        let (status, body) = self
            .register(json!({
                "email": email,
                "password": "motdepasse123",
                "full_name": business_name,
                "business_name": business_name,
                "phone": unique_phone(),
            }))
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "register failed: {} {}", status, body);
        Ok(user_from(email, &body["data"]))
    }

    /// Admins cannot self-register; seed one straight through the auth service
    pub async fn register_admin(&self) -> Result<TestUser> {
        let email = unique_email("admin");
        let input: RegisterInput = serde_json::from_value(json!({
            "email": email,
            "password": "motdepasse123",
            "full_name": "Admin Wakaa",
            "role": "admin",
        }))?;
        let payload = AuthService::new(self.store.clone())
            .register(input, &ClientInfo::default())
            .await?;
        Ok(TestUser { email, token: payload.token, user_id: payload.user.id, merchant_id: None })
    }

    pub async fn create_customer(&self, user: &TestUser, name: &str, phone: &str) -> Result<Value> {
        let (status, body) = self
            .post(
                "/next_api/customers",
                &user.token,
                json!({ "merchant_id": user.merchant_id, "name": name, "phone": phone }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "customer create failed: {} {}", status, body);
        Ok(body["data"].clone())
    }
}

fn user_from(email: String, data: &Value) -> TestUser {
    TestUser {
        email,
        token: data["token"].as_str().unwrap_or_default().to_string(),
        user_id: data["user"]["id"].as_i64().unwrap_or_default(),
        merchant_id: data["merchant"]["id"].as_i64(),
    }
}

pub fn unique_email(prefix: &str) -> String {
    format!("{}-{}@wakaa.test", prefix, &Uuid::new_v4().simple().to_string()[..10])
}

/// Senegalese mobile number, unique enough per test run
pub fn unique_phone() -> String {
    let digits: String = Uuid::new_v4()
        .as_u128()
        .to_string()
        .chars()
        .take(7)
        .collect();
    format!("+22177{}", digits)
}
