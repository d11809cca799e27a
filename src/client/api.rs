use std::time::Duration;

use reqwest::{header, Method, RequestBuilder, Response};
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use super::cache::ResponseCache;
use super::error::ClientError;

const API_PREFIX: &str = "/next_api";

/// Typed client for the Wakaa HTTP API.
///
/// Reads go through a [`ResponseCache`]; writes invalidate the resource's
/// cached entries. The session token is sent as `Authorization: Bearer`.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    token: Option<String>,
    cache: ResponseCache,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base = Url::parse(base_url).map_err(|_| ClientError::InvalidUrl(base_url.to_string()))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("wakaa-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http, base, token: None, cache: ResponseCache::default() })
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    fn url(&self, path_and_query: &str) -> Result<Url, ClientError> {
        self.base
            .join(path_and_query)
            .map_err(|_| ClientError::InvalidUrl(path_and_query.to_string()))
    }

    fn request(&self, method: Method, path_and_query: &str) -> Result<RequestBuilder, ClientError> {
        let url = self.url(path_and_query)?;
        debug!("{} {}", method, url);
        let mut builder = self.http.request(method, url).header(header::ACCEPT, "application/json");
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }

    /// Unwrap the `{ success, data }` envelope
    async fn unwrap_envelope(response: Response) -> Result<Value, ClientError> {
        let status = response.status();
        let text = response.text().await?;
        let body: Option<Value> = serde_json::from_str(&text).ok();

        match body {
            Some(body) if status.is_success() && body["success"] != json!(false) => {
                Ok(body.get("data").cloned().unwrap_or(Value::Null))
            }
            Some(body) => Err(ClientError::Api {
                status: status.as_u16(),
                message: body["error"].as_str().unwrap_or("Erreur inconnue").to_string(),
                code: body["code"].as_str().map(str::to_string),
            }),
            None if status.is_success() => Err(ClientError::InvalidResponse(text)),
            None => Err(ClientError::Api { status: status.as_u16(), message: text, code: None }),
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Value, ClientError> {
        let response = builder.send().await?;
        Self::unwrap_envelope(response).await
    }

    async fn cached_get(&self, path_and_query: String) -> Result<Value, ClientError> {
        if let Some(hit) = self.cache.get(&path_and_query).await {
            return Ok(hit);
        }
        let value = self.send(self.request(Method::GET, &path_and_query)?).await?;
        self.cache.insert(path_and_query, value.clone()).await;
        Ok(value)
    }

    fn resource_path(resource: &str) -> String {
        format!("{}/{}", API_PREFIX, resource)
    }

    fn remember_token(&mut self, data: &Value) {
        if let Some(token) = data["token"].as_str() {
            self.token = Some(token.to_string());
        }
    }

    // Authentication

    pub async fn register(&mut self, body: &Value) -> Result<Value, ClientError> {
        let builder = self.request(Method::POST, &format!("{}/auth/register", API_PREFIX))?.json(body);
        let data = self.send(builder).await?;
        self.remember_token(&data);
        self.cache.clear().await;
        Ok(data)
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<Value, ClientError> {
        let builder = self
            .request(Method::POST, &format!("{}/auth/login", API_PREFIX))?
            .json(&json!({ "email": email, "password": password }));
        let data = self.send(builder).await?;
        self.remember_token(&data);
        self.cache.clear().await;
        Ok(data)
    }

    pub async fn me(&self) -> Result<Value, ClientError> {
        if self.token.is_none() {
            return Err(ClientError::NotAuthenticated);
        }
        self.send(self.request(Method::GET, &format!("{}/auth/me", API_PREFIX))?).await
    }

    /// Ends the server session, forgets the token and empties the cache
    pub async fn logout(&mut self) -> Result<(), ClientError> {
        let result = self
            .send(self.request(Method::POST, &format!("{}/auth/logout", API_PREFIX))?)
            .await;
        self.token = None;
        self.cache.clear().await;
        result.map(|_| ())
    }

    // Resources

    pub async fn list(&self, resource: &str, query: &[(String, String)]) -> Result<Value, ClientError> {
        let mut path = Self::resource_path(resource);
        if !query.is_empty() {
            let encoded = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                .finish();
            path = format!("{}?{}", path, encoded);
        }
        self.cached_get(path).await
    }

    pub async fn get(&self, resource: &str, id: i64) -> Result<Value, ClientError> {
        self.cached_get(format!("{}/{}", Self::resource_path(resource), id)).await
    }

    pub async fn create(&self, resource: &str, body: &Value) -> Result<Value, ClientError> {
        let path = Self::resource_path(resource);
        let result = self.send(self.request(Method::POST, &path)?.json(body)).await;
        self.cache.invalidate_prefix(&path);
        result
    }

    pub async fn update(&self, resource: &str, id: i64, body: &Value) -> Result<Value, ClientError> {
        let path = Self::resource_path(resource);
        let result = self
            .send(self.request(Method::PUT, &format!("{}/{}", path, id))?.json(body))
            .await;
        self.cache.invalidate_prefix(&path);
        result
    }

    pub async fn delete(&self, resource: &str, id: i64) -> Result<Value, ClientError> {
        let path = Self::resource_path(resource);
        let result = self.send(self.request(Method::DELETE, &format!("{}/{}", path, id))?).await;
        self.cache.invalidate_prefix(&path);
        result
    }

    /// Service description served at `/`
    pub async fn info(&self) -> Result<Value, ClientError> {
        self.send(self.request(Method::GET, "/")?).await
    }

    /// `GET /health`, returning the health body even when degraded
    pub async fn health(&self) -> Result<Value, ClientError> {
        let response = self.request(Method::GET, "/health")?.send().await?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
        if status.is_success() {
            Ok(body.get("data").cloned().unwrap_or(Value::Null))
        } else {
            Err(ClientError::Api {
                status: status.as_u16(),
                message: body["error"].as_str().unwrap_or("Service indisponible").to_string(),
                code: body["code"].as_str().map(str::to_string),
            })
        }
    }
}
