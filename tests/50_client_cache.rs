mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

use common::{unique_email, TestApp};
use wakaa::client::{ApiClient, ClientError, ResponseCache};

/// Counts GETs so cache hits are observable
#[derive(Clone, Default)]
struct Hits(Arc<AtomicUsize>);

impl Hits {
    fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

async fn spawn_stub() -> Result<(String, Hits)> {
    let hits = Hits::default();
    let app = Router::new()
        .route(
            "/next_api/customers",
            get(|State(hits): State<Hits>| async move {
                hits.0.fetch_add(1, Ordering::SeqCst);
                Json(json!({ "success": true, "data": [] }))
            })
            .post(|Json(body): Json<Value>| async move { Json(json!({ "success": true, "data": body })) }),
        )
        .route(
            "/next_api/customers/:id",
            get(|State(hits): State<Hits>, Path(id): Path<i64>| async move {
                hits.0.fetch_add(1, Ordering::SeqCst);
                Json(json!({ "success": true, "data": { "id": id } }))
            })
            .put(|Path(id): Path<i64>| async move { Json(json!({ "success": true, "data": { "id": id } })) }),
        )
        .route(
            "/next_api/products",
            get(|State(hits): State<Hits>| async move {
                hits.0.fetch_add(1, Ordering::SeqCst);
                Json(json!({ "success": true, "data": [] }))
            }),
        )
        .with_state(hits.clone());

    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://127.0.0.1:{}", port), hits))
}

#[tokio::test]
async fn repeated_reads_are_served_from_cache() -> Result<()> {
    let (url, hits) = spawn_stub().await?;
    let client = ApiClient::new(&url)?;

    client.list("customers", &[]).await?;
    client.list("customers", &[]).await?;
    client.get("customers", 7).await?;
    client.get("customers", 7).await?;
    assert_eq!(hits.count(), 2);

    // Different query strings are different entries
    client.list("customers", &[("limit".into(), "5".into())]).await?;
    assert_eq!(hits.count(), 3);
    Ok(())
}

#[tokio::test]
async fn writes_invalidate_only_their_resource() -> Result<()> {
    let (url, hits) = spawn_stub().await?;
    let client = ApiClient::new(&url)?;

    client.list("customers", &[]).await?;
    client.get("customers", 7).await?;
    client.list("products", &[]).await?;
    assert_eq!(hits.count(), 3);

    client.update("customers", 7, &json!({ "name": "Awa" })).await?;

    client.list("products", &[]).await?;
    assert_eq!(hits.count(), 3);
    client.list("customers", &[]).await?;
    client.get("customers", 7).await?;
    assert_eq!(hits.count(), 5);

    client.create("customers", &json!({ "name": "Fatou" })).await?;
    client.list("customers", &[]).await?;
    assert_eq!(hits.count(), 6);
    Ok(())
}

#[tokio::test]
async fn entries_expire_after_ttl() -> Result<()> {
    let (url, hits) = spawn_stub().await?;
    let client = ApiClient::new(&url)?.with_cache(ResponseCache::new(Duration::from_millis(200)));

    client.list("customers", &[]).await?;
    client.list("customers", &[]).await?;
    assert_eq!(hits.count(), 1);

    tokio::time::sleep(Duration::from_millis(400)).await;
    client.list("customers", &[]).await?;
    assert_eq!(hits.count(), 2);
    Ok(())
}

#[tokio::test]
async fn client_drives_the_real_api() -> Result<()> {
    let app = TestApp::spawn().await?;
    let mut client = ApiClient::new(&app.base_url)?;

    assert!(matches!(client.me().await, Err(ClientError::NotAuthenticated)));

    let email = unique_email("client");
    let registered = client
        .register(&json!({
            "email": email,
            "password": "motdepasse123",
            "full_name": "Marème Ba",
            "business_name": "Jus Marème",
        }))
        .await?;
    assert!(client.token().is_some());
    let merchant_id = registered["merchant"]["id"].clone();

    let me = client.me().await?;
    assert_eq!(me["user"]["email"], email.as_str());

    client
        .create("customers", &json!({ "merchant_id": merchant_id, "name": "Lat", "phone": "+221770101010" }))
        .await?;
    let first = client.list("customers", &[]).await?;
    assert_eq!(first.as_array().map(Vec::len), Some(1));

    // A write made behind the client's back stays invisible until the entry goes
    let token = client.token().unwrap_or_default().to_string();
    app.post(
        "/next_api/customers",
        &token,
        json!({ "merchant_id": merchant_id, "name": "Ndiaga", "phone": "+221770202020" }),
    )
    .await?;
    let cached = client.list("customers", &[]).await?;
    assert_eq!(cached.as_array().map(Vec::len), Some(1));

    client
        .create("customers", &json!({ "merchant_id": merchant_id, "name": "Sokhna", "phone": "+221770303030" }))
        .await?;
    let fresh = client.list("customers", &[]).await?;
    assert_eq!(fresh.as_array().map(Vec::len), Some(3));

    let err = client.get("customers", 999_999).await.unwrap_err();
    assert_eq!(err.status(), Some(404));

    let err = client
        .create("customers", &json!({ "merchant_id": merchant_id, "name": "Doublon", "phone": "+221770303030" }))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(409));
    assert_eq!(err.code(), Some("CONFLICT"));

    let health = client.health().await?;
    assert_eq!(health["status"], "ok");

    client.logout().await?;
    assert!(client.token().is_none());
    assert!(matches!(client.me().await, Err(ClientError::NotAuthenticated)));
    Ok(())
}
