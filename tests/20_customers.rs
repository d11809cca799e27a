mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use common::TestApp;

#[tokio::test]
async fn resources_require_a_session() -> Result<()> {
    let app = TestApp::spawn().await?;

    let (status, body) = app.call(reqwest::Method::GET, "/next_api/customers", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "NO_TOKEN");

    // Plans are browsable before signing up
    let (status, body) = app.call(reqwest::Method::GET, "/next_api/subscription_plans", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].is_array());
    Ok(())
}

#[tokio::test]
async fn customer_lifecycle() -> Result<()> {
    let app = TestApp::spawn().await?;
    let merchant = app.register_merchant("Boutique Khady").await?;

    let customer = app.create_customer(&merchant, "Mamadou Fall", "+221 76-555-44-33").await?;
    let id = customer["id"].as_i64().unwrap_or_default();
    assert_eq!(customer["phone"], "+221765554433");
    assert_eq!(customer["is_active"], true);
    assert_eq!(customer["total_orders"], 0);

    let (status, body) = app.get(&format!("/next_api/customers/{}", id), &merchant.token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Mamadou Fall");

    // Same lookup through the query-string form
    let (status, body) = app.get(&format!("/next_api/customers?id={}", id), &merchant.token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], id);

    let (status, body) = app
        .put(&format!("/next_api/customers/{}", id), &merchant.token, json!({ "email": "mamadou@exemple.sn" }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "mamadou@exemple.sn");
    assert_eq!(body["data"]["name"], "Mamadou Fall");

    let (status, body) = app.get("/next_api/customers/999999", &merchant.token).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    let (status, _) = app.get("/next_api/customers/abc", &merchant.token).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn customer_phone_is_unique_per_merchant() -> Result<()> {
    let app = TestApp::spawn().await?;
    let first = app.register_merchant("Epicerie Baye").await?;
    let second = app.register_merchant("Epicerie Sokhna").await?;

    app.create_customer(&first, "Ibrahima", "+221770001122").await?;

    let (status, body) = app
        .post(
            "/next_api/customers",
            &first.token,
            json!({ "merchant_id": first.merchant_id, "name": "Doublon", "phone": "+221 77 000 11 22" }),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    // Another merchant may know the same number
    app.create_customer(&second, "Ibrahima", "+221770001122").await?;
    Ok(())
}

#[tokio::test]
async fn customer_validation_reports_fields() -> Result<()> {
    let app = TestApp::spawn().await?;
    let merchant = app.register_merchant("Tissus Mariama").await?;

    let (status, body) = app
        .post(
            "/next_api/customers",
            &merchant.token,
            json!({ "merchant_id": merchant.merchant_id, "phone": "12", "email": "x" }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["field_errors"]["name"].is_string());
    assert!(body["field_errors"]["phone"].is_string());
    assert!(body["field_errors"]["email"].is_string());

    // Updates only check the fields they carry
    let customer = app.create_customer(&merchant, "Aissatou", "+221781112233").await?;
    let (status, body) = app
        .put(&format!("/next_api/customers/{}", customer["id"]), &merchant.token, json!({ "phone": "abc" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"].get("name").is_none());

    let (status, _) = app
        .put(&format!("/next_api/customers/{}", customer["id"]), &merchant.token, json!({}))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn customers_filter_by_merchant_and_paginate() -> Result<()> {
    let app = TestApp::spawn().await?;
    let first = app.register_merchant("Pâtisserie Coumba").await?;
    let second = app.register_merchant("Pâtisserie Rokhaya").await?;

    for (i, phone) in ["+221770000001", "+221770000002", "+221770000003"].iter().enumerate() {
        app.create_customer(&first, &format!("Client {}", i), phone).await?;
    }
    app.create_customer(&second, "Autre", "+221770000009").await?;

    let merchant_id = first.merchant_id.unwrap_or_default();
    let (status, body) = app
        .get(&format!("/next_api/customers?merchant_id={}", merchant_id), &first.token)
        .await?;
    assert_eq!(status, StatusCode::OK);
    let rows = body["data"].as_array().cloned().unwrap_or_default();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r["merchant_id"] == merchant_id));

    let (_, body) = app
        .get(&format!("/next_api/customers?merchant_id={}&limit=2&offset=2", merchant_id), &first.token)
        .await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));

    let (_, body) = app.get("/next_api/customers?phone=%2B221770000002", &first.token).await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["data"][0]["name"], "Client 1");
    Ok(())
}
