mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use common::TestApp;

#[tokio::test]
async fn order_creation_computes_totals_and_items() -> Result<()> {
    let app = TestApp::spawn().await?;
    let merchant = app.register_merchant("Restaurant Teranga").await?;
    let customer = app.create_customer(&merchant, "Ousmane Sow", "+221775550011").await?;

    let (status, body) = app
        .post(
            "/next_api/orders",
            &merchant.token,
            json!({
                "merchant_id": merchant.merchant_id,
                "customer_id": customer["id"],
                "delivery_address": "Médina, Dakar",
                "items": [
                    { "product_name": "Thieboudienne", "quantity": 2, "unit_price": 2500 },
                    { "product_name": "Bissap", "quantity": 3, "unit_price": "500.50" }
                ]
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", body);

    let order = &body["data"];
    assert_eq!(order["total_amount"], 6501.5);
    assert_eq!(order["status"], "pending");
    assert_eq!(order["payment_status"], "pending");
    assert_eq!(order["currency"], "XOF");
    let number = order["order_number"].as_str().unwrap_or_default();
    assert!(number.starts_with("CMD-") && number.len() == 19, "{}", number);

    let items = order["items"].as_array().cloned().unwrap_or_default();
    assert_eq!(items.len(), 2);
    assert!(items.iter().any(|i| i["total_price"] == 1501.5));
    assert!(items.iter().all(|i| i["order_id"] == order["id"]));

    // The customer's counters follow
    let (_, body) = app.get(&format!("/next_api/customers/{}", customer["id"]), &merchant.token).await?;
    assert_eq!(body["data"]["total_orders"], 1);
    assert_eq!(body["data"]["total_spent"], 6501.5);

    // Reads embed the lines
    let (status, body) = app.get(&format!("/next_api/orders/{}", order["id"]), &merchant.token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"].as_array().map(Vec::len), Some(2));

    let (_, body) = app.get(&format!("/next_api/orders?id={}", order["id"]), &merchant.token).await?;
    assert_eq!(body["data"]["order_number"], number);
    Ok(())
}

#[tokio::test]
async fn order_validation() -> Result<()> {
    let app = TestApp::spawn().await?;
    let merchant = app.register_merchant("Fruits Adja").await?;
    let customer = app.create_customer(&merchant, "Binta", "+221775550022").await?;

    let (status, body) = app
        .post(
            "/next_api/orders",
            &merchant.token,
            json!({ "merchant_id": merchant.merchant_id, "customer_id": customer["id"] }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["items"].is_string());

    let (status, body) = app
        .post(
            "/next_api/orders",
            &merchant.token,
            json!({
                "merchant_id": merchant.merchant_id,
                "customer_id": customer["id"],
                "items": [{ "product_name": "Mangue", "quantity": 0, "unit_price": 100 }]
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["items[0].quantity"].is_string());

    let (status, body) = app
        .post(
            "/next_api/orders",
            &merchant.token,
            json!({
                "merchant_id": merchant.merchant_id,
                "customer_id": customer["id"],
                "status": "teleported",
                "items": [{ "product_name": "Mangue", "quantity": 1, "unit_price": 100 }]
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["status"].is_string());

    // Nothing was written by the rejected requests
    let (_, body) = app.get("/next_api/orders", &merchant.token).await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(0));
    Ok(())
}

#[tokio::test]
async fn orders_filter_by_status_and_date() -> Result<()> {
    let app = TestApp::spawn().await?;
    let merchant = app.register_merchant("Librairie Cheikh").await?;
    let customer = app.create_customer(&merchant, "Seynabou", "+221775550033").await?;

    for status in ["pending", "delivered", "delivered"] {
        let (code, body) = app
            .post(
                "/next_api/orders",
                &merchant.token,
                json!({
                    "merchant_id": merchant.merchant_id,
                    "customer_id": customer["id"],
                    "status": status,
                    "items": [{ "product_name": "Cahier", "quantity": 1, "unit_price": 300 }]
                }),
            )
            .await?;
        assert_eq!(code, StatusCode::CREATED, "{}", body);
    }

    let (_, body) = app.get("/next_api/orders?status=delivered", &merchant.token).await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));

    let (_, body) = app.get("/next_api/orders?start_date=2000-01-01&end_date=2999-12-31", &merchant.token).await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(3));

    let (_, body) = app.get("/next_api/orders?end_date=2000-01-01", &merchant.token).await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(0));
    Ok(())
}

#[tokio::test]
async fn completed_payment_marks_order_paid() -> Result<()> {
    let app = TestApp::spawn().await?;
    let merchant = app.register_merchant("Quincaillerie Lamine").await?;
    let customer = app.create_customer(&merchant, "Modou", "+221775550044").await?;

    let (_, body) = app
        .post(
            "/next_api/orders",
            &merchant.token,
            json!({
                "merchant_id": merchant.merchant_id,
                "customer_id": customer["id"],
                "items": [{ "product_name": "Clous", "quantity": 10, "unit_price": 25 }]
            }),
        )
        .await?;
    let order_id = body["data"]["id"].clone();

    let (status, body) = app
        .post(
            "/next_api/payments",
            &merchant.token,
            json!({
                "merchant_id": merchant.merchant_id,
                "order_id": order_id,
                "amount": 250,
                "provider": "wave",
                "status": "completed"
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["currency"], "XOF");
    assert!(body["data"]["paid_at"].is_string());

    let (_, body) = app.get(&format!("/next_api/orders/{}", order_id), &merchant.token).await?;
    assert_eq!(body["data"]["payment_status"], "paid");

    let (status, body) = app
        .post(
            "/next_api/payments",
            &merchant.token,
            json!({ "merchant_id": merchant.merchant_id, "amount": 10, "provider": "paypal" }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["provider"].is_string());
    Ok(())
}

#[tokio::test]
async fn item_total_follows_partial_updates() -> Result<()> {
    let app = TestApp::spawn().await?;
    let merchant = app.register_merchant("Dibiterie Keur Serigne").await?;
    let customer = app.create_customer(&merchant, "Modou Fall", "+221775550099").await?;

    let (_, body) = app
        .post(
            "/next_api/orders",
            &merchant.token,
            json!({
                "merchant_id": merchant.merchant_id,
                "customer_id": customer["id"],
                "items": [{ "product_name": "Dibi", "quantity": 2, "unit_price": "0.10" }]
            }),
        )
        .await?;
    let item = format!("/next_api/order_items/{}", body["data"]["items"][0]["id"]);

    // Only the quantity changes; the stored unit price still counts
    let (status, body) = app.put(&item, &merchant.token, json!({ "quantity": 3 })).await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["total_price"], 0.3);

    // A caller-supplied total is ignored
    let (status, body) = app
        .put(&item, &merchant.token, json!({ "unit_price": 1500, "total_price": 1 }))
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["total_price"], 4500.0);
    Ok(())
}
