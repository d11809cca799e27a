use std::collections::HashMap;
use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Router,
};
use chrono::Utc;
use futures::future::try_join_all;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use super::crud::{self, fetch_record, list_records, present};
use super::definitions::{validate_order, ORDERS, ORDER_ITEMS};
use super::query::{parse_id, query_id};
use super::protect;
use crate::database::models::{OrderPaymentStatus, OrderStatus, StringEnum};
use crate::database::record::{from_json, get_str, record_id, value_as_i64, Record};
use crate::database::CrudOperations;
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::handlers::AppState;
use crate::middleware::{ApiResponse, ApiResult, AuthSession, JsonBody};
use crate::validation::Validator;

/// `CMD-YYYYMMDD-XXXXXX`
pub fn generate_order_number() -> String {
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(6).collect();
    format!("CMD-{}-{}", Utc::now().format("%Y%m%d"), suffix.to_uppercase())
}

pub(super) fn decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

pub(super) fn money(value: Decimal) -> Value {
    value
        .round_dp(2)
        .to_f64()
        .map(Value::from)
        .unwrap_or(Value::Null)
}

/// One validated line of an order
#[derive(Debug, Clone)]
struct OrderLine {
    product_id: Option<i64>,
    product_name: Option<String>,
    quantity: i64,
    unit_price: Decimal,
}

impl OrderLine {
    fn total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

fn parse_lines(items: &[Value]) -> Result<Vec<OrderLine>, ApiError> {
    let mut field_errors = std::collections::BTreeMap::new();
    let mut lines = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        let key = |field: &str| format!("items[{}].{}", index, field);
        let Some(item) = item.as_object() else {
            field_errors.insert(key("item"), "Article invalide".to_string());
            continue;
        };

        let product_id = item.get("product_id").and_then(value_as_i64);
        let product_name = get_str(item, "product_name").map(str::trim).filter(|s| !s.is_empty());
        if product_id.is_none() && product_name.is_none() {
            field_errors.insert(key("product_id"), "Le produit est requis".to_string());
        }

        let quantity = item.get("quantity").and_then(|q| match q {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        });
        match quantity {
            Some(q) if q > 0 => {}
            _ => {
                field_errors.insert(key("quantity"), "La quantité doit être un entier supérieur à zéro".to_string());
            }
        }

        let unit_price = item.get("unit_price").and_then(decimal);
        match unit_price {
            Some(p) if p >= Decimal::ZERO => {}
            _ => {
                field_errors.insert(key("unit_price"), "Le prix unitaire doit être un nombre positif".to_string());
            }
        }

        if let (Some(quantity), Some(unit_price)) = (quantity, unit_price) {
            lines.push(OrderLine {
                product_id,
                product_name: product_name.map(str::to_string),
                quantity,
                unit_price,
            });
        }
    }

    if field_errors.is_empty() {
        Ok(lines)
    } else {
        let message = field_errors.values().next().cloned().unwrap_or_default();
        Err(ApiError::validation_error(message, Some(field_errors)))
    }
}

async fn items_for(state: &AppState, order_id: i64) -> Result<Vec<Value>, ApiError> {
    let items = CrudOperations::new(ORDER_ITEMS.name, state.store.clone());
    let filter = FilterData::new().eq("order_id", order_id).order("id asc")?;
    Ok(items.find_where(filter).await?.into_iter().map(Value::Object).collect())
}

async fn with_items(state: &AppState, order: Record) -> Result<Value, ApiError> {
    let id = record_id(&order).ok_or_else(ApiError::internal)?;
    let items = items_for(state, id).await?;
    let mut order = present(&ORDERS, order);
    order["items"] = Value::Array(items);
    Ok(order)
}

/// Bump the customer's counters. Failures are logged only.
async fn record_customer_order(state: &AppState, customer_id: i64, amount: Decimal) {
    let customers = CrudOperations::new("customers", state.store.clone());
    let customer = match customers.find_by_id(customer_id).await {
        Ok(Some(customer)) => customer,
        Ok(None) => {
            warn!("Order placed for unknown customer #{}", customer_id);
            return;
        }
        Err(e) => {
            warn!("Could not load customer #{}: {}", customer_id, e);
            return;
        }
    };

    let total_orders = customer.get("total_orders").and_then(value_as_i64).unwrap_or(0) + 1;
    let total_spent = customer.get("total_spent").and_then(decimal).unwrap_or(Decimal::ZERO) + amount;
    let patch = json!({ "total_orders": total_orders, "total_spent": money(total_spent) });

    match from_json(patch) {
        Ok(patch) => {
            if let Err(e) = customers.update(customer_id, patch).await {
                warn!("Failed to update totals of customer #{}: {}", customer_id, e);
            }
        }
        Err(e) => warn!("Could not build customer patch: {}", e),
    }
}

async fn create_order(State(state): State<AppState>, JsonBody(body): JsonBody<Value>) -> ApiResult<Value> {
    let mut data = from_json(body)?;

    {
        let mut validator = Validator::new(&data);
        validate_order(&mut validator);
        validator.required("items");
        if !matches!(data.get("items"), Some(Value::Array(_)) | None | Some(Value::Null)) {
            validator.add("items", "Le champ 'items' doit être une liste");
        }
        validator.finish()?;
    }

    let items = match data.remove("items") {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    };
    let lines = parse_lines(&items)?;
    let total: Decimal = lines.iter().map(OrderLine::total).sum();

    let merchant_id = data.get("merchant_id").and_then(value_as_i64).ok_or_else(ApiError::internal)?;
    let customer_id = data.get("customer_id").and_then(value_as_i64).ok_or_else(ApiError::internal)?;

    let order = from_json(json!({
        "merchant_id": merchant_id,
        "customer_id": customer_id,
        "order_number": generate_order_number(),
        "status": get_str(&data, "status").unwrap_or(OrderStatus::Pending.as_str()),
        "payment_status": get_str(&data, "payment_status").unwrap_or(OrderPaymentStatus::Pending.as_str()),
        "total_amount": money(total),
        "currency": get_str(&data, "currency").unwrap_or("XOF"),
        "delivery_address": data.get("delivery_address"),
        "notes": data.get("notes"),
    }))?;

    let orders = CrudOperations::new(ORDERS.name, state.store.clone());
    let order = orders.create(order).await?;
    let order_id = record_id(&order).ok_or_else(ApiError::internal)?;

    let order_items = CrudOperations::new(ORDER_ITEMS.name, state.store.clone());
    let rows = lines
        .iter()
        .map(|line| {
            from_json(json!({
                "order_id": order_id,
                "product_id": line.product_id,
                "product_name": line.product_name,
                "quantity": line.quantity,
                "unit_price": money(line.unit_price),
                "total_price": money(line.total()),
            }))
        })
        .collect::<Result<Vec<Record>, _>>()?;
    let created_items = try_join_all(rows.into_iter().map(|row| order_items.create(row))).await?;

    record_customer_order(&state, customer_id, total).await;
    info!(
        "Created order {} with {} items",
        get_str(&order, "order_number").unwrap_or_default(),
        created_items.len()
    );

    let mut response = present(&ORDERS, order);
    response["items"] = Value::Array(created_items.into_iter().map(Value::Object).collect());
    Ok(ApiResponse::created(response))
}

async fn get_orders(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<Value> {
    match query_id(&query)? {
        Some(id) => {
            let order = fetch_record(&ORDERS, &state, Some(&session), id).await?;
            Ok(ApiResponse::success(with_items(&state, order).await?))
        }
        None => {
            let rows = list_records(&ORDERS, &state, Some(&session), &query).await?;
            Ok(ApiResponse::success(Value::Array(rows.into_iter().map(|r| present(&ORDERS, r)).collect())))
        }
    }
}

async fn get_order(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let order = fetch_record(&ORDERS, &state, Some(&session), parse_id(&id)?).await?;
    Ok(ApiResponse::success(with_items(&state, order).await?))
}

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            &ORDERS.collection_path(),
            protect(
                state,
                get(get_orders)
                    .merge(post(create_order))
                    .merge(crud::put_collection(&ORDERS))
                    .merge(crud::delete_collection(&ORDERS)),
            ),
        )
        .route(
            &ORDERS.item_path(),
            protect(
                state,
                get(get_order).merge(crud::put_item(&ORDERS)).merge(crud::delete_item(&ORDERS)),
            ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_numbers_follow_pattern() {
        let number = generate_order_number();
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts[0], "CMD");
        assert_eq!(parts[1].len(), 8);
        assert_eq!(parts[2].len(), 6);
        assert!(parts[2].chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn lines_total_with_decimal_precision() {
        let items = vec![
            json!({"product_name": "Thiakry", "quantity": 3, "unit_price": 0.1}),
            json!({"product_id": 4, "quantity": "2", "unit_price": "1250.50"}),
        ];
        let lines = parse_lines(&items).unwrap();
        let total: Decimal = lines.iter().map(OrderLine::total).sum();
        assert_eq!(total, Decimal::from_str("2501.3").unwrap());
    }

    #[test]
    fn invalid_lines_report_indexed_fields() {
        let items = vec![json!({"quantity": 0, "unit_price": -1})];
        let err = parse_lines(&items).unwrap_err();
        let body = err.to_json();
        assert!(body["field_errors"]["items[0].product_id"].is_string());
        assert!(body["field_errors"]["items[0].quantity"].is_string());
        assert!(body["field_errors"]["items[0].unit_price"].is_string());
    }

    #[test]
    fn decimal_reads_numbers_and_strings() {
        assert_eq!(decimal(&json!(12.5)), Decimal::from_str("12.5").ok());
        assert_eq!(decimal(&json!("7")), Some(Decimal::from(7)));
        assert_eq!(decimal(&json!(null)), None);
    }
}
