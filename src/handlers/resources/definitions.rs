use rust_decimal::Decimal;
use serde_json::Value;

use super::orders::{decimal, money};
use super::payments;
use super::{DeleteMode, ResourceDef, UniqueRule, UpdateMode, WriteMode};
use crate::auth::{generate_session_token, hash_password};
use crate::database::models::{
    BillingInterval, NotificationType, OrderPaymentStatus, OrderStatus, PaymentProvider, PaymentStatus, Role,
    StringEnum, SubscriptionStatus, TicketPriority, TicketStatus,
};
use crate::database::record::{value_as_i64, Record};
use crate::error::ApiError;
use crate::middleware::AuthSession;
use crate::validation::{normalize_phone, Validator};

const EMAIL_TAKEN: &str = "Un compte avec cet email existe déjà";
const PHONE_TAKEN: &str = "Ce numéro de téléphone est déjà utilisé";

fn normalize_phones(data: &mut Record, fields: &[&str]) {
    for field in fields {
        if let Some(Value::String(phone)) = data.get(*field) {
            let normalized = normalize_phone(phone);
            data.insert(field.to_string(), Value::String(normalized));
        }
    }
}

fn default_value(data: &mut Record, mode: WriteMode, field: &str, value: Value) {
    if mode == WriteMode::Create {
        data.entry(field).or_insert(value);
    }
}

// profiles

fn validate_profile(v: &mut Validator<'_>) {
    v.required("email").email("email").required("full_name").phone("phone").one_of::<Role>("role");
    v.min_len("password", 8);
}

fn prepare_profile(data: &mut Record, mode: WriteMode) {
    if let Some(Value::String(email)) = data.get("email") {
        let email = email.trim().to_lowercase();
        data.insert("email".into(), Value::String(email));
    }
    normalize_phones(data, &["phone"]);
    if let Some(Value::String(password)) = data.remove("password") {
        data.insert("password_hash".into(), Value::String(hash_password(&password)));
    }
    default_value(data, mode, "role", Value::from(Role::Merchant.to_string()));
}

/// Only admins may hand out the admin role
fn guard_profile_role(data: &Record, session: Option<&AuthSession>) -> Result<(), ApiError> {
    let requested = data.get("role").and_then(Value::as_str).and_then(Role::parse);
    let caller_is_admin = session.map_or(false, |s| s.role == Role::Admin);
    if requested == Some(Role::Admin) && !caller_is_admin {
        return Err(ApiError::forbidden("Seul un administrateur peut attribuer le rôle admin"));
    }
    Ok(())
}

pub static PROFILES: ResourceDef = ResourceDef {
    name: "profiles",
    label: "Profil",
    validate: validate_profile,
    filters: &["role", "email"],
    unique: &[
        UniqueRule { field: "email", scope: None, message: EMAIL_TAKEN },
        UniqueRule { field: "phone", scope: None, message: PHONE_TAKEN },
    ],
    prepare: Some(prepare_profile),
    after_write: None,
    guard: Some(guard_profile_role),
    derive: None,
    update: UpdateMode::Allowed,
    delete: DeleteMode::Deactivate,
    hidden: &["password_hash"],
    masked: &[],
    server_owned: &[],
    owner_column: None,
};

// merchants

fn validate_merchant(v: &mut Validator<'_>) {
    v.required("profile_id").integer("profile_id").required("business_name").phone("whatsapp_number");
}

fn prepare_merchant(data: &mut Record, mode: WriteMode) {
    normalize_phones(data, &["whatsapp_number"]);
    default_value(data, mode, "currency", Value::from("XOF"));
}

pub static MERCHANTS: ResourceDef = ResourceDef {
    name: "merchants",
    label: "Marchand",
    validate: validate_merchant,
    filters: &["profile_id", "city", "business_type"],
    unique: &[],
    prepare: Some(prepare_merchant),
    after_write: None,
    guard: None,
    derive: None,
    update: UpdateMode::Allowed,
    delete: DeleteMode::Deactivate,
    hidden: &[],
    masked: &[],
    server_owned: &[],
    owner_column: None,
};

// customers

fn validate_customer(v: &mut Validator<'_>) {
    v.required("merchant_id")
        .integer("merchant_id")
        .required("name")
        .required("phone")
        .phone("phone")
        .email("email")
        .integer("total_orders")
        .non_negative("total_orders")
        .non_negative("total_spent");
}

fn prepare_customer(data: &mut Record, mode: WriteMode) {
    normalize_phones(data, &["phone"]);
    default_value(data, mode, "total_orders", Value::from(0));
    default_value(data, mode, "total_spent", Value::from(0));
}

pub static CUSTOMERS: ResourceDef = ResourceDef {
    name: "customers",
    label: "Client",
    validate: validate_customer,
    filters: &["phone"],
    unique: &[UniqueRule {
        field: "phone",
        scope: Some("merchant_id"),
        message: "Un client avec ce numéro de téléphone existe déjà",
    }],
    prepare: Some(prepare_customer),
    after_write: None,
    guard: None,
    derive: None,
    update: UpdateMode::Allowed,
    delete: DeleteMode::Deactivate,
    hidden: &[],
    masked: &[],
    server_owned: &[],
    owner_column: None,
};

// products

fn validate_product(v: &mut Validator<'_>) {
    v.required("merchant_id")
        .integer("merchant_id")
        .required("name")
        .required("price")
        .non_negative("price")
        .integer("stock_quantity")
        .non_negative("stock_quantity");
}

fn prepare_product(data: &mut Record, mode: WriteMode) {
    default_value(data, mode, "stock_quantity", Value::from(0));
}

pub static PRODUCTS: ResourceDef = ResourceDef {
    name: "products",
    label: "Produit",
    validate: validate_product,
    filters: &["category", "sku"],
    unique: &[],
    prepare: Some(prepare_product),
    after_write: None,
    guard: None,
    derive: None,
    update: UpdateMode::Allowed,
    delete: DeleteMode::Deactivate,
    hidden: &[],
    masked: &[],
    server_owned: &[],
    owner_column: None,
};

// orders (POST and reads are handled in `orders`)

pub(super) fn validate_order(v: &mut Validator<'_>) {
    v.required("merchant_id")
        .integer("merchant_id")
        .required("customer_id")
        .integer("customer_id")
        .one_of::<OrderStatus>("status")
        .one_of::<OrderPaymentStatus>("payment_status")
        .non_negative("total_amount");
}

pub static ORDERS: ResourceDef = ResourceDef {
    name: "orders",
    label: "Commande",
    validate: validate_order,
    filters: &["payment_status", "order_number"],
    unique: &[],
    prepare: None,
    after_write: None,
    guard: None,
    derive: None,
    update: UpdateMode::Allowed,
    delete: DeleteMode::SetStatus("cancelled"),
    hidden: &[],
    masked: &[],
    server_owned: &[],
    owner_column: None,
};

// order_items

fn validate_order_item(v: &mut Validator<'_>) {
    v.required("order_id")
        .integer("order_id")
        .integer("product_id")
        .required("quantity")
        .integer("quantity")
        .positive("quantity")
        .required("unit_price")
        .non_negative("unit_price");
}

/// total_price = quantity * unit_price, falling back to the stored row for a partial update
fn derive_order_item_total(data: &mut Record, existing: Option<&Record>) {
    let field = |name: &str| data.get(name).or_else(|| existing.and_then(|row| row.get(name)));
    let quantity = field("quantity").and_then(value_as_i64);
    let unit_price = field("unit_price").and_then(decimal);
    if let (Some(quantity), Some(unit_price)) = (quantity, unit_price) {
        let total = money(unit_price * Decimal::from(quantity));
        data.insert("total_price".into(), total);
    }
}

pub static ORDER_ITEMS: ResourceDef = ResourceDef {
    name: "order_items",
    label: "Article de commande",
    validate: validate_order_item,
    filters: &["order_id", "product_id"],
    unique: &[],
    prepare: None,
    after_write: None,
    guard: None,
    derive: Some(derive_order_item_total),
    update: UpdateMode::Allowed,
    delete: DeleteMode::Hard,
    hidden: &[],
    masked: &[],
    server_owned: &["total_price"],
    owner_column: None,
};

// payments

fn validate_payment(v: &mut Validator<'_>) {
    v.required("merchant_id")
        .integer("merchant_id")
        .integer("order_id")
        .required("amount")
        .positive("amount")
        .required("provider")
        .one_of::<PaymentProvider>("provider")
        .one_of::<PaymentStatus>("status");
}

pub static PAYMENTS: ResourceDef = ResourceDef {
    name: "payments",
    label: "Paiement",
    validate: validate_payment,
    filters: &["order_id", "provider"],
    unique: &[],
    prepare: Some(payments::prepare_payment),
    after_write: Some(payments::settle_order),
    guard: None,
    derive: None,
    update: UpdateMode::Allowed,
    delete: DeleteMode::SetStatus("cancelled"),
    hidden: &[],
    masked: &[],
    server_owned: &[],
    owner_column: None,
};

// payment_methods

fn validate_payment_method(v: &mut Validator<'_>) {
    v.required("merchant_id")
        .integer("merchant_id")
        .required("provider")
        .one_of::<PaymentProvider>("provider")
        .required("account_number");
}

fn prepare_payment_method(data: &mut Record, mode: WriteMode) {
    default_value(data, mode, "is_default", Value::Bool(false));
}

pub static PAYMENT_METHODS: ResourceDef = ResourceDef {
    name: "payment_methods",
    label: "Moyen de paiement",
    validate: validate_payment_method,
    filters: &["provider", "is_default"],
    unique: &[],
    prepare: Some(prepare_payment_method),
    after_write: None,
    guard: None,
    derive: None,
    update: UpdateMode::Allowed,
    delete: DeleteMode::Deactivate,
    hidden: &[],
    masked: &[],
    server_owned: &[],
    owner_column: None,
};

// subscription_plans

fn validate_plan(v: &mut Validator<'_>) {
    v.required("name")
        .required("price")
        .non_negative("price")
        .required("billing_interval")
        .one_of::<BillingInterval>("billing_interval")
        .integer("max_orders")
        .integer("max_products");
}

fn prepare_plan(data: &mut Record, mode: WriteMode) {
    default_value(data, mode, "currency", Value::from("XOF"));
}

pub static SUBSCRIPTION_PLANS: ResourceDef = ResourceDef {
    name: "subscription_plans",
    label: "Formule d'abonnement",
    validate: validate_plan,
    filters: &["billing_interval"],
    unique: &[],
    prepare: Some(prepare_plan),
    after_write: None,
    guard: None,
    derive: None,
    update: UpdateMode::Allowed,
    delete: DeleteMode::Deactivate,
    hidden: &[],
    masked: &[],
    server_owned: &[],
    owner_column: None,
};

// subscriptions

fn validate_subscription(v: &mut Validator<'_>) {
    v.required("merchant_id")
        .integer("merchant_id")
        .integer("plan_id")
        .required("status")
        .one_of::<SubscriptionStatus>("status");
}

pub static SUBSCRIPTIONS: ResourceDef = ResourceDef {
    name: "subscriptions",
    label: "Abonnement",
    validate: validate_subscription,
    filters: &["plan_id"],
    unique: &[],
    prepare: None,
    after_write: None,
    guard: None,
    derive: None,
    update: UpdateMode::Allowed,
    delete: DeleteMode::SetStatus("cancelled"),
    hidden: &[],
    masked: &[],
    server_owned: &[],
    owner_column: None,
};

// api_keys (POST is handled in `api_keys`)

fn validate_api_key(v: &mut Validator<'_>) {
    v.required("merchant_id").integer("merchant_id").required("name");
}

pub static API_KEYS: ResourceDef = ResourceDef {
    name: "api_keys",
    label: "Clé API",
    validate: validate_api_key,
    filters: &[],
    unique: &[],
    prepare: None,
    after_write: None,
    guard: None,
    derive: None,
    update: UpdateMode::Allowed,
    delete: DeleteMode::Deactivate,
    hidden: &["key_hash"],
    masked: &[],
    server_owned: &[],
    owner_column: None,
};

// user_sessions

fn validate_session(v: &mut Validator<'_>) {
    v.required("expires_at");
}

fn prepare_session(data: &mut Record, mode: WriteMode) {
    if mode == WriteMode::Create {
        data.insert("session_token".into(), Value::String(generate_session_token()));
    }
}

pub static USER_SESSIONS: ResourceDef = ResourceDef {
    name: "user_sessions",
    label: "Session",
    validate: validate_session,
    filters: &["user_id"],
    unique: &[],
    prepare: Some(prepare_session),
    after_write: None,
    guard: None,
    derive: None,
    update: UpdateMode::Allowed,
    delete: DeleteMode::Deactivate,
    hidden: &[],
    masked: &["session_token"],
    server_owned: &["user_id", "session_token"],
    owner_column: Some("user_id"),
};

// audit_logs: append-only

fn validate_audit_log(v: &mut Validator<'_>) {
    v.required("action").required("entity_type").integer("user_id");
}

pub static AUDIT_LOGS: ResourceDef = ResourceDef {
    name: "audit_logs",
    label: "Journal d'audit",
    validate: validate_audit_log,
    filters: &["user_id", "action", "entity_type", "entity_id"],
    unique: &[],
    prepare: None,
    after_write: None,
    guard: None,
    derive: None,
    update: UpdateMode::Forbidden,
    delete: DeleteMode::Forbidden,
    hidden: &[],
    masked: &[],
    server_owned: &[],
    owner_column: None,
};

// analytics_events: append-only

fn validate_analytics_event(v: &mut Validator<'_>) {
    v.required("event_type").integer("merchant_id");
}

pub static ANALYTICS_EVENTS: ResourceDef = ResourceDef {
    name: "analytics_events",
    label: "Événement",
    validate: validate_analytics_event,
    filters: &["event_type", "session_id"],
    unique: &[],
    prepare: None,
    after_write: None,
    guard: None,
    derive: None,
    update: UpdateMode::Unsupported,
    delete: DeleteMode::Unsupported,
    hidden: &[],
    masked: &[],
    server_owned: &[],
    owner_column: None,
};

// support_tickets

fn validate_ticket(v: &mut Validator<'_>) {
    v.required("subject")
        .required("description")
        .integer("user_id")
        .one_of::<TicketStatus>("status")
        .one_of::<TicketPriority>("priority");
}

fn prepare_ticket(data: &mut Record, mode: WriteMode) {
    default_value(data, mode, "status", Value::from(TicketStatus::Open.to_string()));
    default_value(data, mode, "priority", Value::from(TicketPriority::Medium.to_string()));
}

pub static SUPPORT_TICKETS: ResourceDef = ResourceDef {
    name: "support_tickets",
    label: "Ticket",
    validate: validate_ticket,
    filters: &["user_id", "priority"],
    unique: &[],
    prepare: Some(prepare_ticket),
    after_write: None,
    guard: None,
    derive: None,
    update: UpdateMode::Allowed,
    delete: DeleteMode::SetStatus("closed"),
    hidden: &[],
    masked: &[],
    server_owned: &[],
    owner_column: None,
};

// notifications

fn validate_notification(v: &mut Validator<'_>) {
    v.required("user_id")
        .integer("user_id")
        .required("type")
        .one_of::<NotificationType>("type")
        .required("title")
        .required("message");
}

fn prepare_notification(data: &mut Record, mode: WriteMode) {
    default_value(data, mode, "is_read", Value::Bool(false));
}

pub static NOTIFICATIONS: ResourceDef = ResourceDef {
    name: "notifications",
    label: "Notification",
    validate: validate_notification,
    filters: &["user_id", "type", "is_read"],
    unique: &[],
    prepare: Some(prepare_notification),
    after_write: None,
    guard: None,
    derive: None,
    update: UpdateMode::Allowed,
    delete: DeleteMode::Deactivate,
    hidden: &[],
    masked: &[],
    server_owned: &[],
    owner_column: None,
};
