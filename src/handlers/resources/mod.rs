//! REST resources under `/next_api`.
//!
//! Most tables are served by the generic handlers in [`crud`], driven by a
//! [`ResourceDef`]. Orders and API keys replace some of those handlers with
//! their own.

pub mod api_keys;
pub mod crud;
pub mod definitions;
pub mod orders;
pub mod payments;
pub mod query;

use axum::{middleware::from_fn_with_state, routing::MethodRouter, Router};
use futures::future::BoxFuture;

use crate::database::record::Record;
use crate::error::ApiError;
use crate::handlers::AppState;
use crate::middleware::{require_session, AuthSession};
use crate::validation::Validator;

pub use query::ListQuery;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    Update,
}

/// What DELETE does for a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    /// `is_active = false`
    Deactivate,
    /// Set `status` to the given value
    SetStatus(&'static str),
    Hard,
    /// 405
    Forbidden,
    /// 501
    Unsupported,
}

impl DeleteMode {
    pub fn deactivates(&self) -> bool {
        matches!(self, DeleteMode::Deactivate)
    }
}

/// Whether PUT is accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    Allowed,
    /// 405
    Forbidden,
    /// 501
    Unsupported,
}

/// Column that must be unique, optionally within a scope column
pub struct UniqueRule {
    pub field: &'static str,
    pub scope: Option<&'static str>,
    pub message: &'static str,
}

pub type AfterWrite = fn(AppState, Record) -> BoxFuture<'static, ()>;

/// Rejects writes the caller may not make, such as granting a privileged role
pub type WriteGuard = fn(&Record, Option<&AuthSession>) -> Result<(), ApiError>;

/// Fills computed columns, seeing the stored row on update
pub type Derive = fn(&mut Record, Option<&Record>);

/// Per-table behavior of the generic handlers
pub struct ResourceDef {
    /// Route segment and table name
    pub name: &'static str,
    /// Noun used in "… introuvable"
    pub label: &'static str,
    pub validate: fn(&mut Validator<'_>),
    /// Equality filters accepted on listings, in addition to merchant/customer/status
    pub filters: &'static [&'static str],
    pub unique: &'static [UniqueRule],
    /// Normalize and fill defaults after validation
    pub prepare: Option<fn(&mut Record, WriteMode)>,
    /// Best-effort side effects once the row is written
    pub after_write: Option<AfterWrite>,
    pub guard: Option<WriteGuard>,
    pub derive: Option<Derive>,
    pub update: UpdateMode,
    pub delete: DeleteMode,
    /// Columns never returned
    pub hidden: &'static [&'static str],
    /// Columns returned only as a prefix
    pub masked: &'static [&'static str],
    /// Columns set by the server; dropped from request bodies
    pub server_owned: &'static [&'static str],
    /// Non-admin callers only see rows where this column is their user id.
    /// New rows always get the caller's id here.
    pub owner_column: Option<&'static str>,
}

impl ResourceDef {
    pub fn collection_path(&self) -> String {
        format!("/next_api/{}", self.name)
    }

    pub fn item_path(&self) -> String {
        format!("/next_api/{}/:id", self.name)
    }
}

pub(crate) fn protect(state: &AppState, routes: MethodRouter<AppState>) -> MethodRouter<AppState> {
    routes.route_layer(from_fn_with_state(state.clone(), require_session))
}

/// Every generic verb on both the collection and the item path
fn standard_routes(def: &'static ResourceDef, state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            &def.collection_path(),
            protect(
                state,
                crud::get_collection(def)
                    .merge(crud::post_collection(def))
                    .merge(crud::put_collection(def))
                    .merge(crud::delete_collection(def)),
            ),
        )
        .route(
            &def.item_path(),
            protect(
                state,
                crud::get_item(def).merge(crud::put_item(def)).merge(crud::delete_item(def)),
            ),
        )
}

/// Subscription plans are listed publicly for the pricing page
fn subscription_plan_routes(state: &AppState) -> Router<AppState> {
    let def = &definitions::SUBSCRIPTION_PLANS;
    Router::new()
        .route(
            &def.collection_path(),
            crud::get_collection(def).merge(protect(
                state,
                crud::post_collection(def)
                    .merge(crud::put_collection(def))
                    .merge(crud::delete_collection(def)),
            )),
        )
        .route(
            &def.item_path(),
            protect(
                state,
                crud::get_item(def).merge(crud::put_item(def)).merge(crud::delete_item(def)),
            ),
        )
}

pub fn routes(state: &AppState) -> Router<AppState> {
    use definitions::*;

    let mut router = Router::new()
        .merge(orders::routes(state))
        .merge(api_keys::routes(state))
        .merge(subscription_plan_routes(state));

    for def in [
        &PROFILES,
        &MERCHANTS,
        &CUSTOMERS,
        &PRODUCTS,
        &ORDER_ITEMS,
        &PAYMENTS,
        &PAYMENT_METHODS,
        &SUBSCRIPTIONS,
        &USER_SESSIONS,
        &AUDIT_LOGS,
        &ANALYTICS_EVENTS,
        &SUPPORT_TICKETS,
        &NOTIFICATIONS,
    ] {
        router = router.merge(standard_routes(def, state));
    }

    router
}
