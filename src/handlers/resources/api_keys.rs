use axum::{extract::State, routing::post, Router};
use serde_json::Value;

use super::crud::{self, create_record, prepare_input, present};
use super::definitions::API_KEYS;
use super::{protect, WriteMode};
use crate::auth::generate_api_key;
use crate::handlers::AppState;
use crate::middleware::{ApiResponse, ApiResult, JsonBody};

/// The clear key is only ever part of this response
async fn create_api_key(State(state): State<AppState>, JsonBody(body): JsonBody<Value>) -> ApiResult<Value> {
    let mut data = prepare_input(&API_KEYS, body, WriteMode::Create)?;

    let (secret, prefix, hash) = generate_api_key();
    data.insert("key_prefix".into(), Value::String(prefix));
    data.insert("key_hash".into(), Value::String(hash));

    let created = create_record(&API_KEYS, &state, data).await?;
    let mut response = present(&API_KEYS, created);
    response["key"] = Value::String(secret);
    Ok(ApiResponse::created(response))
}

pub fn routes(state: &AppState) -> Router<AppState> {
    let def = &API_KEYS;
    Router::new()
        .route(
            &def.collection_path(),
            protect(
                state,
                crud::get_collection(def)
                    .merge(post(create_api_key))
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
