use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post, put, MethodRouter},
    Extension,
};
use serde_json::{json, Value};
use tracing::info;

use super::query::{parse_id, query_id};
use super::{DeleteMode, ListQuery, ResourceDef, UpdateMode, WriteMode};
use crate::database::models::mask_token;
use crate::database::record::{from_json, record_id, redact, strip_system_fields, value_as_i64, Record};
use crate::database::CrudOperations;
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::handlers::AppState;
use crate::middleware::{ApiResponse, ApiResult, AuthSession, JsonBody};
use crate::validation::Validator;

type Params = Query<HashMap<String, String>>;
type Session = Option<Extension<AuthSession>>;

pub fn crud_for(def: &ResourceDef, state: &AppState) -> CrudOperations {
    CrudOperations::new(def.name, state.store.clone())
}

fn not_found(def: &ResourceDef) -> ApiError {
    ApiError::not_found(format!("{} introuvable", def.label))
}

/// Strip hidden columns and mask secrets before a row leaves the API
pub fn present(def: &ResourceDef, mut record: Record) -> Value {
    redact(&mut record, def.hidden);
    for field in def.masked {
        if let Some(Value::String(secret)) = record.get(*field) {
            let masked = mask_token(secret);
            record.insert(field.to_string(), Value::String(masked));
        }
    }
    Value::Object(record)
}

fn owns(def: &ResourceDef, session: Option<&AuthSession>, record: &Record) -> bool {
    match (def.owner_column, session) {
        (Some(column), Some(session)) if !session.is_admin() => {
            record.get(column).and_then(value_as_i64) == Some(session.user_id)
        }
        _ => true,
    }
}

// Operations shared with the resource-specific handlers

pub async fn list_records(
    def: &ResourceDef,
    state: &AppState,
    session: Option<&AuthSession>,
    query: &HashMap<String, String>,
) -> Result<Vec<Record>, ApiError> {
    let parsed = ListQuery::parse(def, query, session)?;
    Ok(crud_for(def, state).find_many(parsed.filter, parsed.limit, parsed.offset).await?)
}

pub async fn fetch_record(
    def: &ResourceDef,
    state: &AppState,
    session: Option<&AuthSession>,
    id: i64,
) -> Result<Record, ApiError> {
    let record = crud_for(def, state).find_by_id(id).await?.ok_or_else(|| not_found(def))?;
    if !owns(def, session, &record) {
        return Err(not_found(def));
    }
    Ok(record)
}

/// Turn a request body into a validated, prepared record
pub fn prepare_input(def: &ResourceDef, body: Value, mode: WriteMode) -> Result<Record, ApiError> {
    let mut data = from_json(body)?;
    strip_system_fields(&mut data);
    for field in def.server_owned {
        data.remove(*field);
    }

    {
        let mut validator = match mode {
            WriteMode::Create => Validator::new(&data),
            WriteMode::Update => Validator::for_update(&data),
        };
        (def.validate)(&mut validator);
        validator.finish()?;
    }

    if mode == WriteMode::Create && def.delete.deactivates() {
        data.entry("is_active").or_insert(Value::Bool(true));
    }
    for field in def.hidden {
        // secrets are derived server-side, never accepted as input
        data.remove(*field);
    }
    if let Some(prepare) = def.prepare {
        prepare(&mut data, mode);
    }
    Ok(data)
}

async fn check_unique(
    def: &ResourceDef,
    crud: &CrudOperations,
    data: &Record,
    existing: Option<&Record>,
) -> Result<(), ApiError> {
    for rule in def.unique {
        let Some(value) = data.get(rule.field).filter(|v| !v.is_null()) else {
            continue;
        };
        let mut filter = FilterData::new().eq(rule.field, value.clone());
        if let Some(scope) = rule.scope {
            let scope_value = data
                .get(scope)
                .or_else(|| existing.and_then(|e| e.get(scope)))
                .filter(|v| !v.is_null());
            if let Some(scope_value) = scope_value {
                filter = filter.eq(scope, scope_value.clone());
            }
        }
        if let Some(id) = existing.and_then(record_id) {
            filter = filter.neq("id", id);
        }
        if crud.find_one(filter).await?.is_some() {
            return Err(ApiError::conflict(rule.message));
        }
    }
    Ok(())
}

/// Run the resource's guard and stamp the owner column on new rows
fn authorize_write(
    def: &ResourceDef,
    data: &mut Record,
    session: Option<&AuthSession>,
    mode: WriteMode,
) -> Result<(), ApiError> {
    if let Some(guard) = def.guard {
        guard(data, session)?;
    }
    if let (WriteMode::Create, Some(column), Some(session)) = (mode, def.owner_column, session) {
        data.insert(column.to_string(), Value::from(session.user_id));
    }
    Ok(())
}

pub async fn create_record(def: &ResourceDef, state: &AppState, mut data: Record) -> Result<Record, ApiError> {
    if let Some(derive) = def.derive {
        derive(&mut data, None);
    }
    let crud = crud_for(def, state);
    check_unique(def, &crud, &data, None).await?;

    let created = crud.create(data).await?;
    info!("Created {} #{}", def.name, record_id(&created).unwrap_or_default());

    if let Some(hook) = def.after_write {
        hook(state.clone(), created.clone()).await;
    }
    Ok(created)
}

pub async fn update_record(
    def: &ResourceDef,
    state: &AppState,
    session: Option<&AuthSession>,
    id: Option<i64>,
    body: Value,
) -> Result<Record, ApiError> {
    match def.update {
        UpdateMode::Allowed => {}
        UpdateMode::Forbidden => {
            return Err(ApiError::method_not_allowed(format!("{}: modification non autorisée", def.label)))
        }
        UpdateMode::Unsupported => {
            return Err(ApiError::not_implemented(format!("{}: modification non prise en charge", def.label)))
        }
    }
    let id = id.ok_or_else(|| ApiError::bad_request("L'identifiant est requis"))?;

    let mut data = prepare_input(def, body, WriteMode::Update)?;
    if data.is_empty() {
        return Err(ApiError::bad_request("Aucune donnée à mettre à jour"));
    }
    authorize_write(def, &mut data, session, WriteMode::Update)?;

    let existing = fetch_record(def, state, session, id).await?;
    if let Some(derive) = def.derive {
        derive(&mut data, Some(&existing));
    }
    let crud = crud_for(def, state);
    check_unique(def, &crud, &data, Some(&existing)).await?;

    let updated = crud.update(id, data).await.map_err(|e| match e {
        crate::database::DataError::NotFound(_) => not_found(def),
        other => other.into(),
    })?;
    info!("Updated {} #{}", def.name, id);

    if let Some(hook) = def.after_write {
        hook(state.clone(), updated.clone()).await;
    }
    Ok(updated)
}

pub async fn remove_record(
    def: &ResourceDef,
    state: &AppState,
    session: Option<&AuthSession>,
    id: Option<i64>,
) -> Result<Record, ApiError> {
    let patch = match def.delete {
        DeleteMode::Forbidden => {
            return Err(ApiError::method_not_allowed(format!("{}: suppression non autorisée", def.label)))
        }
        DeleteMode::Unsupported => {
            return Err(ApiError::not_implemented(format!("{}: suppression non prise en charge", def.label)))
        }
        DeleteMode::Deactivate => Some(json!({ "is_active": false })),
        DeleteMode::SetStatus(status) => Some(json!({ "status": status })),
        DeleteMode::Hard => None,
    };
    let id = id.ok_or_else(|| ApiError::bad_request("L'identifiant est requis"))?;
    fetch_record(def, state, session, id).await?;

    let crud = crud_for(def, state);
    let removed = match patch {
        Some(patch) => crud.soft_delete(id, from_json(patch)?).await,
        None => crud.delete(id).await,
    }
    .map_err(|e| match e {
        crate::database::DataError::NotFound(_) => not_found(def),
        other => other.into(),
    })?;
    info!("Deleted {} #{} ({:?})", def.name, id, def.delete);
    Ok(removed)
}

// Axum handlers

async fn handle_get_collection(
    def: &'static ResourceDef,
    State(state): State<AppState>,
    session: Session,
    Query(query): Params,
) -> ApiResult<Value> {
    let session = session.map(|Extension(s)| s);
    match query_id(&query)? {
        Some(id) => {
            let record = fetch_record(def, &state, session.as_ref(), id).await?;
            Ok(ApiResponse::success(present(def, record)))
        }
        None => {
            let rows = list_records(def, &state, session.as_ref(), &query).await?;
            let rows: Vec<Value> = rows.into_iter().map(|r| present(def, r)).collect();
            Ok(ApiResponse::success(Value::Array(rows)))
        }
    }
}

async fn handle_get_item(
    def: &'static ResourceDef,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let session = session.map(|Extension(s)| s);
    let record = fetch_record(def, &state, session.as_ref(), parse_id(&id)?).await?;
    Ok(ApiResponse::success(present(def, record)))
}

async fn handle_post(
    def: &'static ResourceDef,
    State(state): State<AppState>,
    session: Session,
    JsonBody(body): JsonBody<Value>,
) -> ApiResult<Value> {
    let session = session.map(|Extension(s)| s);
    let mut data = prepare_input(def, body, WriteMode::Create)?;
    authorize_write(def, &mut data, session.as_ref(), WriteMode::Create)?;
    let created = create_record(def, &state, data).await?;
    Ok(ApiResponse::created(present(def, created)))
}

async fn handle_put(
    def: &'static ResourceDef,
    state: AppState,
    session: Session,
    id: Option<i64>,
    body: Value,
) -> ApiResult<Value> {
    let session = session.map(|Extension(s)| s);
    let updated = update_record(def, &state, session.as_ref(), id, body).await?;
    Ok(ApiResponse::success(present(def, updated)))
}

async fn handle_delete(def: &'static ResourceDef, state: AppState, session: Session, id: Option<i64>) -> ApiResult<Value> {
    let session = session.map(|Extension(s)| s);
    let removed = remove_record(def, &state, session.as_ref(), id).await?;
    Ok(ApiResponse::success(present(def, removed)))
}

pub fn get_collection(def: &'static ResourceDef) -> MethodRouter<AppState> {
    get(move |state: State<AppState>, session: Session, query: Params| handle_get_collection(def, state, session, query))
}

pub fn get_item(def: &'static ResourceDef) -> MethodRouter<AppState> {
    get(move |state: State<AppState>, session: Session, id: Path<String>| handle_get_item(def, state, session, id))
}

pub fn post_collection(def: &'static ResourceDef) -> MethodRouter<AppState> {
    post(move |state: State<AppState>, session: Session, body: JsonBody<Value>| handle_post(def, state, session, body))
}

pub fn put_collection(def: &'static ResourceDef) -> MethodRouter<AppState> {
    put(
        move |State(state): State<AppState>, session: Session, Query(query): Params, JsonBody(body): JsonBody<Value>| async move {
            let id = query_id(&query)?;
            handle_put(def, state, session, id, body).await
        },
    )
}

pub fn put_item(def: &'static ResourceDef) -> MethodRouter<AppState> {
    put(
        move |State(state): State<AppState>, session: Session, Path(id): Path<String>, JsonBody(body): JsonBody<Value>| async move {
            let id = parse_id(&id)?;
            handle_put(def, state, session, Some(id), body).await
        },
    )
}

pub fn delete_collection(def: &'static ResourceDef) -> MethodRouter<AppState> {
    delete(move |State(state): State<AppState>, session: Session, Query(query): Params| async move {
        let id = query_id(&query)?;
        handle_delete(def, state, session, id).await
    })
}

pub fn delete_item(def: &'static ResourceDef) -> MethodRouter<AppState> {
    delete(move |State(state): State<AppState>, session: Session, Path(id): Path<String>| async move {
        let id = parse_id(&id)?;
        handle_delete(def, state, session, Some(id)).await
    })
}
