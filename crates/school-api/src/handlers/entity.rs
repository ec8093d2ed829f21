// ============================================================================
// School API - Entity Handlers
// File: crates/school-api/src/handlers/entity.rs
// ============================================================================
//! Generic CRUD handlers, one route pair serving every catalog entity

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use school_core::domain::{CallerContext, Record};
use school_core::repositories::Page;
use school_shared::types::Pagination;

use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    #[validate(range(min = 1, message = "page starts at 1"))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 100, message = "perPage must be between 1 and 100"))]
    pub per_page: Option<u32>,
}

/// Splits raw query pairs into paging parameters and reference filters
fn split_query(pairs: Vec<(String, String)>) -> ApiResult<(Pagination, Vec<(String, String)>)> {
    let mut params = PageParams::default();
    let mut filters = Vec::new();

    for (key, value) in pairs {
        match key.as_str() {
            "page" => params.page = Some(parse_number(&key, &value)?),
            "perPage" | "per_page" => params.per_page = Some(parse_number(&key, &value)?),
            _ => filters.push((key, value)),
        }
    }

    params
        .validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok((Pagination::new(params.page, params.per_page), filters))
}

fn parse_number(key: &str, value: &str) -> ApiResult<u32> {
    value
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("{} must be a positive integer", key)))
}

fn parse_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid id: {}", raw)))
}

fn json_body(body: Result<Json<Value>, JsonRejection>) -> ApiResult<Value> {
    body.map(|Json(v)| v)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

/// GET /api/{entity}
pub async fn list(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(entity): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ApiResult<Json<ApiResponse<Page>>> {
    let (pagination, filters) = split_query(pairs)?;
    let page = state.entities.list(&entity, pagination, &filters, &caller).await?;
    Ok(Json(ApiResponse::success(page)))
}

/// POST /api/{entity}
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(entity): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Record>>)> {
    let body = json_body(body)?;
    let record = state.entities.create(&entity, &body, &caller).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(record))))
}

/// GET /api/{entity}/{id}
pub async fn get(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path((entity, id)): Path<(String, String)>,
) -> ApiResult<Json<ApiResponse<Record>>> {
    let record = state.entities.get(&entity, parse_id(&id)?, &caller).await?;
    Ok(Json(ApiResponse::success(record)))
}

/// PUT /api/{entity}/{id}
pub async fn replace(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path((entity, id)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<Record>>> {
    let id = parse_id(&id)?;
    let body = json_body(body)?;
    let record = state.entities.replace(&entity, id, &body, &caller).await?;
    Ok(Json(ApiResponse::success(record)))
}

/// PATCH /api/{entity}/{id}
pub async fn patch(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path((entity, id)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<Record>>> {
    let id = parse_id(&id)?;
    let body = json_body(body)?;
    let record = state.entities.patch(&entity, id, &body, &caller).await?;
    Ok(Json(ApiResponse::success(record)))
}

/// DELETE /api/{entity}/{id}
pub async fn delete(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path((entity, id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    state.entities.delete(&entity, parse_id(&id)?, &caller).await?;
    Ok(StatusCode::NO_CONTENT)
}
