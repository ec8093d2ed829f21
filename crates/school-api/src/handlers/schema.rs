//! Catalog metadata - GET /api/schema

use axum::{extract::State, Json};
use serde::Serialize;

use school_core::schema::{EntityDef, Relation};

use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaResponse {
    pub entities: Vec<EntityDef>,
    pub relations: Vec<Relation>,
}

pub async fn describe(State(state): State<AppState>) -> Json<ApiResponse<SchemaResponse>> {
    let catalog = state.entities.catalog();
    Json(ApiResponse::success(SchemaResponse {
        entities: catalog.entities().to_vec(),
        relations: catalog.relations().to_vec(),
    }))
}
