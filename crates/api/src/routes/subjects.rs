//! Subject lookup endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use common::Subject;
use lookup::ImageResult;
use serde::Deserialize;

use crate::AppState;
use crate::error::ApiError;

/// GET /subjects — all indexed subjects.
pub async fn list(State(state): State<Arc<AppState>>) -> Json<Vec<Subject>> {
    Json(state.index.all_subjects().to_vec())
}

/// GET /subjects/:id — one subject by id.
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
) -> Result<Json<Subject>, ApiError> {
    state
        .index
        .subject_by_id(id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Subject {id} not found")))
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub limit: Option<usize>,
}

/// GET /subjects/search?q=&limit= — fuzzy/prefix name search.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Subject>>, ApiError> {
    let q = query
        .q
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing 'q' query parameter".to_string()))?;

    let limit = query.limit.unwrap_or(10);
    Ok(Json(state.index.search_by_name(&q, limit)))
}

#[derive(Deserialize)]
pub struct ImagesQuery {
    pub ids: Option<String>,
}

/// GET /images?ids=1,2,3 — image references for the given subject ids.
pub async fn images(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ImagesQuery>,
) -> Result<Json<Vec<ImageResult>>, ApiError> {
    let ids_param = query
        .ids
        .ok_or_else(|| ApiError::BadRequest("missing 'ids' query parameter".to_string()))?;

    let ids: Vec<u32> = ids_param
        .split(',')
        .filter_map(|id| id.trim().parse().ok())
        .collect();

    if ids.is_empty() {
        return Err(ApiError::BadRequest("no valid ids provided".to_string()));
    }

    Ok(Json(state.index.images_by_subject_ids(&ids)))
}
