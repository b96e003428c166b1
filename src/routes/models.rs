//! Models endpoint
//!
//! Lists the fixed set of model identifiers the upstream accepts.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::{AppError, AppResult},
    openai::response::{unix_now, Model, ModelsResponse},
    AppState,
};

/// List available models
pub async fn list_models(
    State(state): State<Arc<AppState>>,
) -> AppResult<(StatusCode, Json<ModelsResponse>)> {
    let response = ModelsResponse::from_ids(&state.config.models, unix_now());
    Ok((StatusCode::OK, Json(response)))
}

/// Get a single model by id
pub async fn get_model(
    State(state): State<Arc<AppState>>,
    Path(model_id): Path<String>,
) -> AppResult<(StatusCode, Json<Model>)> {
    state
        .config
        .models
        .iter()
        .find(|id| **id == model_id)
        .map(|id| (StatusCode::OK, Json(Model::new(id, unix_now()))))
        .ok_or_else(|| AppError::NotFound(format!("model '{}'", model_id)))
}
