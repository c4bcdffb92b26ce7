//! Handlers for crop records.
//!
//! Reads are public. Mutations require an [`AuthFarmer`]; the caller becomes
//! the `updated_by` of any status entry they cause.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use farmchain_core::crop::{CreateCrop, RecordHarvest};
use farmchain_core::types::DbId;
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthFarmer;
use crate::query::{CropSearchParams, UpcomingHarvestParams};
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `PATCH /crops/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// GET /api/v1/crops
///
/// Text search (`q`) plus filters. Each result carries its farmer summary.
pub async fn search_crops(
    State(state): State<AppState>,
    Query(params): Query<CropSearchParams>,
) -> AppResult<impl IntoResponse> {
    let (text, filter) = params.into_filter()?;
    let listings = state
        .crops
        .search_listings(text.as_deref(), &filter)
        .await?;
    Ok(Json(DataResponse { data: listings }))
}

/// GET /api/v1/crops/stats
pub async fn crop_stats(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let stats = state.crops.statistics().await?;
    Ok(Json(DataResponse { data: stats }))
}

/// GET /api/v1/crops/upcoming-harvests
pub async fn upcoming_harvests(
    State(state): State<AppState>,
    Query(params): Query<UpcomingHarvestParams>,
) -> AppResult<impl IntoResponse> {
    let listings = state
        .crops
        .upcoming_harvest_listings(params.within_days)
        .await?;
    Ok(Json(DataResponse { data: listings }))
}

/// GET /api/v1/crops/{id}
pub async fn get_crop(
    State(state): State<AppState>,
    Path(crop_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let crop = state.crops.get(crop_id).await?;
    Ok(Json(DataResponse { data: crop }))
}

/// GET /api/v1/crops/{id}/progress
pub async fn crop_progress(
    State(state): State<AppState>,
    Path(crop_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let report = state.crops.progress(crop_id).await?;
    Ok(Json(DataResponse { data: report }))
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

/// POST /api/v1/crops
pub async fn create_crop(
    auth: AuthFarmer,
    State(state): State<AppState>,
    Json(input): Json<CreateCrop>,
) -> AppResult<impl IntoResponse> {
    let crop = state.crops.create(&input).await?;

    tracing::info!(crop_id = crop.id, caller = auth.farmer_id, "Crop created via API");

    Ok((StatusCode::CREATED, Json(DataResponse { data: crop })))
}

/// PATCH /api/v1/crops/{id}/status
pub async fn update_status(
    auth: AuthFarmer,
    State(state): State<AppState>,
    Path(crop_id): Path<DbId>,
    Json(input): Json<UpdateStatusRequest>,
) -> AppResult<impl IntoResponse> {
    let crop = state
        .crops
        .update_status(crop_id, &input.status, input.notes.as_deref(), auth.farmer_id)
        .await?;
    Ok(Json(DataResponse { data: crop }))
}

/// POST /api/v1/crops/{id}/harvest
pub async fn record_harvest(
    auth: AuthFarmer,
    State(state): State<AppState>,
    Path(crop_id): Path<DbId>,
    Json(input): Json<RecordHarvest>,
) -> AppResult<impl IntoResponse> {
    let crop = state
        .crops
        .record_harvest(crop_id, &input, auth.farmer_id)
        .await?;
    Ok(Json(DataResponse { data: crop }))
}

/// DELETE /api/v1/crops/{id}
///
/// Soft delete by the owning farmer. The record disappears from every read
/// but is kept.
pub async fn deactivate_crop(
    auth: AuthFarmer,
    State(state): State<AppState>,
    Path(crop_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    state.crops.deactivate(crop_id, auth.farmer_id).await?;

    tracing::info!(crop_id, caller = auth.farmer_id, "Crop deactivated via API");

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/crops/{id}/restore
///
/// Owner only.
pub async fn restore_crop(
    auth: AuthFarmer,
    State(state): State<AppState>,
    Path(crop_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let crop = state.crops.restore(crop_id, auth.farmer_id).await?;

    tracing::info!(crop_id, caller = auth.farmer_id, "Crop restored via API");

    Ok(Json(DataResponse { data: crop }))
}
