//! Farmer directory handlers. Reads are public; profile updates need the
//! owner's token.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use farmchain_core::farmer::{Farmer, FarmerProfile, UpdateFarmer};
use farmchain_core::types::DbId;

use crate::error::AppResult;
use crate::middleware::auth::AuthFarmer;
use crate::query::{FarmerSearchParams, VerifiedFarmerParams};
use crate::response::DataResponse;
use crate::state::AppState;

fn profiles(farmers: &[Farmer]) -> Vec<FarmerProfile> {
    farmers.iter().map(Farmer::profile).collect()
}

/// GET /api/v1/farmers
///
/// Active farmers, narrowed by `q` (name, crops, state) and filter params.
pub async fn list_farmers(
    State(state): State<AppState>,
    Query(params): Query<FarmerSearchParams>,
) -> AppResult<impl IntoResponse> {
    let (text, filter) = params.into_filter()?;
    let farmers = state.farmers.search(text.as_deref(), &filter).await?;
    Ok(Json(DataResponse {
        data: profiles(&farmers),
    }))
}

/// GET /api/v1/farmers/verified
pub async fn list_verified_farmers(
    State(state): State<AppState>,
    Query(params): Query<VerifiedFarmerParams>,
) -> AppResult<impl IntoResponse> {
    let farmers = state.farmers.list_verified(params.state.as_deref()).await?;
    Ok(Json(DataResponse {
        data: profiles(&farmers),
    }))
}

/// GET /api/v1/farmers/stats
pub async fn farmer_stats(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let stats = state.farmers.statistics().await?;
    Ok(Json(DataResponse { data: stats }))
}

/// GET /api/v1/farmers/{id}
pub async fn get_farmer(
    State(state): State<AppState>,
    Path(farmer_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let farmer = state.farmers.get(farmer_id).await?;
    Ok(Json(DataResponse {
        data: farmer.profile(),
    }))
}

/// PUT /api/v1/farmers/{id}
///
/// A farmer may only edit their own profile.
pub async fn update_farmer(
    auth: AuthFarmer,
    State(state): State<AppState>,
    Path(farmer_id): Path<DbId>,
    Json(input): Json<UpdateFarmer>,
) -> AppResult<impl IntoResponse> {
    let farmer = state
        .farmers
        .update_profile(farmer_id, auth.farmer_id, &input)
        .await?;
    Ok(Json(DataResponse {
        data: farmer.profile(),
    }))
}

/// GET /api/v1/farmers/{id}/crops
///
/// Active crops of an active farmer; 404 when the farmer is unknown.
pub async fn list_farmer_crops(
    State(state): State<AppState>,
    Path(farmer_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    state.farmers.get(farmer_id).await?;
    let crops = state.crops.list_by_farmer(farmer_id).await?;
    Ok(Json(DataResponse { data: crops }))
}
