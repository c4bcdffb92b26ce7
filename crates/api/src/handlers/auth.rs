//! Handlers for farmer registration, token refresh and token checks.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use farmchain_core::farmer::{CreateFarmer, FarmerProfile};
use farmchain_core::types::DbId;
use serde::Serialize;

use crate::auth::jwt::generate_access_token;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthFarmer;
use crate::response::DataResponse;
use crate::state::AppState;

/// Token response returned by register and refresh.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub farmer: FarmerProfile,
}

/// POST /api/v1/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<CreateFarmer>,
) -> AppResult<impl IntoResponse> {
    let farmer = state.farmers.register(&input).await?;
    let response = issue_token(&state, farmer.id).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: response })))
}

/// POST /api/v1/auth/refresh
///
/// Exchange a valid token for a fresh one.
pub async fn refresh(
    auth: AuthFarmer,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let response = issue_token(&state, auth.farmer_id).await?;
    Ok(Json(DataResponse { data: response }))
}

/// Stamp the login time and sign a token for the farmer.
async fn issue_token(state: &AppState, farmer_id: DbId) -> AppResult<TokenResponse> {
    let farmer = state.farmers.record_login(farmer_id).await?;

    let token = generate_access_token(
        farmer.id,
        &farmer.wallet_address,
        chrono::Utc::now(),
        &state.config.jwt,
    )
    .map_err(|e| AppError::InternalError(format!("Token generation failed: {e}")))?;

    tracing::debug!(farmer_id, "Access token issued");
    Ok(TokenResponse {
        token,
        farmer: farmer.profile(),
    })
}

/// GET /api/v1/auth/verify
///
/// Profile of the farmer the token belongs to.
pub async fn verify(
    auth: AuthFarmer,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let farmer = state.farmers.get(auth.farmer_id).await?;
    Ok(Json(DataResponse {
        data: farmer.profile(),
    }))
}
