//! JWT-based authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use farmchain_core::error::CoreError;
use farmchain_core::types::DbId;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// The farmer behind a Bearer token in the `Authorization` header.
///
/// The token alone is not enough: the farmer must still exist and be active.
///
/// ```ignore
/// async fn my_handler(auth: AuthFarmer) -> AppResult<Json<()>> {
///     tracing::info!(farmer_id = auth.farmer_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthFarmer {
    pub farmer_id: DbId,
    pub wallet_address: String,
}

impl FromRequestParts<AppState> for AuthFarmer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        let claims = validate_token(token, &state.config.jwt).map_err(|_| {
            AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
        })?;

        let farmer = match state.farmers.get(claims.sub).await {
            Ok(farmer) => farmer,
            Err(CoreError::NotFound { .. }) => {
                return Err(AppError::Core(CoreError::Unauthorized(
                    "Farmer not found or inactive".into(),
                )))
            }
            Err(other) => return Err(other.into()),
        };

        Ok(AuthFarmer {
            farmer_id: farmer.id,
            wallet_address: farmer.wallet_address,
        })
    }
}
