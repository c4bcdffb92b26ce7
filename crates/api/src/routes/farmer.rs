use axum::routing::get;
use axum::Router;

use crate::handlers::farmer;
use crate::state::AppState;

/// Routes mounted at `/farmers`.
///
/// ```text
/// GET  /              -> list_farmers
/// GET  /verified      -> list_verified_farmers
/// GET  /stats         -> farmer_stats
/// GET  /{id}          -> get_farmer
/// PUT  /{id}          -> update_farmer
/// GET  /{id}/crops    -> list_farmer_crops
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(farmer::list_farmers))
        .route("/verified", get(farmer::list_verified_farmers))
        .route("/stats", get(farmer::farmer_stats))
        .route("/{id}", get(farmer::get_farmer).put(farmer::update_farmer))
        .route("/{id}/crops", get(farmer::list_farmer_crops))
}
