use axum::routing::{get, patch, post};
use axum::Router;

use crate::handlers::crop;
use crate::state::AppState;

/// Routes mounted at `/crops`.
///
/// ```text
/// GET    /                    -> search_crops
/// POST   /                    -> create_crop
/// GET    /stats               -> crop_stats
/// GET    /upcoming-harvests   -> upcoming_harvests
/// GET    /{id}                -> get_crop
/// DELETE /{id}                -> deactivate_crop
/// POST   /{id}/restore        -> restore_crop
/// PATCH  /{id}/status         -> update_status
/// POST   /{id}/harvest        -> record_harvest
/// GET    /{id}/progress       -> crop_progress
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(crop::search_crops).post(crop::create_crop))
        .route("/stats", get(crop::crop_stats))
        .route("/upcoming-harvests", get(crop::upcoming_harvests))
        .route("/{id}", get(crop::get_crop).delete(crop::deactivate_crop))
        .route("/{id}/restore", post(crop::restore_crop))
        .route("/{id}/status", patch(crop::update_status))
        .route("/{id}/harvest", post(crop::record_harvest))
        .route("/{id}/progress", get(crop::crop_progress))
}
