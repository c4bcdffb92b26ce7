pub mod auth;
pub mod crop;
pub mod farmer;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /auth/register                     register farmer (public)
/// /auth/verify                       current farmer (auth)
///
/// /farmers                           list active farmers
/// /farmers/{id}                      farmer profile
/// /farmers/{id}/crops                crops of a farmer
///
/// /crops                             search (public), create (auth)
/// /crops/stats                       aggregate statistics
/// /crops/upcoming-harvests           growing/mature crops due soon
/// /crops/{id}                        get (public), deactivate (auth)
/// /crops/{id}/restore                undo deactivation (auth)
/// /crops/{id}/status                 update status (auth)
/// /crops/{id}/harvest                record harvest (auth)
/// /crops/{id}/progress               growth progress
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/farmers", farmer::router())
        .nest("/crops", crop::router())
}
