use std::sync::Arc;
use std::time::Instant;

use farmchain_core::clock::Clock;
use farmchain_core::service::{CropService, FarmerService};
use farmchain_core::store::{CropStore, FarmerDirectory};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub crops: Arc<CropService>,
    pub farmers: Arc<FarmerService>,
    pub config: Arc<ServerConfig>,
    /// Present when running against PostgreSQL; checked by `/health`.
    pub pool: Option<farmchain_db::DbPool>,
    pub started_at: Instant,
}

impl AppState {
    /// Wire both services over the given stores and clock.
    pub fn new(
        crop_store: Arc<dyn CropStore>,
        farmer_directory: Arc<dyn FarmerDirectory>,
        clock: Arc<dyn Clock>,
        config: ServerConfig,
        pool: Option<farmchain_db::DbPool>,
    ) -> Self {
        let crops = CropService::new(
            crop_store,
            Arc::clone(&farmer_directory),
            Arc::clone(&clock),
            config.services.clone(),
        );
        let farmers = FarmerService::new(farmer_directory, clock, config.services.clone());

        Self {
            crops: Arc::new(crops),
            farmers: Arc::new(farmers),
            config: Arc::new(config),
            pool,
            started_at: Instant::now(),
        }
    }
}
