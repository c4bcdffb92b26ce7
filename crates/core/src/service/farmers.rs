use std::sync::Arc;

use super::{bounded, ServiceSettings};
use crate::clock::Clock;
use crate::error::CoreError;
use crate::farmer::{
    normalize_wallet, validate_farmer_update, validate_new_farmer, validate_sale_amount,
    CreateFarmer, Farmer, FarmerFilter, FarmerStatistics, UpdateFarmer,
};
use crate::store::FarmerDirectory;
use crate::types::{CoreResult, DbId};

/// Farmer registration and directory operations.
pub struct FarmerService {
    farmers: Arc<dyn FarmerDirectory>,
    clock: Arc<dyn Clock>,
    settings: ServiceSettings,
}

impl FarmerService {
    pub fn new(
        farmers: Arc<dyn FarmerDirectory>,
        clock: Arc<dyn Clock>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            farmers,
            clock,
            settings,
        }
    }

    /// Register a farmer. An existing wallet address (any case) is a conflict.
    pub async fn register(&self, input: &CreateFarmer) -> CoreResult<Farmer> {
        let new_farmer = validate_new_farmer(input, &self.settings.taxonomy, self.clock.now())?;

        let existing = bounded(
            self.settings.store_timeout,
            "find_farmer_by_wallet",
            self.farmers.find_by_wallet(&new_farmer.wallet_address),
        )
        .await?;
        if existing.is_some() {
            return Err(CoreError::Conflict(
                "Farmer already registered with this wallet".to_string(),
            ));
        }

        let farmer = bounded(
            self.settings.store_timeout,
            "insert_farmer",
            self.farmers.insert(&new_farmer),
        )
        .await?;

        tracing::info!(farmer_id = farmer.id, state = %farmer.location.state, "Farmer registered");
        Ok(farmer)
    }

    /// Active farmer by id.
    pub async fn get(&self, id: DbId) -> CoreResult<Farmer> {
        bounded(
            self.settings.store_timeout,
            "find_farmer",
            self.farmers.find_by_id(id),
        )
        .await?
        .filter(|f| f.is_active)
        .ok_or(CoreError::NotFound { entity: "Farmer", id })
    }

    pub async fn find_by_wallet(&self, wallet_address: &str) -> CoreResult<Option<Farmer>> {
        let wallet = normalize_wallet(wallet_address)?;
        bounded(
            self.settings.store_timeout,
            "find_farmer_by_wallet",
            self.farmers.find_by_wallet(&wallet),
        )
        .await
    }

    /// Active farmers matching the text and filter, in id order.
    pub async fn search(&self, text: Option<&str>, filter: &FarmerFilter) -> CoreResult<Vec<Farmer>> {
        let text = text.map(str::trim).filter(|t| !t.is_empty());
        bounded(
            self.settings.store_timeout,
            "search_farmers",
            self.farmers.search(text, filter),
        )
        .await
    }

    pub async fn list_active(&self) -> CoreResult<Vec<Farmer>> {
        self.search(None, &FarmerFilter::default()).await
    }

    /// Verified active farmers, optionally in one state.
    pub async fn list_verified(&self, state: Option<&str>) -> CoreResult<Vec<Farmer>> {
        let state = state.map(str::trim).filter(|s| !s.is_empty());
        if let Some(state) = state {
            self.settings.taxonomy.validate_region("state", state)?;
        }
        self.search(None, &FarmerFilter::verified_in(state.map(str::to_string)))
            .await
    }

    pub async fn statistics(&self) -> CoreResult<FarmerStatistics> {
        bounded(
            self.settings.store_timeout,
            "farmer_statistics",
            self.farmers.statistics(),
        )
        .await
    }

    /// Update a farmer's own profile. Only the farmer may edit it.
    pub async fn update_profile(
        &self,
        id: DbId,
        actor: DbId,
        input: &UpdateFarmer,
    ) -> CoreResult<Farmer> {
        if id != actor {
            return Err(CoreError::Forbidden(
                "Farmers can only update their own profile".to_string(),
            ));
        }
        let changes = validate_farmer_update(input, &self.settings.taxonomy)?;
        let farmer = bounded(
            self.settings.store_timeout,
            "update_farmer_profile",
            self.farmers.update_profile(id, &changes, self.clock.now()),
        )
        .await?
        .ok_or(CoreError::NotFound { entity: "Farmer", id })?;

        tracing::info!(farmer_id = id, "Farmer profile updated");
        Ok(farmer)
    }

    /// Stamp the farmer's last login time. Called whenever a token is issued.
    pub async fn record_login(&self, id: DbId) -> CoreResult<Farmer> {
        bounded(
            self.settings.store_timeout,
            "record_login",
            self.farmers.record_login(id, self.clock.now()),
        )
        .await?
        .ok_or(CoreError::NotFound { entity: "Farmer", id })
    }

    /// Count a completed sale toward the farmer's totals.
    pub async fn record_sale(&self, id: DbId, amount: f64) -> CoreResult<Farmer> {
        validate_sale_amount(amount)?;
        let farmer = bounded(
            self.settings.store_timeout,
            "record_sale",
            self.farmers.record_sale(id, amount, self.clock.now()),
        )
        .await?
        .ok_or(CoreError::NotFound { entity: "Farmer", id })?;

        tracing::info!(farmer_id = id, amount, total_sales = farmer.total_sales, "Sale recorded");
        Ok(farmer)
    }

    /// Shift the reputation score by `delta`, clamped to its bounds.
    pub async fn adjust_reputation(&self, id: DbId, delta: i32) -> CoreResult<Farmer> {
        let farmer = bounded(
            self.settings.store_timeout,
            "adjust_reputation",
            self.farmers.adjust_reputation(id, delta, self.clock.now()),
        )
        .await?
        .ok_or(CoreError::NotFound { entity: "Farmer", id })?;

        tracing::debug!(farmer_id = id, delta, score = farmer.reputation_score, "Reputation adjusted");
        Ok(farmer)
    }
}
