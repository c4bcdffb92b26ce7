//! Repository for the `farmers` table.

use farmchain_core::farmer::{FarmerChanges, FarmerFilter, NewFarmer, MAX_REPUTATION, MIN_REPUTATION};
use farmchain_core::status::{StatusId, VerificationStatus};
use farmchain_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::farmer::{FarmerRow, FarmerStatsRow, FarmerSummaryRow};
use crate::repositories::crop_repo::escape_like;

/// Column list for `farmers` SELECT / RETURNING clauses.
const COLUMNS: &str = "\
    id, wallet_address, phone_number, name, email, \
    state, lga, longitude, latitude, address, farm_size, crops, \
    verification_status_id, reputation_score, total_sales, total_earnings, \
    is_active, joined_at, last_login_at, created_at, updated_at";

/// Provides data access for the farmer directory.
pub struct FarmerRepo;

impl FarmerRepo {
    /// Insert a new farmer. Unique violations surface as database errors.
    pub async fn create(pool: &PgPool, input: &NewFarmer) -> Result<FarmerRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO farmers \
                (wallet_address, phone_number, name, email, state, lga, longitude, \
                 latitude, address, farm_size, crops, joined_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12, $12) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FarmerRow>(&query)
            .bind(&input.wallet_address)
            .bind(&input.phone_number)
            .bind(&input.name)
            .bind(&input.email)
            .bind(&input.location.state)
            .bind(&input.location.lga)
            .bind(input.location.coordinates.longitude)
            .bind(input.location.coordinates.latitude)
            .bind(&input.location.address)
            .bind(input.farm_size)
            .bind(&input.crops)
            .bind(input.joined_at)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<FarmerRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM farmers WHERE id = $1");
        sqlx::query_as::<_, FarmerRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Wallet addresses are stored lowercase.
    pub async fn find_by_wallet(
        pool: &PgPool,
        wallet_address: &str,
    ) -> Result<Option<FarmerRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM farmers WHERE wallet_address = LOWER($1)");
        sqlx::query_as::<_, FarmerRow>(&query)
            .bind(wallet_address)
            .fetch_optional(pool)
            .await
    }

    /// Active farmers matching the text query and filter, in id order.
    pub async fn search(
        pool: &PgPool,
        text: Option<&str>,
        filter: &FarmerFilter,
    ) -> Result<Vec<FarmerRow>, sqlx::Error> {
        let (where_clause, bind_values, _) = build_farmer_filter(text, filter);
        let query = format!("SELECT {COLUMNS} FROM farmers {where_clause} ORDER BY id ASC");

        let mut q = sqlx::query_as::<_, FarmerRow>(&query);
        for val in &bind_values {
            q = match val {
                BindValue::Int(v) => q.bind(*v),
                BindValue::SmallInt(v) => q.bind(*v),
                BindValue::Text(v) => q.bind(v.as_str()),
                BindValue::TextArray(v) => q.bind(v.as_slice()),
            };
        }
        q.fetch_all(pool).await
    }

    /// Directory aggregates over active farmers.
    pub async fn statistics(pool: &PgPool) -> Result<FarmerStatsRow, sqlx::Error> {
        sqlx::query_as::<_, FarmerStatsRow>(
            "SELECT \
                COUNT(*)::BIGINT AS total_farmers, \
                COUNT(*) FILTER (WHERE verification_status_id = $1) AS verified_farmers, \
                COUNT(*) FILTER (WHERE verification_status_id = $2) AS pending_verification, \
                COALESCE(SUM(farm_size), 0)::DOUBLE PRECISION AS total_farm_size, \
                COALESCE(SUM(total_earnings), 0)::DOUBLE PRECISION AS total_earnings, \
                AVG(reputation_score)::DOUBLE PRECISION AS average_reputation_score \
             FROM farmers WHERE is_active = true",
        )
        .bind(VerificationStatus::Verified.id())
        .bind(VerificationStatus::Pending.id())
        .fetch_one(pool)
        .await
    }

    /// Apply a profile update; `NULL` parameters keep the stored value.
    pub async fn update_profile(
        pool: &PgPool,
        id: DbId,
        changes: &FarmerChanges,
        at: Timestamp,
    ) -> Result<Option<FarmerRow>, sqlx::Error> {
        let location = changes.location.as_ref();
        let query = format!(
            "UPDATE farmers SET \
                name = COALESCE($2, name), \
                email = COALESCE($3, email), \
                phone_number = COALESCE($4, phone_number), \
                state = COALESCE($5, state), \
                lga = COALESCE($6, lga), \
                longitude = COALESCE($7, longitude), \
                latitude = COALESCE($8, latitude), \
                address = CASE WHEN $5 IS NULL THEN address ELSE $9 END, \
                farm_size = COALESCE($10, farm_size), \
                crops = COALESCE($11, crops), \
                updated_at = $12 \
             WHERE id = $1 AND is_active = true \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FarmerRow>(&query)
            .bind(id)
            .bind(&changes.name)
            .bind(&changes.email)
            .bind(&changes.phone_number)
            .bind(location.map(|l| l.state.as_str()))
            .bind(location.map(|l| l.lga.as_str()))
            .bind(location.map(|l| l.coordinates.longitude))
            .bind(location.map(|l| l.coordinates.latitude))
            .bind(location.and_then(|l| l.address.as_deref()))
            .bind(changes.farm_size)
            .bind(&changes.crops)
            .bind(at)
            .fetch_optional(pool)
            .await
    }

    /// Set `last_login_at` on an active farmer.
    pub async fn record_login(
        pool: &PgPool,
        id: DbId,
        at: Timestamp,
    ) -> Result<Option<FarmerRow>, sqlx::Error> {
        let query = format!(
            "UPDATE farmers SET last_login_at = $2 \
             WHERE id = $1 AND is_active = true \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FarmerRow>(&query)
            .bind(id)
            .bind(at)
            .fetch_optional(pool)
            .await
    }

    /// Summary columns for a set of farmers.
    pub async fn find_summaries(
        pool: &PgPool,
        ids: &[DbId],
    ) -> Result<Vec<FarmerSummaryRow>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, FarmerSummaryRow>(
            "SELECT id, name, state, wallet_address, verification_status_id \
             FROM farmers WHERE id = ANY($1) ORDER BY id",
        )
        .bind(ids)
        .fetch_all(pool)
        .await
    }

    /// Increment the sale counter and add to total earnings.
    pub async fn record_sale(
        pool: &PgPool,
        id: DbId,
        amount: f64,
        at: Timestamp,
    ) -> Result<Option<FarmerRow>, sqlx::Error> {
        let query = format!(
            "UPDATE farmers SET \
                total_sales = total_sales + 1, \
                total_earnings = total_earnings + $2, \
                updated_at = $3 \
             WHERE id = $1 AND is_active = true \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FarmerRow>(&query)
            .bind(id)
            .bind(amount)
            .bind(at)
            .fetch_optional(pool)
            .await
    }

    /// Shift the reputation score, clamped in SQL so concurrent adjustments
    /// cannot escape the bounds.
    pub async fn adjust_reputation(
        pool: &PgPool,
        id: DbId,
        delta: i32,
        at: Timestamp,
    ) -> Result<Option<FarmerRow>, sqlx::Error> {
        let query = format!(
            "UPDATE farmers SET \
                reputation_score = LEAST(GREATEST(reputation_score::BIGINT + $2, $3), $4)::INTEGER, \
                updated_at = $5 \
             WHERE id = $1 AND is_active = true \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FarmerRow>(&query)
            .bind(id)
            .bind(i64::from(delta))
            .bind(i64::from(MIN_REPUTATION))
            .bind(i64::from(MAX_REPUTATION))
            .bind(at)
            .fetch_optional(pool)
            .await
    }
}

// ---------------------------------------------------------------------------
// Internal helpers for dynamic query building
// ---------------------------------------------------------------------------

/// Typed bind value for dynamically-built farmer queries.
#[derive(Debug, Clone, PartialEq)]
enum BindValue {
    Int(i32),
    SmallInt(StatusId),
    Text(String),
    TextArray(Vec<String>),
}

/// Build a WHERE clause and bind values from a text query and filter.
///
/// The clause always restricts to active rows. Returns
/// `(where_clause, bind_values, next_bind_index)`.
fn build_farmer_filter(text: Option<&str>, filter: &FarmerFilter) -> (String, Vec<BindValue>, u32) {
    let mut conditions: Vec<String> = vec!["is_active = true".to_string()];
    let mut bind_idx = 1u32;
    let mut bind_values: Vec<BindValue> = Vec::new();

    if let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) {
        conditions.push(format!(
            "(name ILIKE ${bind_idx} OR state ILIKE ${bind_idx} \
              OR EXISTS (SELECT 1 FROM unnest(crops) AS c WHERE c ILIKE ${bind_idx}))"
        ));
        bind_idx += 1;
        bind_values.push(BindValue::Text(format!("%{}%", escape_like(text))));
    }

    if let Some(ref state) = filter.state {
        conditions.push(format!("state = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Text(state.clone()));
    }

    if let Some(status) = filter.verification_status {
        conditions.push(format!("verification_status_id = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::SmallInt(status.id()));
    }

    if !filter.crops.is_empty() {
        conditions.push(format!("crops && ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::TextArray(filter.crops.clone()));
    }

    if let Some(min) = filter.min_reputation_score {
        conditions.push(format!("reputation_score >= ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Int(min));
    }

    let where_clause = format!("WHERE {}", conditions.join(" AND "));
    (where_clause, bind_values, bind_idx)
}
