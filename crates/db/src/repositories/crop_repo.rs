//! Repository for the `crops` and `crop_status_updates` tables.

use farmchain_core::crop::NewCrop;
use farmchain_core::lifecycle::StatusChange;
use farmchain_core::query::CropFilter;
use farmchain_core::status::{CropStatus, StatusId};
use farmchain_core::types::{DbId, Timestamp};
use sqlx::{PgConnection, PgPool};

use crate::models::crop::{CropRow, CropTotalsRow, StatusUpdateRow};

/// Result of [`CropRepo::apply_status_change`].
#[derive(Debug)]
pub enum StatusWrite {
    Applied(CropRow),
    /// No active crop with that id.
    Missing,
    /// Forward-only move refused; carries the status held at write time.
    Rejected { current: StatusId },
}

/// Aggregates read from one snapshot by [`CropRepo::statistics`].
#[derive(Debug)]
pub struct CropStatisticsRows {
    pub totals: CropTotalsRow,
    pub by_status: Vec<(StatusId, i64)>,
    pub by_crop_type: Vec<(String, i64)>,
}

// ---------------------------------------------------------------------------
// Column lists
// ---------------------------------------------------------------------------

/// Column list for `crops` SELECT / RETURNING clauses.
const COLUMNS: &str = "\
    id, farmer_id, blockchain_tx_hash, crop_type, variety, \
    planting_date, expected_harvest, actual_harvest, \
    state, lga, longitude, latitude, address, farm_size, \
    status_id, quality_grade, quantity, unit, notes, \
    is_active, created_at, updated_at";

/// Column list for `crop_status_updates` SELECT / RETURNING clauses.
const UPDATE_COLUMNS: &str = "id, crop_id, status_id, notes, updated_by, created_at";

// ---------------------------------------------------------------------------
// CropRepo
// ---------------------------------------------------------------------------

/// Provides data access for crop records.
pub struct CropRepo;

impl CropRepo {
    /// Insert a new crop in status `planned`.
    pub async fn create(pool: &PgPool, input: &NewCrop) -> Result<CropRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO crops \
                (farmer_id, blockchain_tx_hash, crop_type, variety, planting_date, \
                 expected_harvest, state, lga, longitude, latitude, address, farm_size, \
                 status_id, notes, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $15) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CropRow>(&query)
            .bind(input.farmer_id)
            .bind(&input.blockchain_tx_hash)
            .bind(&input.crop_type)
            .bind(&input.variety)
            .bind(input.planting_date)
            .bind(input.expected_harvest)
            .bind(&input.farm_location.state)
            .bind(&input.farm_location.lga)
            .bind(input.farm_location.coordinates.longitude)
            .bind(input.farm_location.coordinates.latitude)
            .bind(&input.farm_location.address)
            .bind(input.farm_size)
            .bind(CropStatus::Planned.id())
            .bind(&input.notes)
            .bind(input.recorded_at)
            .fetch_one(pool)
            .await
    }

    /// Find a crop by id regardless of its active flag.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<CropRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM crops WHERE id = $1");
        sqlx::query_as::<_, CropRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Active crops matching the text query and filter, in insertion order.
    pub async fn search(
        pool: &PgPool,
        text: Option<&str>,
        filter: &CropFilter,
    ) -> Result<Vec<CropRow>, sqlx::Error> {
        let (where_clause, bind_values, _) = build_crop_filter(text, filter);
        let query = format!("SELECT {COLUMNS} FROM crops {where_clause} ORDER BY id ASC");

        bind_crop_values(sqlx::query_as::<_, CropRow>(&query), &bind_values)
            .fetch_all(pool)
            .await
    }

    /// Active crops in any of `status_ids` expected on or before `cutoff`.
    pub async fn find_harvest_window(
        pool: &PgPool,
        status_ids: &[StatusId],
        cutoff: Timestamp,
    ) -> Result<Vec<CropRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM crops \
             WHERE is_active = true AND status_id = ANY($1) AND expected_harvest <= $2 \
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, CropRow>(&query)
            .bind(status_ids)
            .bind(cutoff)
            .fetch_all(pool)
            .await
    }

    /// Apply a status change and append its audit row in one transaction.
    ///
    /// The crop row is locked before its status is read, so concurrent
    /// changes to the same crop are serialised. With `forward_only`, a move
    /// to an earlier status than the locked one is refused. `actual_harvest`
    /// is only written when it is still NULL, so repeated harvests keep the
    /// first date.
    pub async fn apply_status_change(
        pool: &PgPool,
        id: DbId,
        change: &StatusChange,
        forward_only: bool,
    ) -> Result<StatusWrite, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let current = sqlx::query_scalar::<_, StatusId>(
            "SELECT status_id FROM crops WHERE id = $1 AND is_active = true FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(current) = current else {
            tx.rollback().await?;
            return Ok(StatusWrite::Missing);
        };
        if forward_only && change.status.id() < current {
            tx.rollback().await?;
            return Ok(StatusWrite::Rejected { current });
        }

        let query = format!(
            "UPDATE crops SET \
                status_id = $2, \
                actual_harvest = CASE WHEN $2 = $3 THEN COALESCE(actual_harvest, $4) \
                                      ELSE actual_harvest END, \
                quantity = COALESCE($5, quantity), \
                unit = COALESCE($6, unit), \
                quality_grade = COALESCE($7, quality_grade), \
                updated_at = $4 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        let outcome = change.outcome.as_ref();
        let row = sqlx::query_as::<_, CropRow>(&query)
            .bind(id)
            .bind(change.status.id())
            .bind(CropStatus::Harvested.id())
            .bind(change.at)
            .bind(outcome.map(|o| o.quantity))
            .bind(outcome.map(|o| o.unit.as_str()))
            .bind(outcome.and_then(|o| o.quality_grade).map(|g| g.as_str()))
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO crop_status_updates (crop_id, status_id, notes, updated_by, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(change.status.id())
        .bind(&change.notes)
        .bind(change.actor)
        .bind(change.at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(StatusWrite::Applied(row))
    }

    /// Set the soft-delete flag. Returns `true` if the flag changed.
    pub async fn set_active(
        pool: &PgPool,
        id: DbId,
        active: bool,
        at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE crops SET is_active = $2, updated_at = $3 \
             WHERE id = $1 AND is_active <> $2",
        )
        .bind(id)
        .bind(active)
        .bind(at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Totals and both breakdowns over active crops, read from a single
    /// repeatable-read snapshot so the counts agree with each other.
    pub async fn statistics(pool: &PgPool) -> Result<CropStatisticsRows, sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let totals = Self::totals(&mut *tx).await?;
        let by_status = Self::count_by_status(&mut *tx).await?;
        let by_crop_type = Self::count_by_crop_type(&mut *tx).await?;

        tx.commit().await?;
        Ok(CropStatisticsRows {
            totals,
            by_status,
            by_crop_type,
        })
    }

    /// Count, total area and mean planned growing period over active crops.
    async fn totals(conn: &mut PgConnection) -> Result<CropTotalsRow, sqlx::Error> {
        sqlx::query_as::<_, CropTotalsRow>(
            "SELECT \
                COUNT(*)::BIGINT AS total_count, \
                COALESCE(SUM(farm_size), 0)::DOUBLE PRECISION AS total_farm_size, \
                AVG(EXTRACT(EPOCH FROM (expected_harvest - planting_date)) / 86400.0)\
                    ::DOUBLE PRECISION AS average_growth_duration_days \
             FROM crops WHERE is_active = true",
        )
        .fetch_one(conn)
        .await
    }

    async fn count_by_status(conn: &mut PgConnection) -> Result<Vec<(StatusId, i64)>, sqlx::Error> {
        sqlx::query_as::<_, (StatusId, i64)>(
            "SELECT status_id, COUNT(*)::BIGINT FROM crops \
             WHERE is_active = true GROUP BY status_id ORDER BY status_id",
        )
        .fetch_all(conn)
        .await
    }

    async fn count_by_crop_type(conn: &mut PgConnection) -> Result<Vec<(String, i64)>, sqlx::Error> {
        sqlx::query_as::<_, (String, i64)>(
            "SELECT crop_type, COUNT(*)::BIGINT FROM crops \
             WHERE is_active = true GROUP BY crop_type ORDER BY crop_type",
        )
        .fetch_all(conn)
        .await
    }
}

// ---------------------------------------------------------------------------
// StatusUpdateRepo
// ---------------------------------------------------------------------------

/// Read access to the crop audit trail. Rows are only written by
/// [`CropRepo::apply_status_change`].
pub struct StatusUpdateRepo;

impl StatusUpdateRepo {
    /// Audit rows for the given crops, ordered by crop then id.
    pub async fn list_for_crops(
        pool: &PgPool,
        crop_ids: &[DbId],
    ) -> Result<Vec<StatusUpdateRow>, sqlx::Error> {
        if crop_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT {UPDATE_COLUMNS} FROM crop_status_updates \
             WHERE crop_id = ANY($1) ORDER BY crop_id, id"
        );
        sqlx::query_as::<_, StatusUpdateRow>(&query)
            .bind(crop_ids)
            .fetch_all(pool)
            .await
    }
}

// ---------------------------------------------------------------------------
// Internal helpers for dynamic query building
// ---------------------------------------------------------------------------

/// Typed bind value for dynamically-built crop queries.
#[derive(Debug, Clone, PartialEq)]
enum BindValue {
    BigInt(i64),
    SmallInt(i16),
    Float(f64),
    Text(String),
    Timestamp(Timestamp),
}

/// Build a WHERE clause and bind values from a text query and filter.
///
/// The clause always restricts to active rows. Returns
/// `(where_clause, bind_values, next_bind_index)`.
fn build_crop_filter(text: Option<&str>, filter: &CropFilter) -> (String, Vec<BindValue>, u32) {
    let mut conditions: Vec<String> = vec!["is_active = true".to_string()];
    let mut bind_idx = 1u32;
    let mut bind_values: Vec<BindValue> = Vec::new();

    if let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) {
        conditions.push(format!(
            "(crop_type ILIKE ${bind_idx} OR variety ILIKE ${bind_idx} \
              OR state ILIKE ${bind_idx} OR notes ILIKE ${bind_idx})"
        ));
        bind_idx += 1;
        bind_values.push(BindValue::Text(format!("%{}%", escape_like(text))));
    }

    if let Some(farmer_id) = filter.farmer_id {
        conditions.push(format!("farmer_id = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::BigInt(farmer_id));
    }

    if let Some(ref crop_type) = filter.crop_type {
        conditions.push(format!("crop_type = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Text(crop_type.clone()));
    }

    if let Some(status) = filter.status {
        conditions.push(format!("status_id = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::SmallInt(status.id()));
    }

    if let Some(ref state) = filter.state {
        conditions.push(format!("state = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Text(state.clone()));
    }

    if let Some(ref lga) = filter.lga {
        conditions.push(format!("lga = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Text(lga.clone()));
    }

    if let Some(min) = filter.min_farm_size {
        conditions.push(format!("farm_size >= ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Float(min));
    }

    if let Some(from) = filter.planting_date_from {
        conditions.push(format!("planting_date >= ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Timestamp(from));
    }

    if let Some(to) = filter.planting_date_to {
        conditions.push(format!("planting_date <= ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Timestamp(to));
    }

    let where_clause = format!("WHERE {}", conditions.join(" AND "));
    (where_clause, bind_values, bind_idx)
}

/// Bind a slice of `BindValue` to a sqlx `QueryAs`.
fn bind_crop_values<'q, O>(
    mut q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments>,
    bind_values: &'q [BindValue],
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments> {
    for val in bind_values {
        match val {
            BindValue::BigInt(v) => q = q.bind(*v),
            BindValue::SmallInt(v) => q = q.bind(*v),
            BindValue::Float(v) => q = q.bind(*v),
            BindValue::Text(v) => q = q.bind(v.as_str()),
            BindValue::Timestamp(v) => q = q.bind(*v),
        }
    }
    q
}

/// Escape `LIKE` wildcards so user text matches literally.
pub(crate) fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn empty_filter_only_restricts_active() {
        let (clause, values, next) = build_crop_filter(None, &CropFilter::default());
        assert_eq!(clause, "WHERE is_active = true");
        assert!(values.is_empty());
        assert_eq!(next, 1);
    }

    #[test]
    fn blank_text_is_ignored() {
        let (clause, values, _) = build_crop_filter(Some("   "), &CropFilter::default());
        assert_eq!(clause, "WHERE is_active = true");
        assert!(values.is_empty());
    }

    #[test]
    fn text_reuses_one_placeholder() {
        let (clause, values, next) = build_crop_filter(Some("coffee"), &CropFilter::default());
        assert_eq!(clause.matches("$1").count(), 4);
        assert_eq!(values, vec![BindValue::Text("%coffee%".into())]);
        assert_eq!(next, 2);
    }

    #[test]
    fn filters_number_placeholders_in_order() {
        let filter = CropFilter {
            farmer_id: Some(7),
            status: Some(CropStatus::Mature),
            state: Some("Antioquia".into()),
            min_farm_size: Some(1.5),
            planting_date_from: Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()),
            ..CropFilter::default()
        };
        let (clause, values, next) = build_crop_filter(Some("cof"), &filter);
        assert!(clause.contains("farmer_id = $2"));
        assert!(clause.contains("status_id = $3"));
        assert!(clause.contains("state = $4"));
        assert!(clause.contains("farm_size >= $5"));
        assert!(clause.contains("planting_date >= $6"));
        assert_eq!(values.len(), 5);
        assert_eq!(values[2], BindValue::SmallInt(4));
        assert_eq!(next, 7);
    }

    #[test]
    fn like_wildcards_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }
}
