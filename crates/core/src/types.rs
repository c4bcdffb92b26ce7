/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Result alias used throughout the domain and store layers.
pub type CoreResult<T> = Result<T, crate::error::CoreError>;

/// Milliseconds in one day, used by the day-based growth calculations.
pub const MILLIS_PER_DAY: i64 = 86_400_000;
