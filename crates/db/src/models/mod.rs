//! Row structs matching the database tables.
//!
//! Each row converts into its `farmchain-core` entity; values that cannot be
//! mapped back (unknown status ids, unexpected enum text) surface as
//! `CoreError::Infrastructure`.

pub mod crop;
pub mod farmer;

use farmchain_core::error::CoreError;

pub(crate) fn corrupt(column: &str, detail: impl std::fmt::Display) -> CoreError {
    CoreError::Infrastructure(format!("Unexpected value in column {column}: {detail}"))
}
