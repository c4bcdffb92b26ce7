//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async functions
//! that accept `&PgPool` as the first argument.

pub mod crop_repo;
pub mod farmer_repo;

pub use crop_repo::{CropRepo, CropStatisticsRows, StatusUpdateRepo, StatusWrite};
pub use farmer_repo::FarmerRepo;
