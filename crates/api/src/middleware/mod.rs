//! Request extractors.
//!
//! - [`auth::AuthFarmer`] -- the active farmer behind a Bearer token.

pub mod auth;
