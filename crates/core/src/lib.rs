//! Domain logic for the FarmChain crop registry.
//!
//! Everything here is free of HTTP and SQL concerns: entity types, input
//! validation, the crop lifecycle, pure query helpers, the store traits the
//! persistence layer implements, and the services that tie them together.

pub mod clock;
pub mod crop;
pub mod error;
pub mod farmer;
pub mod lifecycle;
pub mod query;
pub mod service;
pub mod status;
pub mod store;
pub mod taxonomy;
pub mod types;
pub mod validation;
