//! Repository layer over the store gateway.
//!
//! # Responsibility
//! - Keep SQL text and row mapping for image records in one place.
//! - Isolate reconciliation logic from store details.

pub mod image_repo;
