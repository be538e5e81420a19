//! Image inventory domain model.
//!
//! # Responsibility
//! - Define the record shape shared by runtime, store and manifest paths.
//!
//! # Invariants
//! - Records are created per operation and never cached across operations.

pub mod image;
