//! Reconciliation services.
//!
//! # Responsibility
//! - Orchestrate runtime, store and manifest collaborators into use-cases.
//! - Keep CLI layers decoupled from store and runtime details.

pub mod plan;
pub mod reconciler;
