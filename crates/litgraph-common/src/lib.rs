//! litgraph-common — Shared types, errors, and config used across all litgraph crates.

pub mod error;
pub mod ids;
pub mod entities;
pub mod scoring;
pub mod config;

pub use error::{CoreError, Result};
pub use ids::PaperId;
