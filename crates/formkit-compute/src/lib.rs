//! Compute engine and compute cache for computed form fields.

mod cache;
mod engine;

pub use cache::{ComputeCache, DEFAULT_CACHE_CAPACITY, dependency_keys};
pub use engine::{ComputeResult, DEFAULT_PRECISION, DEFAULT_SEPARATOR, calculate};
