//! courier domain crate
//!
//! This crate contains the core domain logic following hexagonal architecture:
//! - `model`: Domain entities and value objects
//! - `ports`: Trait definitions for external dependencies (adapters)
//! - `cache`: Feed list caching policy
//! - `text`: Text sanitizing and measuring
//! - `usecases`: The fetch, publish and retention cycles and their orchestration

pub mod cache;
pub mod model;
pub mod ports;
pub mod text;
pub mod usecases;

#[cfg(test)]
pub(crate) mod testing;

pub use model::*;
pub use ports::*;
