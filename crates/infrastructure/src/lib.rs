//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod http_initiative_api;
mod in_memory_access_data_cache;
mod in_memory_initiative_store;

pub use http_initiative_api::{HttpInitiativeApi, HttpInitiativeApiConfig};
pub use in_memory_access_data_cache::InMemoryAccessDataCache;
pub use in_memory_initiative_store::InMemoryInitiativeStore;
