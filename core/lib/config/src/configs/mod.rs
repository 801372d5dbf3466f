pub use self::{da_cache::DaCacheConfig, da_storage::DaStorageConfig};

pub mod da_cache;
pub mod da_storage;
