pub use crate::configs::{DaCacheConfig, DaStorageConfig};

pub mod configs;
