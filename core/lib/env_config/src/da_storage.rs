use meridian_config::configs::DaStorageConfig;

use crate::{envy_load, FromEnv};

impl FromEnv for DaStorageConfig {
    fn from_env() -> anyhow::Result<Self> {
        envy_load("da_storage", "MERIDIAN_DA_STORAGE_")
    }
}
