use serde::Deserialize;

/// Configuration of the local file DA payload store.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DaStorageConfig {
    /// Directory holding one file per stored payload.
    pub data_dir: String,
}

impl DaStorageConfig {
    /// Creates a config object suitable for use in unit tests.
    pub fn for_tests() -> DaStorageConfig {
        Self {
            data_dir: "/tmp/meridian-da-storage".into(),
        }
    }
}
