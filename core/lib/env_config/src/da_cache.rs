use meridian_config::configs::DaCacheConfig;

use crate::{envy_load, FromEnv};

impl FromEnv for DaCacheConfig {
    fn from_env() -> anyhow::Result<Self> {
        envy_load("da_cache", "MERIDIAN_DA_CACHE_")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::EnvMutex;

    static MUTEX: EnvMutex = EnvMutex::new();

    #[test]
    fn da_cache_from_env() {
        let mut lock = MUTEX.lock();
        let config = r#"
            MERIDIAN_DA_CACHE_ENABLE=true
            MERIDIAN_DA_CACHE_URL="redis://127.0.0.1:6379"
            MERIDIAN_DA_CACHE_EXPIRATION_SEC=600
            MERIDIAN_DA_CACHE_KEY_CONFIG="27c5cebe1cbbb6b8a40900868a0a1d7cbcacbfca3d2b3e5b3b985b24e5b9bdce"
        "#;

        lock.set_env(config);

        let actual = DaCacheConfig::from_env().unwrap();
        let for_tests = DaCacheConfig::for_tests();

        assert_eq!(actual, for_tests);
    }
}
