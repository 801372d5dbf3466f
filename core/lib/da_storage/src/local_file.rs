//! Archive backend keeping one file per payload, named by the hex tree
//! hash, under a flat data directory.

use std::{io, path::PathBuf};

use anyhow::Context as _;
use async_trait::async_trait;
use meridian_config::DaStorageConfig;
use meridian_da_primitives::{hash::tree_hash, BlobHash};

use crate::{ExpirationPolicy, StorageError, StorageReader, StorageResult, StorageService};

#[derive(Debug)]
pub struct LocalFileStorageService {
    data_dir: PathBuf,
}

impl LocalFileStorageService {
    pub async fn new(config: &DaStorageConfig) -> StorageResult<Self> {
        let data_dir = PathBuf::from(&config.data_dir);
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("cannot create data dir {}", data_dir.display()))?;
        Ok(Self { data_dir })
    }

    fn entry_path(&self, hash: &BlobHash) -> PathBuf {
        self.data_dir.join(hex::encode(hash.0))
    }
}

#[async_trait]
impl StorageReader for LocalFileStorageService {
    async fn get_by_hash(&self, hash: BlobHash) -> StorageResult<Vec<u8>> {
        match tokio::fs::read(self.entry_path(&hash)).await {
            Ok(data) => Ok(data),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(StorageError::NotFound(hash)),
            Err(err) => Err(anyhow::Error::new(err)
                .context(format!("cannot read entry {hash}"))
                .into()),
        }
    }

    fn expiration_policy(&self) -> ExpirationPolicy {
        ExpirationPolicy::KeepForever
    }
}

#[async_trait]
impl StorageService for LocalFileStorageService {
    async fn put(&self, data: &[u8], _timeout: u64) -> StorageResult<()> {
        let hash = tree_hash(data);
        let path = self.entry_path(&hash);
        // Entries become visible only through the final rename.
        let tmp_path = path.with_extension("tmp");
        tokio::fs::write(&tmp_path, data)
            .await
            .with_context(|| format!("cannot write entry {hash}"))?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .with_context(|| format!("cannot finalize entry {hash}"))?;
        Ok(())
    }

    async fn sync(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn close(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> StorageResult<()> {
        let metadata = tokio::fs::metadata(&self.data_dir)
            .await
            .with_context(|| format!("data dir {} is unreachable", self.data_dir.display()))?;
        if !metadata.is_dir() {
            return Err(anyhow::anyhow!(
                "data dir {} is not a directory",
                self.data_dir.display()
            )
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    async fn store_in(dir: &tempfile::TempDir) -> LocalFileStorageService {
        let config = DaStorageConfig {
            data_dir: dir.path().to_str().unwrap().into(),
        };
        LocalFileStorageService::new(&config).await.unwrap()
    }

    #[tokio::test]
    async fn entries_round_trip_through_the_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;
        let data = vec![0x42; 1000];
        store.put(&data, 0).await.unwrap();
        assert_eq!(store.get_by_hash(tree_hash(&data)).await.unwrap(), data);
        store.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn missing_entry_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;
        assert_matches!(
            store.get_by_hash(BlobHash::repeat_byte(7)).await,
            Err(StorageError::NotFound(_))
        );
    }

    #[tokio::test]
    async fn missing_data_dir_fails_the_health_check() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;
        drop(dir);
        assert!(store.health_check().await.is_err());
    }
}
