use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::domain::user::RecordCollection;

/// Durable home of the record collection.
#[async_trait]
pub trait RecordPersistence: Send + Sync {
    async fn load(&self) -> Result<RecordCollection>;

    /// Writes the whole collection; either every record lands or none do.
    async fn save(&self, records: &RecordCollection) -> Result<()>;
}

/// Stores the collection as a single JSON document, replaced atomically on save.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl RecordPersistence for JsonFileStore {
    async fn load(&self) -> Result<RecordCollection> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no user data found, starting empty");
                return Ok(RecordCollection::new());
            }
            Err(err) => {
                return Err(anyhow!(
                    "failed to read {}: {}",
                    self.path.display(),
                    err
                ))
            }
        };

        let records: RecordCollection = serde_json::from_slice(&bytes)
            .map_err(|err| anyhow!("invalid user data in {}: {}", self.path.display(), err))?;
        let records = records
            .with_reconciled_counter()
            .map_err(|err| anyhow!("invalid user data in {}: {}", self.path.display(), err))?;

        info!(
            path = %self.path.display(),
            users = records.users().len(),
            next_infraction_id = records.next_infraction_id(),
            "user data loaded"
        );
        Ok(records)
    }

    async fn save(&self, records: &RecordCollection) -> Result<()> {
        let body = serde_json::to_vec_pretty(records)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        // Contents must be on disk before the rename makes them visible.
        let staging = self.staging_path();
        write_synced(&staging, &body)
            .await
            .map_err(|err| anyhow!("failed to write {}: {}", staging.display(), err))?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(|err| anyhow!("failed to replace {}: {}", self.path.display(), err))?;

        debug!(path = %self.path.display(), bytes = body.len(), "user data saved");
        Ok(())
    }
}

async fn write_synced(path: &Path, body: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(body).await?;
    file.sync_all().await
}
