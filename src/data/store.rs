//! Flat-file JSON store
//!
//! One collection per file, stored as a JSON array and always read and
//! written whole. Mutations run under a per-store lock so that two
//! read-modify-write cycles in this process never interleave. Writes go
//! to a temp file that is renamed over the target.
//!
//! Another process writing the same file is not coordinated with; the
//! last writer wins.

use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use crate::error::AppError;
use crate::metrics::{STORE_OPERATION_DURATION_SECONDS, STORE_OPERATIONS_TOTAL};

/// A whole-collection JSON file
pub struct JsonStore<T> {
    path: PathBuf,
    /// Collection name used in logs and metrics (e.g. "posts")
    collection: &'static str,
    write_lock: Mutex<()>,
    _records: PhantomData<fn() -> T>,
}

impl<T> JsonStore<T>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    /// Open a collection file, creating it (and its directory) as `[]` if absent
    pub async fn open(path: impl Into<PathBuf>, collection: &'static str) -> Result<Self, AppError> {
        let path = path.into();

        if let Some(parent) = non_empty_parent(&path) {
            tokio::fs::create_dir_all(parent).await?;
        }

        if !tokio::fs::try_exists(&path).await? {
            tokio::fs::write(&path, "[]").await?;
            tracing::info!(collection, path = %path.display(), "Created empty collection file");
        }

        Ok(Self {
            path,
            collection,
            write_lock: Mutex::new(()),
            _records: PhantomData,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record
    ///
    /// A missing or blank file reads as an empty collection. Malformed
    /// JSON is returned as [`AppError::Serialization`].
    pub async fn load(&self) -> Result<Vec<T>, AppError> {
        let _timer = STORE_OPERATION_DURATION_SECONDS
            .with_label_values(&["load", self.collection])
            .start_timer();
        STORE_OPERATIONS_TOTAL
            .with_label_values(&["load", self.collection])
            .inc();

        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(error.into()),
        };

        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        serde_json::from_slice(&raw).map_err(|error| {
            tracing::error!(
                collection = self.collection,
                path = %self.path.display(),
                %error,
                "Collection file is not valid JSON"
            );
            AppError::Serialization(error)
        })
    }

    /// Overwrite the whole collection
    ///
    /// Does not take the mutation lock; load-modify-save sequences must
    /// go through [`JsonStore::mutate`].
    pub async fn save(&self, records: &[T]) -> Result<(), AppError> {
        let _timer = STORE_OPERATION_DURATION_SECONDS
            .with_label_values(&["save", self.collection])
            .start_timer();
        STORE_OPERATIONS_TOTAL
            .with_label_values(&["save", self.collection])
            .inc();

        let payload = serde_json::to_vec_pretty(records)?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let dir = non_empty_parent(&path).unwrap_or_else(|| Path::new("."));
            let mut file = tempfile::NamedTempFile::new_in(dir)?;
            file.write_all(&payload)?;
            file.as_file().sync_all()?;
            file.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| AppError::Internal(e.into()))??;

        tracing::debug!(
            collection = self.collection,
            records = records.len(),
            "Collection written"
        );
        Ok(())
    }

    /// Load the collection and hand it to a read-only view
    pub async fn read<R>(&self, view: impl FnOnce(Vec<T>) -> R) -> Result<R, AppError> {
        let records = self.load().await?;
        Ok(view(records))
    }

    /// Load, apply `change`, and write back if it succeeded
    ///
    /// The lock is held for the whole cycle. When `change` returns an
    /// error nothing is written and the file keeps its prior contents.
    pub async fn mutate<R>(
        &self,
        change: impl FnOnce(&mut Vec<T>) -> Result<R, AppError>,
    ) -> Result<R, AppError> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.load().await?;
        let outcome = change(&mut records)?;
        self.save(&records).await?;

        Ok(outcome)
    }
}

fn non_empty_parent(path: &Path) -> Option<&Path> {
    path.parent().filter(|parent| !parent.as_os_str().is_empty())
}
