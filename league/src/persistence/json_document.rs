use super::PersistenceError;
use serde::{de::DeserializeOwned, Serialize};
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// A whole collection persisted as one pretty-printed JSON file.
///
/// Reads return the full document and writes replace it. A write goes to a
/// sibling temp file that is then renamed over the original, so a reader never
/// observes a half-written document. Nothing serialises concurrent
/// read-modify-write cycles; the last writer wins.
pub struct JsonDocument<T> {
    path: PathBuf,
    _phantom: PhantomData<T>,
}

impl<T> JsonDocument<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _phantom: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document. A missing file reads as the empty collection.
    pub async fn load(&self) -> Result<T, PersistenceError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(T::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the document with `data`.
    pub async fn save(&self, data: &T) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(data)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Write `initial` if the document does not exist yet. Returns whether it
    /// was created.
    pub async fn init_if_missing(&self, initial: &T) -> Result<bool, PersistenceError> {
        match tokio::fs::metadata(&self.path).await {
            Ok(_) => Ok(false),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.save(initial).await?;
                Ok(true)
            }
            Err(e) => Err(e.into()),
        }
    }
}
