use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::StoreBackend;

/// The credential issued for one Spotify user. At most one per id; a new
/// login by the same user replaces the previous record wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub id: String,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("token store unavailable: {0}")]
    Unavailable(#[from] std::io::Error),

    #[error("token store holds a corrupt record: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Mapping from Spotify user id to the latest [`TokenRecord`]. Built once
/// at startup from [`StoreBackend`]; handlers never know which backing
/// they talk to.
pub enum TokenStore {
    Memory(Mutex<HashMap<String, TokenRecord>>),
    File(FileStore),
}

impl TokenStore {
    pub fn in_memory() -> Self {
        TokenStore::Memory(Mutex::new(HashMap::new()))
    }

    pub fn on_disk(dir: PathBuf) -> Result<Self, StoreError> {
        std::fs::create_dir_all(&dir)?;
        Ok(TokenStore::File(FileStore {
            dir,
            write_lock: Mutex::new(()),
        }))
    }

    pub fn from_backend(backend: &StoreBackend) -> Result<Self, StoreError> {
        match backend {
            StoreBackend::Memory => Ok(Self::in_memory()),
            StoreBackend::File(dir) => Self::on_disk(dir.clone()),
        }
    }

    /// Replace whatever record exists for `record.id`. Readers observe
    /// either the old record or the new one, never a mix.
    pub async fn upsert(&self, record: TokenRecord) -> Result<(), StoreError> {
        match self {
            TokenStore::Memory(map) => {
                map.lock().await.insert(record.id.clone(), record);
                Ok(())
            }
            TokenStore::File(files) => files.write(record).await,
        }
    }

    pub async fn get(&self, id: &str) -> Result<Option<TokenRecord>, StoreError> {
        match self {
            TokenStore::Memory(map) => Ok(map.lock().await.get(id).cloned()),
            TokenStore::File(files) => files.read(id),
        }
    }

    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        match self {
            TokenStore::Memory(map) => {
                map.lock().await.remove(id);
                Ok(())
            }
            TokenStore::File(files) => files.remove(id).await,
        }
    }

    /// Whether a record exists for `id`. This is the authorization check
    /// behind every user-scoped page.
    pub async fn exists(&self, id: &str) -> Result<bool, StoreError> {
        match self {
            TokenStore::Memory(map) => Ok(map.lock().await.contains_key(id)),
            TokenStore::File(files) => Ok(files.path_for(id).exists()),
        }
    }
}

/// One JSON file per user id. Writes go through a temp file and an atomic
/// rename, serialized behind a mutex; reads take no lock and see either
/// the previous or the renamed file.
pub struct FileStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    fn path_for(&self, id: &str) -> PathBuf {
        // Ids are caller-supplied; percent-encode so they cannot escape
        // the store directory or collide with the temp suffix.
        self.dir
            .join(format!("{}.json", urlencoding::encode(id)))
    }

    async fn write(&self, record: TokenRecord) -> Result<(), StoreError> {
        let path = self.path_for(&record.id);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(&record)?;

        let _guard = self.write_lock.lock().await;
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn read(&self, id: &str) -> Result<Option<TokenRecord>, StoreError> {
        let path = self.path_for(id);
        let data = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(serde_json::from_str(&data)?))
    }

    async fn remove(&self, id: &str) -> Result<(), StoreError> {
        let path = self.path_for(id);
        let _guard = self.write_lock.lock().await;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenStore::Memory(_) => f.write_str("TokenStore::Memory"),
            TokenStore::File(files) => f
                .debug_struct("TokenStore::File")
                .field("dir", &files.dir)
                .finish(),
        }
    }
}
