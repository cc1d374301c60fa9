//! File-backed credential caches.
//!
//! Each cache mirrors a single file under a parent directory (the user's home
//! by default). The in-memory copy is authoritative once populated: the file is
//! only read while memory is empty, and only rewritten when the content changes.

use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::client::token::AccessToken;
use crate::error::OxApiError;

pub const DEFAULT_TOKEN_FILE: &str = ".oxApiToken";
pub const DEFAULT_CUSTOMER_FILE: &str = ".oxApiCustomer";

pub type TokenCache = JsonFileCache<AccessToken>;
pub type CustomerCredsCache = JsonFileCache<serde_json::Value>;
pub type SharedCache<T> = Arc<Mutex<JsonFileCache<T>>>;

/// Lock a shared cache. A poisoned lock still holds a usable mirror.
pub(crate) fn lock_cache<T>(cache: &SharedCache<T>) -> MutexGuard<'_, JsonFileCache<T>> {
    cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn cache_error(path: &Path, source: std::io::Error) -> OxApiError {
    OxApiError::CacheIo {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(Debug)]
pub struct StringFileCache {
    path: PathBuf,
    content: Option<String>,
}

impl StringFileCache {
    pub fn new(parent_dir: Option<&Path>, filename: &str) -> Self {
        let parent = parent_dir.map(Path::to_path_buf).unwrap_or_else(home_dir);
        let path = std::path::absolute(&parent)
            .unwrap_or(parent)
            .join(filename);
        Self {
            path,
            content: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&mut self) -> Result<Option<&str>, OxApiError> {
        if self.content.is_none() {
            match std::fs::read_to_string(&self.path) {
                Ok(data) => self.content = Some(data),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(cache_error(&self.path, e)),
            }
        }
        Ok(self.content.as_deref())
    }

    pub fn set(&mut self, content: String) -> Result<&str, OxApiError> {
        if self.content.as_deref() != Some(content.as_str()) {
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| cache_error(&self.path, e))?;
            }
            std::fs::write(&self.path, &content).map_err(|e| cache_error(&self.path, e))?;
            tracing::debug!("Wrote cache file {}", self.path.display());
        }
        Ok(self.content.insert(content).as_str())
    }

    /// Forget the cached content and remove the backing file.
    pub fn clear(&mut self) -> Result<(), OxApiError> {
        self.content = None;
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(cache_error(&self.path, e)),
        }
    }
}

/// A [`StringFileCache`] whose payload is JSON-encoded `T`.
#[derive(Debug)]
pub struct JsonFileCache<T> {
    inner: StringFileCache,
    _payload: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned> JsonFileCache<T> {
    pub fn new(parent_dir: Option<&Path>, filename: &str) -> Self {
        Self {
            inner: StringFileCache::new(parent_dir, filename),
            _payload: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    pub fn get(&mut self) -> Result<Option<T>, OxApiError> {
        let path = self.inner.path().to_path_buf();
        match self.inner.get()? {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str(raw)
                .map(Some)
                .map_err(|e| cache_error(&path, std::io::Error::new(ErrorKind::InvalidData, e))),
            _ => Ok(None),
        }
    }

    pub fn set(&mut self, value: &T) -> Result<(), OxApiError> {
        let encoded = serde_json::to_string(value).map_err(|e| {
            cache_error(self.inner.path(), std::io::Error::new(ErrorKind::InvalidData, e))
        })?;
        self.inner.set(encoded)?;
        Ok(())
    }

    pub fn clear(&mut self) -> Result<(), OxApiError> {
        self.inner.clear()
    }
}

/// Holds at most one cache per kind for the lifetime of the store.
///
/// Build one at process start and pass it by reference. The first request for
/// a kind fixes its directory; later requests get the same instance back no
/// matter which directory they name.
#[derive(Default)]
pub struct CacheStore {
    token: OnceLock<SharedCache<AccessToken>>,
    customer: OnceLock<SharedCache<serde_json::Value>>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token_cache(&self, parent_dir: Option<&Path>) -> SharedCache<AccessToken> {
        Arc::clone(self.token.get_or_init(|| {
            Arc::new(Mutex::new(TokenCache::new(parent_dir, DEFAULT_TOKEN_FILE)))
        }))
    }

    pub fn customer_cache(&self, parent_dir: Option<&Path>) -> SharedCache<serde_json::Value> {
        Arc::clone(self.customer.get_or_init(|| {
            Arc::new(Mutex::new(CustomerCredsCache::new(
                parent_dir,
                DEFAULT_CUSTOMER_FILE,
            )))
        }))
    }
}
