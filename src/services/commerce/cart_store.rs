use async_trait::async_trait;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error};
use uuid::Uuid;

use crate::{errors::ServiceError, models::Cart};

/// Profile key the storefront saves its single cart under.
pub const DEFAULT_CART_KEY: &str = "nowa-cart";

/// Durable storage for carts, keyed by profile.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// `Ok(None)` when nothing has been saved under `key`.
    async fn load(&self, key: &str) -> Result<Option<Cart>, ServiceError>;
    async fn save(&self, key: &str, cart: &Cart) -> Result<(), ServiceError>;
    async fn remove(&self, key: &str) -> Result<(), ServiceError>;
}

fn validate_key(key: &str) -> Result<(), ServiceError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ServiceError::ValidationError(format!(
            "Invalid cart key '{}'",
            key
        )))
    }
}

/// One JSON document per profile key under a directory.
#[derive(Debug, Clone)]
pub struct FileCartStore {
    dir: PathBuf,
}

impl FileCartStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, ServiceError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

#[async_trait]
impl CartStore for FileCartStore {
    async fn load(&self, key: &str) -> Result<Option<Cart>, ServiceError> {
        let path = self.path_for(key)?;
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                error!(path = %path.display(), "Failed to read cart: {}", e);
                return Err(ServiceError::CartStorage(e.to_string()));
            }
        };

        let cart = serde_json::from_slice(&raw)?;
        Ok(Some(cart))
    }

    async fn save(&self, key: &str, cart: &Cart) -> Result<(), ServiceError> {
        let path = self.path_for(key)?;
        let tmp = self
            .dir
            .join(format!(".{}.json.{}.tmp", key, Uuid::new_v4().simple()));
        let body = serde_json::to_vec_pretty(cart)?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ServiceError::CartStorage(e.to_string()))?;
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| ServiceError::CartStorage(e.to_string()))?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            error!(path = %path.display(), "Failed to replace cart: {}", e);
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(ServiceError::CartStorage(e.to_string()));
        }

        debug!(key, lines = cart.len(), "Saved cart");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), ServiceError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ServiceError::CartStorage(e.to_string())),
        }
    }
}

/// Process-local store, used by tests and ephemeral deployments.
#[derive(Debug, Default)]
pub struct InMemoryCartStore {
    carts: DashMap<String, Cart>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn load(&self, key: &str) -> Result<Option<Cart>, ServiceError> {
        validate_key(key)?;
        Ok(self.carts.get(key).map(|c| c.value().clone()))
    }

    async fn save(&self, key: &str, cart: &Cart) -> Result<(), ServiceError> {
        validate_key(key)?;
        self.carts.insert(key.to_string(), cart.clone());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), ServiceError> {
        validate_key(key)?;
        self.carts.remove(key);
        Ok(())
    }
}
