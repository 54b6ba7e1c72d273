//! Object store capability: metadata lookup, prefix listing, content streaming.
//!
//! Validators only see `dyn ObjectStore`; which backend serves a bucket is a
//! config decision made once in `Buckets`.

mod http;
mod list;
mod local;
#[cfg(test)]
pub(crate) mod memory;

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::{StorageBackend, StorageConfig};
use crate::error::CheckError;
use crate::http::HttpClient;

pub use self::http::HttpStore;
pub use self::local::LocalStore;

/// Identity and integrity metadata of one stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
    /// Provider-computed integrity tag (S3 ETag). `None` when the backend has none.
    pub tag: Option<String>,
}

pub trait ObjectStore: Send + Sync {
    /// Bucket (or root) this store serves; used in messages.
    fn bucket(&self) -> &str;

    /// Metadata for `key`; `CheckError::NotFound` when it does not exist.
    fn head(&self, key: &str) -> Result<ObjectInfo, CheckError>;

    /// All objects whose key starts with `prefix`, in key order.
    fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>, CheckError>;

    /// Stream the full content of `key` into `sink`; returns bytes written.
    fn stream(&self, key: &str, sink: &mut dyn Write) -> Result<u64, CheckError>;
}

/// Store per bucket name, created on first use and cached for the run.
pub struct Buckets {
    storage: StorageConfig,
    http: HttpClient,
    stores: HashMap<String, Arc<dyn ObjectStore>>,
}

impl Buckets {
    /// Build the registry. A bearer token named by `storage.token_env` is read here.
    pub fn new(storage: &StorageConfig, http: HttpClient) -> Result<Self> {
        let http = match &storage.token_env {
            Some(var) => {
                let token = std::env::var(var)
                    .with_context(|| format!("storage token variable {} is not set", var))?;
                http.with_header("Authorization", &format!("Bearer {}", token.trim()))
            }
            None => http,
        };
        Ok(Self {
            storage: storage.clone(),
            http,
            stores: HashMap::new(),
        })
    }

    /// Registry with no backend config; only stores added via `insert` resolve.
    pub fn empty() -> Self {
        Self {
            storage: StorageConfig {
                backend: StorageBackend::Local,
                root: None,
                ..StorageConfig::default()
            },
            http: HttpClient::new(&Default::default()),
            stores: HashMap::new(),
        }
    }

    /// Register a store for `bucket` explicitly (tests, alternate backends).
    pub fn insert(&mut self, bucket: &str, store: Arc<dyn ObjectStore>) {
        self.stores.insert(bucket.to_string(), store);
    }

    /// Store serving `bucket`.
    pub fn get(&mut self, bucket: &str) -> Result<Arc<dyn ObjectStore>, CheckError> {
        if let Some(store) = self.stores.get(bucket) {
            return Ok(Arc::clone(store));
        }
        let store: Arc<dyn ObjectStore> = match self.storage.backend {
            StorageBackend::Http => Arc::new(HttpStore::new(
                &self.storage.endpoint,
                bucket,
                self.http.clone(),
            )?),
            StorageBackend::Local => {
                let root = self.storage.root.as_ref().ok_or_else(|| {
                    CheckError::MalformedInput(format!(
                        "no store for bucket {} (storage.root is not configured)",
                        bucket
                    ))
                })?;
                Arc::new(LocalStore::new(local::join_under(root, bucket)?, bucket))
            }
        };
        tracing::debug!(bucket, backend = ?self.storage.backend, "opened object store");
        self.stores.insert(bucket.to_string(), Arc::clone(&store));
        Ok(store)
    }
}
