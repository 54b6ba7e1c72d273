//! In-memory store for unit tests. Counts content reads so tests can assert
//! that a comparison never touched object bodies.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{ObjectInfo, ObjectStore};
use crate::error::CheckError;

pub(crate) struct MemoryStore {
    bucket: String,
    objects: Mutex<BTreeMap<String, (Vec<u8>, Option<String>)>>,
    streams: AtomicUsize,
}

impl MemoryStore {
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            objects: Mutex::new(BTreeMap::new()),
            streams: AtomicUsize::new(0),
        }
    }

    pub fn put(&self, key: &str, body: &[u8], tag: Option<&str>) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (body.to_vec(), tag.map(str::to_string)));
    }

    pub fn with(self, key: &str, body: &[u8], tag: Option<&str>) -> Self {
        self.put(key, body, tag);
        self
    }

    /// Number of `stream` calls so far.
    pub fn streams(&self) -> usize {
        self.streams.load(Ordering::SeqCst)
    }
}

impl ObjectStore for MemoryStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn head(&self, key: &str) -> Result<ObjectInfo, CheckError> {
        let objects = self.objects.lock().unwrap();
        let (body, tag) = objects
            .get(key)
            .ok_or_else(|| CheckError::NotFound(format!("s3://{}/{}", self.bucket, key)))?;
        Ok(ObjectInfo {
            key: key.to_string(),
            size: body.len() as u64,
            tag: tag.clone(),
        })
    }

    fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>, CheckError> {
        let objects = self.objects.lock().unwrap();
        Ok(objects
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, (body, tag))| ObjectInfo {
                key: k.clone(),
                size: body.len() as u64,
                tag: tag.clone(),
            })
            .collect())
    }

    fn stream(&self, key: &str, sink: &mut dyn Write) -> Result<u64, CheckError> {
        self.streams.fetch_add(1, Ordering::SeqCst);
        let body = {
            let objects = self.objects.lock().unwrap();
            objects
                .get(key)
                .map(|(b, _)| b.clone())
                .ok_or_else(|| CheckError::NotFound(format!("s3://{}/{}", self.bucket, key)))?
        };
        sink.write_all(&body)?;
        Ok(body.len() as u64)
    }
}
