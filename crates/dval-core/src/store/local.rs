//! Directory-backed object store.
//!
//! Keys are `/`-separated paths under the bucket directory. A provider tag, if
//! any, lives in a `<key>.etag` sidecar next to the object; sidecars are never
//! listed as objects themselves.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use super::{ObjectInfo, ObjectStore};
use crate::checksum::BUF_SIZE;
use crate::error::CheckError;

const TAG_SUFFIX: &str = ".etag";

pub struct LocalStore {
    root: PathBuf,
    bucket: String,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>, bucket: &str) -> Self {
        Self {
            root: root.into(),
            bucket: bucket.to_string(),
        }
    }

    fn path_of(&self, key: &str) -> Result<PathBuf, CheckError> {
        join_under(&self.root, key)
    }

    fn info(&self, key: &str, path: &Path) -> Result<ObjectInfo, CheckError> {
        let meta = match fs::metadata(path) {
            Ok(m) if m.is_file() => m,
            Ok(_) => return Err(CheckError::NotFound(self.location(key))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(CheckError::NotFound(self.location(key)))
            }
            Err(e) => return Err(e.into()),
        };
        let mut sidecar = path.as_os_str().to_owned();
        sidecar.push(TAG_SUFFIX);
        let tag = match fs::read_to_string(PathBuf::from(sidecar)) {
            Ok(s) => Some(s.trim().trim_matches('"').to_string()).filter(|t| !t.is_empty()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        Ok(ObjectInfo {
            key: key.to_string(),
            size: meta.len(),
            tag,
        })
    }

    fn location(&self, key: &str) -> String {
        format!("{}/{}", self.root.display(), key)
    }

    fn walk(&self, dir: &Path, prefix: &str, out: &mut Vec<String>) -> io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let key = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{}/{}", prefix, name)
            };
            let ty = entry.file_type()?;
            if ty.is_dir() {
                self.walk(&entry.path(), &key, out)?;
            } else if ty.is_file() && !name.ends_with(TAG_SUFFIX) {
                out.push(key);
            }
        }
        Ok(())
    }
}

/// Join the `/`-separated `rel` onto `root`. Segments that could leave `root`
/// (`..`, absolute paths, drive prefixes) are rejected.
pub(crate) fn join_under(root: &Path, rel: &str) -> Result<PathBuf, CheckError> {
    let mut p = root.to_path_buf();
    for part in rel.split('/').filter(|s| !s.is_empty() && *s != ".") {
        let mut components = Path::new(part).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(c)), None) => p.push(c),
            _ => {
                return Err(CheckError::MalformedInput(format!(
                    "path {:?} escapes {}",
                    rel,
                    root.display()
                )))
            }
        }
    }
    Ok(p)
}

impl ObjectStore for LocalStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn head(&self, key: &str) -> Result<ObjectInfo, CheckError> {
        self.info(key, &self.path_of(key)?)
    }

    fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>, CheckError> {
        let mut keys = Vec::new();
        match self.walk(&self.root, "", &mut keys) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(CheckError::NotFound(self.root.display().to_string()))
            }
            Err(e) => return Err(e.into()),
        }
        keys.retain(|k| k.starts_with(prefix));
        keys.sort();
        keys.iter()
            .map(|k| self.info(k, &self.path_of(k)?))
            .collect()
    }

    fn stream(&self, key: &str, sink: &mut dyn Write) -> Result<u64, CheckError> {
        let path = self.path_of(key)?;
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(CheckError::NotFound(self.location(key)))
            }
            Err(e) => return Err(e.into()),
        };
        let mut reader = io::BufReader::with_capacity(BUF_SIZE, file);
        Ok(io::copy(&mut reader, sink)?)
    }
}
