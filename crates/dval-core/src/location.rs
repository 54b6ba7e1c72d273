//! `s3://bucket/key` locations and filename extraction.

use crate::config::remove_trailing_slash;
use crate::error::CheckError;

pub const S3_PREFIX: &str = "s3://";

/// A bucket plus key, as written in manifests and on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Location {
    pub bucket: String,
    /// Key (or key prefix) within the bucket; may be empty.
    pub key: String,
}

impl S3Location {
    /// Parse `s3://bucket/some/key` or `bucket/some/key`. Trailing slashes are dropped.
    pub fn parse(location: &str) -> Result<Self, CheckError> {
        let trimmed = location.trim();
        let rest = remove_trailing_slash(trimmed.strip_prefix(S3_PREFIX).unwrap_or(trimmed));
        let (bucket, key) = match rest.split_once('/') {
            Some((b, k)) => (b, k),
            None => (rest, ""),
        };
        if bucket.is_empty() {
            return Err(CheckError::MalformedInput(format!(
                "no bucket in location {:?}",
                location
            )));
        }
        Ok(Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }

    /// Last path segment of the key, used as the local file name.
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or("")
    }
}

impl std::fmt::Display for S3Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}/{}", S3_PREFIX, self.bucket, self.key)
    }
}

/// Last non-empty path segment of a URL or plain path, ignoring any query string.
///
/// Returns `None` for empty paths and `.`/`..` segments.
pub fn basename(path_or_url: &str) -> Option<String> {
    let path = match url::Url::parse(path_or_url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => path_or_url.split('?').next().unwrap_or("").to_string(),
    };
    let segment = path.split('/').filter(|s| !s.is_empty()).last()?;
    if segment == "." || segment == ".." {
        return None;
    }
    Some(segment.to_string())
}
