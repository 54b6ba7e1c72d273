//! S3-compatible object store over plain HTTP(S).
//!
//! HEAD for size/ETag, GET for content, ListObjectsV2 for prefix listings.
//! Authentication beyond an optional bearer header is left to the endpoint
//! (public buckets, presigning gateways, VPC endpoints).

use std::io::Write;

use url::Url;

use super::list::parse_list_page;
use super::{ObjectInfo, ObjectStore};
use crate::error::CheckError;
use crate::http::HttpClient;

pub struct HttpStore {
    bucket: String,
    base: Url,
    http: HttpClient,
}

impl HttpStore {
    /// `endpoint` may contain `{bucket}`, e.g. `https://{bucket}.s3.amazonaws.com`
    /// (virtual-hosted) or `http://127.0.0.1:9000/{bucket}` (path-style).
    pub fn new(endpoint: &str, bucket: &str, http: HttpClient) -> Result<Self, CheckError> {
        let raw = endpoint.replace("{bucket}", bucket);
        let base = Url::parse(&raw)
            .map_err(|e| CheckError::MalformedInput(format!("endpoint {:?}: {}", raw, e)))?;
        if base.cannot_be_a_base() {
            return Err(CheckError::MalformedInput(format!(
                "endpoint {:?} cannot carry object paths",
                raw
            )));
        }
        Ok(Self {
            bucket: bucket.to_string(),
            base,
            http,
        })
    }

    fn object_url(&self, key: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            segments.extend(key.split('/'));
        }
        url
    }

    fn list_url(&self, prefix: &str, token: Option<&str>) -> Url {
        let mut url = self.base.clone();
        {
            let mut q = url.query_pairs_mut();
            q.append_pair("list-type", "2");
            q.append_pair("prefix", prefix);
            if let Some(t) = token {
                q.append_pair("continuation-token", t);
            }
        }
        url
    }

    fn location(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key)
    }
}

impl ObjectStore for HttpStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn head(&self, key: &str) -> Result<ObjectInfo, CheckError> {
        let head = self
            .http
            .head(self.object_url(key).as_str())
            .map_err(|e| match e {
                CheckError::NotFound(_) => CheckError::NotFound(self.location(key)),
                other => other,
            })?;
        let size = head.content_length.ok_or_else(|| {
            CheckError::Decode(format!("no Content-Length for {}", self.location(key)))
        })?;
        Ok(ObjectInfo {
            key: key.to_string(),
            size,
            tag: head.etag,
        })
    }

    fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>, CheckError> {
        let mut out = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let url = self.list_url(prefix, token.as_deref());
            let body = self.http.get_bytes(url.as_str())?;
            let xml = String::from_utf8_lossy(&body);
            let page = parse_list_page(&xml)?;
            tracing::debug!(
                bucket = %self.bucket,
                prefix,
                objects = page.objects.len(),
                truncated = page.next_token.is_some(),
                "listed page"
            );
            out.extend(page.objects);
            match page.next_token {
                Some(t) => token = Some(t),
                None => break,
            }
        }
        Ok(out)
    }

    fn stream(&self, key: &str, sink: &mut dyn Write) -> Result<u64, CheckError> {
        self.http
            .get_into(self.object_url(key).as_str(), sink)
            .map_err(|e| match e {
                CheckError::NotFound(_) => CheckError::NotFound(self.location(key)),
                other => other,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(endpoint: &str) -> HttpStore {
        HttpStore::new(endpoint, "trial-data", HttpClient::new(&Default::default())).unwrap()
    }

    #[test]
    fn virtual_hosted_object_url() {
        let s = store("https://{bucket}.s3.amazonaws.com");
        assert_eq!(
            s.object_url("MSN1/file one.bam").as_str(),
            "https://trial-data.s3.amazonaws.com/MSN1/file%20one.bam"
        );
    }

    #[test]
    fn path_style_object_url() {
        let s = store("http://127.0.0.1:9000/{bucket}/");
        assert_eq!(
            s.object_url("a/b.vcf").as_str(),
            "http://127.0.0.1:9000/trial-data/a/b.vcf"
        );
    }

    #[test]
    fn list_url_with_token() {
        let s = store("http://127.0.0.1:9000/{bucket}");
        let url = s.list_url("runs/", Some("tok+1"));
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:9000/trial-data?list-type=2&prefix=runs%2F&continuation-token=tok%2B1"
        );
    }

    #[test]
    fn bad_endpoint_rejected() {
        assert!(HttpStore::new("not a url", "b", HttpClient::new(&Default::default())).is_err());
    }
}
