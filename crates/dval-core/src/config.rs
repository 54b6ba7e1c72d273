use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::checksum::DigestAlgorithm;

/// Timeouts applied to every HTTP call (object store, MATCH, CTDC, IndexD).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    /// Upper bound for a whole transfer, including streaming large objects.
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 15,
            timeout_secs: 3600,
        }
    }
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Object store backend: S3-compatible HTTP endpoint or a local directory tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Http,
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Endpoint template for the http backend; `{bucket}` is replaced by the bucket name.
    pub endpoint: String,
    /// Root directory for the local backend; each bucket is a subdirectory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    /// Environment variable holding a bearer token for the http backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Http,
            endpoint: "https://{bucket}.s3.amazonaws.com".to_string(),
            root: None,
            token_env: None,
        }
    }
}

/// Settings for the MATCH cross-validation commands (`[match]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Treatment arm ids as MATCH knows them, e.g. `EAY131-Z1D`.
    pub arms: Vec<String>,
    /// Key for the patient identifier cipher.
    pub cipher_key: i64,
    #[serde(default)]
    pub use_prod: bool,
    /// MATCH API base URL (treatment arms, patients, signed URLs).
    pub match_base_url: String,
    /// CTDC GraphQL endpoint validated by `match-metadata`.
    pub api_url: String,
    /// Environment variable holding the MATCH authorization token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
    /// Secret holding the Okta client credentials; only used in error messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
    /// Okta authorization URL; only used in error messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub okta_auth_url: Option<String>,
}

fn default_token_env() -> String {
    "MATCH_TOKEN".to_string()
}

impl MatchConfig {
    /// MATCH base URL without trailing slashes.
    pub fn base_url(&self) -> &str {
        remove_trailing_slash(&self.match_base_url)
    }

    /// Read the MATCH token from the configured environment variable.
    pub fn token(&self) -> Result<String> {
        match std::env::var(&self.token_env) {
            Ok(t) if !t.trim().is_empty() => Ok(t.trim().to_string()),
            _ => {
                let mut msg = format!(
                    "failed to obtain a token: environment variable {} is not set",
                    self.token_env
                );
                if let Some(url) = &self.okta_auth_url {
                    msg.push_str(&format!(" (request one from {})", url));
                }
                if let Some(secret) = &self.secret_name {
                    msg.push_str(&format!(" using credentials in secret {}", secret));
                }
                anyhow::bail!(msg)
            }
        }
    }
}

/// Strip any trailing `/` characters.
pub fn remove_trailing_slash(s: &str) -> &str {
    s.trim_end_matches('/')
}

/// Global configuration loaded from `~/.config/dval/config.toml` or `--config`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DvalConfig {
    /// Directory receiving reports, status files and scratch copies.
    pub output_dir: PathBuf,
    /// Digest used when integrity tags disagree.
    pub digest_algorithm: DigestAlgorithm,
    /// Chunk size for streaming digests.
    pub digest_chunk_bytes: usize,
    /// Block size for manifest integrity MD5s (`integrity --block-size` overrides).
    pub integrity_block_bytes: usize,
    /// IndexD download endpoint; GUIDs are appended to it.
    pub indexd_base_url: String,
    /// Log running totals every N items.
    pub progress_every: usize,
    pub http: HttpConfig,
    pub storage: StorageConfig,
    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    pub match_api: Option<MatchConfig>,
}

impl Default for DvalConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("tmp"),
            digest_algorithm: DigestAlgorithm::Md5,
            digest_chunk_bytes: crate::checksum::BUF_SIZE,
            integrity_block_bytes: 1_000_000,
            indexd_base_url: "https://nci-crdc-staging.datacommons.io/user/data/download/dg.4DFC/"
                .to_string(),
            progress_every: 25,
            http: HttpConfig::default(),
            storage: StorageConfig::default(),
            match_api: None,
        }
    }
}

impl DvalConfig {
    /// The `[match]` section, or an error naming the missing section.
    pub fn match_config(&self) -> Result<&MatchConfig> {
        self.match_api
            .as_ref()
            .context("config has no [match] section (required by MATCH validators)")
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("dval")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<DvalConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = DvalConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from(&path)
}

/// Load configuration from an explicit path (`--config`).
pub fn load_from(path: &Path) -> Result<DvalConfig> {
    let data =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    let cfg: DvalConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = DvalConfig::default();
        assert_eq!(cfg.output_dir, PathBuf::from("tmp"));
        assert_eq!(cfg.digest_algorithm, DigestAlgorithm::Md5);
        assert_eq!(cfg.integrity_block_bytes, 1_000_000);
        assert_eq!(cfg.http.connect_timeout_secs, 15);
        assert_eq!(cfg.storage.backend, StorageBackend::Http);
        assert!(cfg.match_api.is_none());
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = DvalConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: DvalConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.output_dir, cfg.output_dir);
        assert_eq!(parsed.digest_chunk_bytes, cfg.digest_chunk_bytes);
        assert_eq!(parsed.storage.endpoint, cfg.storage.endpoint);
        assert_eq!(parsed.indexd_base_url, cfg.indexd_base_url);
    }

    #[test]
    fn config_toml_partial_uses_defaults() {
        let toml = r#"
            output_dir = "/var/tmp/dval"

            [storage]
            backend = "local"
            root = "/data/buckets"
        "#;
        let cfg: DvalConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.output_dir, PathBuf::from("/var/tmp/dval"));
        assert_eq!(cfg.storage.backend, StorageBackend::Local);
        assert_eq!(cfg.storage.root.as_deref(), Some(Path::new("/data/buckets")));
        assert_eq!(cfg.storage.endpoint, StorageConfig::default().endpoint);
        assert_eq!(cfg.http.timeout_secs, 3600);
        assert_eq!(cfg.progress_every, 25);
    }

    #[test]
    fn config_toml_match_section() {
        let toml = r#"
            digest_algorithm = "sha256"

            [match]
            arms = ["EAY131-Z1D", "EAY131-Q"]
            cipher_key = 7
            match_base_url = "https://match.example.org/api/v1/"
            api_url = "https://ctdc.example.org/v1/graphql/"
            okta_auth_url = "https://okta.example.org/token"
        "#;
        let cfg: DvalConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.digest_algorithm, DigestAlgorithm::Sha256);
        let m = cfg.match_config().unwrap();
        assert_eq!(m.arms, vec!["EAY131-Z1D", "EAY131-Q"]);
        assert_eq!(m.cipher_key, 7);
        assert!(!m.use_prod);
        assert_eq!(m.token_env, "MATCH_TOKEN");
        assert_eq!(m.base_url(), "https://match.example.org/api/v1");
    }

    #[test]
    fn missing_match_section_is_an_error() {
        let cfg = DvalConfig::default();
        let err = cfg.match_config().unwrap_err();
        assert!(err.to_string().contains("[match]"));
    }

    #[test]
    fn missing_token_mentions_env_var() {
        let m = MatchConfig {
            arms: vec![],
            cipher_key: 1,
            use_prod: false,
            match_base_url: "https://m".to_string(),
            api_url: "https://c".to_string(),
            token_env: "DVAL_TEST_TOKEN_THAT_IS_NEVER_SET".to_string(),
            secret_name: None,
            okta_auth_url: Some("https://okta.example.org".to_string()),
        };
        let err = m.token().unwrap_err().to_string();
        assert!(err.contains("DVAL_TEST_TOKEN_THAT_IS_NEVER_SET"));
        assert!(err.contains("https://okta.example.org"));
    }

    #[test]
    fn trailing_slashes_removed() {
        assert_eq!(remove_trailing_slash("s3://bucket/path//"), "s3://bucket/path");
        assert_eq!(remove_trailing_slash("bucket"), "bucket");
    }
}
