/// Configuration management using figment
///
/// Loads configuration with this precedence (highest wins):
/// 1. Defaults (hardcoded)
/// 2. TOML file: pagesearch.toml (in working directory)
/// 3. Environment variables: prefixed PAGESEARCH_, nested with `__`
///    (e.g., PAGESEARCH_STORAGE__BUCKET=pages, PAGESEARCH_LOG_LEVEL=debug)

use figment::{
    Figment,
    providers::{Env, Format, Toml, Serialized},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use crate::errors::SearchError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Optional file path for JSON log output (in addition to stderr)
    #[serde(default)]
    pub log_file: Option<String>,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub search: SearchConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log_level: default_log_level(),
            log_file: None,
            server: ServerConfig::default(),
            embedding: EmbeddingConfig::default(),
            index: IndexConfig::default(),
            storage: StorageConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: default_bind_addr(),
        }
    }
}

/// Together AI embedding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_embedding_model() -> String {
    "BAAI/bge-base-en-v1.5".to_string()
}

fn default_embedding_base_url() -> String {
    "https://api.together.xyz/v1".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        EmbeddingConfig {
            api_key: None,
            model: default_embedding_model(),
            base_url: default_embedding_base_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Turbopuffer namespace holding the searchable pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Overrides the region-derived API host (used by tests and proxies)
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_region() -> String {
    "aws-us-east-1".to_string()
}

fn default_namespace() -> String {
    "searchable-whole-earth-page".to_string()
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig {
            api_key: None,
            region: default_region(),
            namespace: default_namespace(),
            base_url: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl IndexConfig {
    pub fn endpoint(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}.turbopuffer.com", self.region),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Cloudflare R2 bucket holding the page images.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub account_id: Option<String>,

    #[serde(default)]
    pub access_key_id: Option<String>,

    #[serde(default)]
    pub secret_access_key: Option<String>,

    #[serde(default)]
    pub bucket: Option<String>,

    /// Overrides the account-derived R2 endpoint
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Lifetime of presigned image URLs
    #[serde(default = "default_url_ttl_secs")]
    pub url_ttl_secs: u64,

    /// Per-object signing timeout
    #[serde(default = "default_sign_timeout_ms")]
    pub sign_timeout_ms: u64,
}

fn default_url_ttl_secs() -> u64 {
    3600
}

fn default_sign_timeout_ms() -> u64 {
    2_000
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            account_id: None,
            access_key_id: None,
            secret_access_key: None,
            bucket: None,
            endpoint: None,
            url_ttl_secs: default_url_ttl_secs(),
            sign_timeout_ms: default_sign_timeout_ms(),
        }
    }
}

impl StorageConfig {
    pub fn sign_timeout(&self) -> Duration {
        Duration::from_millis(self.sign_timeout_ms)
    }
}

/// Fusion and result-shaping knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// RRF smoothing constant
    #[serde(default = "default_rrf_k")]
    pub rrf_k: f64,

    #[serde(default = "default_match_count")]
    pub default_match_count: usize,

    #[serde(default = "default_max_match_count")]
    pub max_match_count: usize,

    /// Each provider is asked for match_count * overfetch_factor candidates
    #[serde(default = "default_overfetch_factor")]
    pub overfetch_factor: usize,

    /// Row cap for the page listing filter query
    #[serde(default = "default_page_listing_cap")]
    pub page_listing_cap: usize,
}

fn default_rrf_k() -> f64 {
    60.0
}

fn default_match_count() -> usize {
    30
}

fn default_max_match_count() -> usize {
    200
}

fn default_overfetch_factor() -> usize {
    1
}

fn default_page_listing_cap() -> usize {
    1000
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            rrf_k: default_rrf_k(),
            default_match_count: default_match_count(),
            max_match_count: default_max_match_count(),
            overfetch_factor: default_overfetch_factor(),
            page_listing_cap: default_page_listing_cap(),
        }
    }
}

impl Config {
    /// Load configuration from defaults, TOML file, and environment variables
    ///
    /// Environment variables override TOML file values.
    /// Example: PAGESEARCH_INDEX__REGION=gcp-us-central1 overrides index.region in pagesearch.toml
    pub fn load() -> Result<Config, SearchError> {
        Self::figment()
            .extract()
            .map_err(|e| SearchError::Config(format!("Failed to load config: {}", e)))
    }

    fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file("pagesearch.toml"))
            .merge(Env::prefixed("PAGESEARCH_").split("__"))
    }

    /// Check that every credential needed to reach the external services is present.
    ///
    /// Reports all missing keys at once rather than failing on the first.
    pub fn validate(&self) -> Result<(), SearchError> {
        let required = [
            ("embedding.api_key", &self.embedding.api_key),
            ("index.api_key", &self.index.api_key),
            ("storage.account_id", &self.storage.account_id),
            ("storage.access_key_id", &self.storage.access_key_id),
            ("storage.secret_access_key", &self.storage.secret_access_key),
            ("storage.bucket", &self.storage.bucket),
        ];

        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.as_deref().map_or(true, |v| v.trim().is_empty()))
            .map(|(name, _)| *name)
            .collect();

        if !missing.is_empty() {
            return Err(SearchError::Config(format!(
                "Missing required settings: {}",
                missing.join(", ")
            )));
        }

        if self.search.default_match_count == 0
            || self.search.default_match_count > self.search.max_match_count
        {
            return Err(SearchError::Config(format!(
                "search.default_match_count must be within 1..={}",
                self.search.max_match_count
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> Config {
        let mut config = Config::default();
        config.embedding.api_key = Some("tg".into());
        config.index.api_key = Some("tp".into());
        config.storage.account_id = Some("acct".into());
        config.storage.access_key_id = Some("AKID".into());
        config.storage.secret_access_key = Some("secret".into());
        config.storage.bucket = Some("pages".into());
        config
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_file, None);
        assert_eq!(config.server.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.index.namespace, "searchable-whole-earth-page");
        assert_eq!(config.index.endpoint(), "https://aws-us-east-1.turbopuffer.com");
        assert_eq!(config.storage.url_ttl_secs, 3600);
        assert_eq!(config.search.rrf_k, 60.0);
        assert_eq!(config.search.default_match_count, 30);
        assert_eq!(config.search.page_listing_cap, 1000);
    }

    #[test]
    fn test_validate_lists_every_missing_key() {
        let err = Config::default().validate().unwrap_err().to_string();
        assert!(err.contains("embedding.api_key"), "{}", err);
        assert!(err.contains("index.api_key"), "{}", err);
        assert!(err.contains("storage.bucket"), "{}", err);
    }

    #[test]
    fn test_validate_rejects_blank_secret() {
        let mut config = complete();
        config.storage.secret_access_key = Some("   ".into());
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("storage.secret_access_key"));
        assert!(!err.contains("storage.bucket"));
    }

    #[test]
    fn test_validate_accepts_complete_config() {
        assert!(complete().validate().is_ok());
    }

    #[test]
    fn test_env_overrides_toml() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "pagesearch.toml",
                r#"
                log_level = "debug"

                [index]
                region = "gcp-us-central1"

                [search]
                rrf_k = 30.0
                "#,
            )?;
            jail.set_env("PAGESEARCH_INDEX__REGION", "aws-eu-central-1");
            jail.set_env("PAGESEARCH_STORAGE__BUCKET", "whole-earth");

            let config = Config::load().expect("config should load");
            assert_eq!(config.log_level, "debug");
            assert_eq!(config.index.region, "aws-eu-central-1");
            assert_eq!(config.storage.bucket.as_deref(), Some("whole-earth"));
            assert_eq!(config.search.rrf_k, 30.0);
            assert_eq!(config.search.default_match_count, 30);
            Ok(())
        });
    }
}
