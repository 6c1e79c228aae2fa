use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::processor::StatusThresholds;

/// Top-level pipeline configuration, loaded from `pipeline.toml`. Every
/// section has working defaults so a missing file still yields a runnable
/// local setup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub sources: SourcesSection,
    #[serde(default)]
    pub shopify: ShopifySection,
    #[serde(default)]
    pub status: StatusThresholds,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSection {
    pub dir: String,
}

impl Default for CacheSection {
    fn default() -> Self {
        CacheSection {
            dir: "data_cache".to_string(),
        }
    }
}

impl CacheSection {
    pub fn master_path(&self) -> PathBuf {
        Path::new(&self.dir).join("master_dataset.csv")
    }

    pub fn fingerprint_path(&self) -> PathBuf {
        Path::new(&self.dir).join("processed_files.json")
    }

    pub fn watermark_path(&self) -> PathBuf {
        Path::new(&self.dir).join("last_sync.json")
    }

    pub fn account_status_path(&self) -> PathBuf {
        Path::new(&self.dir).join("account_status.csv")
    }
}

/// One folder per distributor; a missing entry disables that source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcesSection {
    #[serde(default)]
    pub horizon: Option<SourceFolder>,
    #[serde(default)]
    pub psc: Option<SourceFolder>,
    #[serde(default)]
    pub ollie: Option<SourceFolder>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFolder {
    pub folder: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopifySection {
    /// Shop domain like "example.myshopify.com"; absent means the order
    /// source is not configured.
    #[serde(default)]
    pub shop_domain: Option<String>,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Environment variable carrying the API token. The token itself never
    /// lives in the config file.
    #[serde(default)]
    pub env_token: Option<String>,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Where full syncs start when no watermark exists yet.
    #[serde(default = "default_sync_start")]
    pub sync_start: DateTime<Utc>,
}

fn default_api_version() -> String {
    "2024-04".to_string()
}

fn default_page_size() -> u32 {
    250
}

fn default_sync_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

impl Default for ShopifySection {
    fn default() -> Self {
        ShopifySection {
            shop_domain: None,
            api_version: default_api_version(),
            env_token: None,
            page_size: default_page_size(),
            sync_start: default_sync_start(),
        }
    }
}

impl ShopifySection {
    /// Resolve the API token from the environment. `None` means the source
    /// is unavailable for this run; the pipeline skips it with a warning.
    pub fn load_token(&self) -> Option<String> {
        let var = self.env_token.as_deref().unwrap_or("SHOPIFY_TOKEN");
        env::var(var).ok().filter(|token| !token.is_empty())
    }
}

impl PipelineConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read pipeline config file: {}", path))?;
        let config: PipelineConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse pipeline config file: {}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Fall back to defaults when no config file is present.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::from_file(path)
        } else {
            Ok(PipelineConfig::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache.dir.trim().is_empty() {
            anyhow::bail!("cache.dir cannot be empty");
        }
        if self.shopify.page_size == 0 {
            anyhow::bail!("shopify.page_size must be positive");
        }
        if self.status.active_within_days >= self.status.inactive_after_days {
            anyhow::bail!("status.active_within_days must be below status.inactive_after_days");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cache.dir, "data_cache");
        assert_eq!(config.shopify.page_size, 250);
        assert!(config.sources.horizon.is_none());
    }

    #[test]
    fn parses_a_full_config_file() {
        let toml = r#"
            [cache]
            dir = "cache"

            [sources.horizon]
            folder = "data/horizon"

            [sources.ollie]
            folder = "data/ollie"

            [shopify]
            shop_domain = "example.myshopify.com"
            env_token = "TEST_SHOP_TOKEN"
            page_size = 100

            [status]
            active_within_days = 60
            inactive_after_days = 120
        "#;
        let config: PipelineConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.sources.horizon.as_ref().unwrap().folder,
            "data/horizon"
        );
        assert!(config.sources.psc.is_none());
        assert_eq!(
            config.shopify.shop_domain.as_deref(),
            Some("example.myshopify.com")
        );
        assert_eq!(config.status.active_within_days, 60);
    }

    #[test]
    fn token_resolution_uses_the_configured_env_var() {
        env::set_var("PIPELINE_TEST_TOKEN", "shpat_test");

        let section = ShopifySection {
            env_token: Some("PIPELINE_TEST_TOKEN".to_string()),
            ..Default::default()
        };
        assert_eq!(section.load_token().as_deref(), Some("shpat_test"));

        env::remove_var("PIPELINE_TEST_TOKEN");
        assert_eq!(section.load_token(), None);
    }

    #[test]
    fn inverted_thresholds_fail_validation() {
        let mut config = PipelineConfig::default();
        config.status.active_within_days = 200;
        assert!(config.validate().is_err());
    }

    #[test]
    fn cache_paths_live_under_the_cache_dir() {
        let cache = CacheSection {
            dir: "state".to_string(),
        };
        assert_eq!(
            cache.master_path(),
            Path::new("state").join("master_dataset.csv")
        );
        assert_eq!(
            cache.fingerprint_path(),
            Path::new("state").join("processed_files.json")
        );
    }
}
