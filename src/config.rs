use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::provider::cloudflare::CLOUDFLARE_API_BASE;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cloudflare: CloudflareConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct CloudflareConfig {
    #[serde(default)]
    pub api_token: String,
    #[serde(default)]
    pub zone_id: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_api_timeout_secs")]
    pub api_timeout_secs: u64,
}

fn default_api_base() -> String {
    CLOUDFLARE_API_BASE.to_string()
}

fn default_api_timeout_secs() -> u64 {
    30
}

impl Default for CloudflareConfig {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            zone_id: String::new(),
            domain: String::new(),
            api_base: default_api_base(),
            api_timeout_secs: default_api_timeout_secs(),
        }
    }
}

// 不打印 token
impl fmt::Debug for CloudflareConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = if self.api_token.is_empty() { "" } else { "<redacted>" };
        f.debug_struct("CloudflareConfig")
            .field("api_token", &token)
            .field("zone_id", &self.zone_id)
            .field("domain", &self.domain)
            .field("api_base", &self.api_base)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

pub const ENV_API_TOKEN: &str = "CLOUDFLARE_API_TOKEN";
pub const ENV_ZONE_ID: &str = "CLOUDFLARE_ZONE_ID";
pub const ENV_DOMAIN: &str = "CDN_OPS_DOMAIN";
pub const ENV_API_BASE: &str = "CLOUDFLARE_API_BASE";

impl Config {
    /// Reads the TOML file when given, then layers environment overrides on top
    /// and validates the result.
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let path = path.as_ref();
                let content = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

                Self::parse(&content)
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))?
            }
            None => Config::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.normalize();
        config.validate()?;

        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = value(ENV_API_TOKEN) {
            self.cloudflare.api_token = token;
        }
        if let Some(zone_id) = value(ENV_ZONE_ID) {
            self.cloudflare.zone_id = zone_id;
        }
        if let Some(domain) = value(ENV_DOMAIN) {
            self.cloudflare.domain = domain;
        }
        if let Some(api_base) = value(ENV_API_BASE) {
            self.cloudflare.api_base = api_base;
        }
    }

    /// Strips surrounding whitespace from the values that end up in URLs and headers.
    pub fn normalize(&mut self) {
        let cf = &mut self.cloudflare;
        for value in [&mut cf.api_token, &mut cf.zone_id, &mut cf.domain, &mut cf.api_base] {
            *value = value.trim().to_string();
        }
    }

    pub fn validate(&self) -> Result<()> {
        let cf = &self.cloudflare;

        if cf.api_token.trim().is_empty() {
            bail!("Missing Cloudflare API token (set cloudflare.api_token or {})", ENV_API_TOKEN);
        }
        if cf.zone_id.trim().is_empty() {
            bail!("Missing Cloudflare zone id (set cloudflare.zone_id or {})", ENV_ZONE_ID);
        }
        if cf.domain.trim().is_empty() {
            bail!("Missing domain (set cloudflare.domain or {})", ENV_DOMAIN);
        }
        if cf.domain.contains("://") || cf.domain.contains('/') || cf.domain.contains(char::is_whitespace) {
            bail!("Domain must be a bare host name, got: {:?}", cf.domain);
        }
        if cf.api_timeout_secs == 0 {
            bail!("cloudflare.api_timeout_secs must be greater than zero");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const FULL: &str = r#"
[logging]
level = "debug"

[cloudflare]
api_token = "file-token"
zone_id = "zone-from-file"
domain = "example.com"
api_timeout_secs = 5
"#;

    #[test]
    fn test_parse_full_file() {
        let config = Config::parse(FULL).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.cloudflare.api_token, "file-token");
        assert_eq!(config.cloudflare.zone_id, "zone-from-file");
        assert_eq!(config.cloudflare.domain, "example.com");
        assert_eq!(config.cloudflare.api_base, CLOUDFLARE_API_BASE);
        assert_eq!(config.cloudflare.api_timeout_secs, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_empty_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.cloudflare.api_base, CLOUDFLARE_API_BASE);
        assert_eq!(config.cloudflare.api_timeout_secs, 30);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = Config::parse(FULL).unwrap();
        let env: HashMap<&str, &str> = [
            (ENV_API_TOKEN, "env-token"),
            (ENV_DOMAIN, "other.example"),
            (ENV_ZONE_ID, "   "),
        ]
        .into_iter()
        .collect();

        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.cloudflare.api_token, "env-token");
        assert_eq!(config.cloudflare.domain, "other.example");
        // blank values are ignored
        assert_eq!(config.cloudflare.zone_id, "zone-from-file");
    }

    #[test]
    fn test_validate_rejects_missing_and_malformed_fields() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            ENV_API_TOKEN => Some("t".into()),
            ENV_ZONE_ID => Some("z".into()),
            _ => None,
        });
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains(ENV_DOMAIN));

        config.cloudflare.domain = "https://example.com".into();
        assert!(config.validate().is_err());

        config.cloudflare.domain = "example.com".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_normalize_trims_domain_before_validation() {
        let mut config = Config::parse(FULL).unwrap();
        config.cloudflare.domain = "  example.com \n".into();
        config.normalize();
        assert_eq!(config.cloudflare.domain, "example.com");
        assert!(config.validate().is_ok());

        config.cloudflare.domain = "example .com".into();
        config.normalize();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = Config::parse(&FULL.replace("api_timeout_secs = 5", "api_timeout_secs = 0")).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("api_timeout_secs"));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = Config::parse(FULL).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("file-token"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_load_reports_missing_file() {
        let err = Config::load(Some("/nonexistent/cdn-ops.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
