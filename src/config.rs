//! YAML configuration.
//!
//! Every section has serde defaults, so an empty (or missing default)
//! `config.yaml` yields a working configuration. A handful of settings can
//! be overridden from the environment:
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `SCRAPER_COOKIES_FILE` | `auth.cookies_file` |
//! | `SCRAPER_STORE_PATH` | `store.path` |
//! | `SCRAPER_RENDER_ENDPOINT` | `render.endpoint` |
//! | `SCRAPER_RENDER_TOKEN` | `render.token` |
//!
//! # Example
//!
//! ```yaml
//! auth:
//!   cookies_file: cookies.json
//! filter:
//!   min_likes: 100
//!   days_back: 3
//! groups:
//!   - id: "123456789"
//!     name: Bikes For Sale
//! ```

use crate::error::ConfigError;
use crate::models::FilterCriteria;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

/// Config file read when none is given on the command line.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub platform: PlatformConfig,
    pub fetch: FetchConfig,
    pub render: RenderConfig,
    pub auth: AuthConfig,
    pub store: StoreConfig,
    pub filter: FilterCriteria,
    pub groups: Vec<GroupConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            platform: PlatformConfig::default(),
            fetch: FetchConfig::default(),
            render: RenderConfig::default(),
            auth: AuthConfig::default(),
            store: StoreConfig::default(),
            filter: FilterCriteria {
                min_likes: Some(50),
                days_back: Some(5),
                ..FilterCriteria::default()
            },
            groups: Vec::new(),
        }
    }
}

/// Base URLs of the three page skins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub base_url: String,
    pub mobile_url: String,
    pub basic_url: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.facebook.com".into(),
            mobile_url: "https://m.facebook.com".into(),
            basic_url: "https://mbasic.facebook.com".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub user_agent: String,
    /// Timeout of one HTTP request.
    pub request_timeout_secs: u64,
    /// Upper bound on one fetch attempt, rendered fetches included.
    pub attempt_timeout_secs: u64,
    pub max_retries: usize,
    pub base_backoff_ms: u64,
    /// Pause between two groups.
    pub group_delay_secs: u64,
    /// URL variants fetched at once for one group.
    pub concurrency: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .into(),
            request_timeout_secs: 30,
            attempt_timeout_secs: 120,
            max_retries: 2,
            base_backoff_ms: 1000,
            group_delay_secs: 5,
            concurrency: 4,
        }
    }
}

impl FetchConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    pub fn base_backoff(&self) -> Duration {
        Duration::from_millis(self.base_backoff_ms)
    }

    pub fn group_delay(&self) -> Duration {
        Duration::from_secs(self.group_delay_secs)
    }
}

/// Rendered fetching through a headless-browser service. Disabled while
/// `endpoint` is unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub endpoint: Option<String>,
    pub token: Option<String>,
    pub scroll: ScrollPolicy,
}

/// Hint passed through to the render service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollPolicy {
    pub max_scrolls: u32,
    /// Stop once this many days of content are visible.
    pub target_days: u32,
    /// Pause after each scroll.
    pub settle_ms: u64,
}

impl Default for ScrollPolicy {
    fn default() -> Self {
        Self {
            max_scrolls: 20,
            target_days: 5,
            settle_ms: 3000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub cookies_file: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookies_file: "cookies.json".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "data/posts.db".into(),
        }
    }
}

/// One group to scrape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl GroupConfig {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GroupsFile {
    #[serde(default)]
    groups: Vec<GroupConfig>,
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })
}

impl Config {
    /// Parse a YAML document.
    pub fn from_yaml(yaml: &str, origin: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })
    }

    /// Load configuration and apply environment overrides.
    ///
    /// An explicit `path` must exist. Without one, [`DEFAULT_CONFIG_PATH`]
    /// is read if present and defaults are used otherwise.
    #[instrument(level = "info", skip_all, fields(path = ?path))]
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) if !Path::new(p).exists() => return Err(ConfigError::NotFound(p.to_string())),
            Some(p) => Self::from_yaml(&read(Path::new(p))?, p)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_yaml(&read(Path::new(DEFAULT_CONFIG_PATH))?, DEFAULT_CONFIG_PATH)?
            }
            None => {
                info!("No config file found; using defaults");
                Self::default()
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        info!(groups = config.groups.len(), "Loaded configuration");
        Ok(config)
    }

    /// Apply `SCRAPER_*` overrides read through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = lookup("SCRAPER_COOKIES_FILE") {
            self.auth.cookies_file = v;
        }
        if let Some(v) = lookup("SCRAPER_STORE_PATH") {
            self.store.path = v;
        }
        if let Some(v) = lookup("SCRAPER_RENDER_ENDPOINT") {
            self.render.endpoint = Some(v);
        }
        if let Some(v) = lookup("SCRAPER_RENDER_TOKEN") {
            self.render.token = Some(v);
        }
    }
}

/// Read a standalone groups file (`groups: [...]`).
pub fn load_groups_file(path: &str) -> Result<Vec<GroupConfig>, ConfigError> {
    if !Path::new(path).exists() {
        return Err(ConfigError::NotFound(path.to_string()));
    }
    let yaml = read(Path::new(path))?;
    let file: GroupsFile = serde_yaml::from_str(&yaml).map_err(|source| ConfigError::Parse {
        path: path.to_string(),
        source,
    })?;
    Ok(file.groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = Config::from_yaml("", "inline").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.filter.min_likes, Some(50));
        assert_eq!(config.filter.days_back, Some(5));
        assert_eq!(config.fetch.concurrency, 4);
        assert!(config.render.endpoint.is_none());
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let yaml = r#"
fetch:
  max_retries: 5
render:
  endpoint: http://localhost:3000
  scroll:
    max_scrolls: 3
groups:
  - id: "111"
  - id: "222"
    name: Dog Walkers
"#;
        let config = Config::from_yaml(yaml, "inline").unwrap();
        assert_eq!(config.fetch.max_retries, 5);
        assert_eq!(config.fetch.request_timeout_secs, 30);
        assert_eq!(config.render.endpoint.as_deref(), Some("http://localhost:3000"));
        assert_eq!(config.render.scroll.max_scrolls, 3);
        assert_eq!(config.render.scroll.target_days, 5);
        assert_eq!(config.groups.len(), 2);
        assert_eq!(config.groups[1].name.as_deref(), Some("Dog Walkers"));
        assert_eq!(config.platform.mobile_url, "https://m.facebook.com");
    }

    #[test]
    fn test_parse_error_names_origin() {
        let err = Config::from_yaml("fetch: [unclosed", "bad.yaml").unwrap_err();
        assert!(err.to_string().contains("bad.yaml"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            "SCRAPER_STORE_PATH" => Some("/tmp/posts.db".to_string()),
            "SCRAPER_RENDER_ENDPOINT" => Some("http://render:3000".to_string()),
            "SCRAPER_COOKIES_FILE" => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.store.path, "/tmp/posts.db");
        assert_eq!(config.render.endpoint.as_deref(), Some("http://render:3000"));
        assert_eq!(config.auth.cookies_file, "cookies.json");
    }

    #[test]
    fn test_explicit_missing_path_is_error() {
        assert!(matches!(
            Config::load(Some("/definitely/not/here.yaml")),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn test_groups_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "groups:\n  - id: \"42\"\n    name: Answers").unwrap();
        let groups = load_groups_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(groups, vec![GroupConfig {
            id: "42".into(),
            name: Some("Answers".into())
        }]);
    }
}
