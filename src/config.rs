use crate::chapters::DetectionMode;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the clip detector
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// YouTube Data API settings
    pub youtube: YouTubeConfig,

    /// Local yt-dlp download directory
    pub library: LibraryConfig,

    /// Detection pipeline settings
    pub detection: DetectionConfig,

    /// Registered video storage
    pub registry: RegistryConfig,

    /// Output and logging settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YouTubeConfig {
    /// API key for the Data API (metadata and comments)
    pub api_key: Option<String>,

    /// Base URL of the Data API
    pub api_base_url: String,

    /// HTTP request timeout in seconds
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Directory holding `<id>.info.json` and caption files
    pub dir: PathBuf,

    /// Serve metadata and comments from the library even when an API key is set
    pub prefer_local: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Mode used when the caller does not name one
    pub default_mode: DetectionMode,

    /// Upper bound on comment pages fetched per video (0 = unlimited)
    pub max_comment_pages: usize,

    /// Caption candidates scoring below this are dropped
    pub min_caption_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// JSON file holding registered videos
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Log level
    pub log_level: String,

    /// Pretty-print JSON output
    pub pretty: bool,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base_url: "https://www.googleapis.com/youtube/v3".to_string(),
            request_timeout_seconds: 30,
        }
    }
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./library"),
            prefer_local: false,
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            default_mode: DetectionMode::Combined,
            max_comment_pages: 0,
            min_caption_score: 0.35,
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./clip-detector-videos.json"),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            pretty: true,
        }
    }
}

impl DetectionConfig {
    /// Page cap as an option, `None` meaning unlimited
    pub fn comment_page_limit(&self) -> Option<usize> {
        (self.max_comment_pages > 0).then_some(self.max_comment_pages)
    }
}

impl Config {
    /// Load configuration from the first readable config file, falling back to the environment
    pub fn load() -> Result<Self> {
        let mut config_paths = vec![
            PathBuf::from("clip-detector.toml"),
            PathBuf::from("config/clip-detector.toml"),
        ];
        if let Some(config_dir) = dirs::config_dir() {
            config_paths.push(config_dir.join("clip-detector").join("config.toml"));
        }
        config_paths.push(PathBuf::from("/etc/clip-detector/config.toml"));

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str::<Config>(&config_str) {
                    Ok(config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path.display());
                        return Ok(config.with_env_overrides());
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path.display(), e);
                    }
                }
            }
        }

        Self::from_env()
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Cannot read config file {}: {}", path.display(), e))?;
        let config: Config = toml::from_str(&config_str)
            .map_err(|e| anyhow!("Invalid config file {}: {}", path.display(), e))?;
        tracing::info!("📄 Loaded configuration from: {}", path.display());
        Ok(config.with_env_overrides())
    }

    /// Default configuration with environment variable overrides
    pub fn from_env() -> Result<Self> {
        Ok(Self::default().with_env_overrides())
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(api_key) = std::env::var("CLIP_DETECTOR_API_KEY") {
            if !api_key.trim().is_empty() {
                self.youtube.api_key = Some(api_key);
            }
        }

        if let Ok(dir) = std::env::var("CLIP_DETECTOR_LIBRARY_DIR") {
            self.library.dir = PathBuf::from(dir);
        }

        if let Ok(log_level) = std::env::var("CLIP_DETECTOR_LOG_LEVEL") {
            self.output.log_level = log_level;
        }

        if let Ok(path) = std::env::var("CLIP_DETECTOR_REGISTRY") {
            self.registry.path = PathBuf::from(path);
        }

        self
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.youtube.request_timeout_seconds == 0 {
            return Err(anyhow!("request_timeout_seconds must be greater than 0"));
        }

        if url::Url::parse(&self.youtube.api_base_url).is_err() {
            return Err(anyhow!("api_base_url is not a valid URL: {}", self.youtube.api_base_url));
        }

        if !(0.0..=1.0).contains(&self.detection.min_caption_score) {
            return Err(anyhow!("min_caption_score must be within [0, 1]"));
        }

        if self.library.prefer_local && !self.library.dir.exists() {
            return Err(anyhow!("Library directory does not exist: {}", self.library.dir.display()));
        }

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }

    /// Whether metadata and comments come from the Data API
    pub fn uses_api(&self) -> bool {
        !self.library.prefer_local
            && self
                .youtube
                .api_key
                .as_deref()
                .is_some_and(|k| !k.trim().is_empty())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        let max_pages = match self.detection.comment_page_limit() {
            Some(n) => n.to_string(),
            None => "unlimited".to_string(),
        };
        format!(
            "Clip Detector Configuration:\n\
            - Metadata Source: {}\n\
            - Library Directory: {}\n\
            - Default Mode: {}\n\
            - Max Comment Pages: {}\n\
            - Min Caption Score: {:.2}\n\
            - Registry: {}",
            if self.uses_api() { "YouTube Data API" } else { "local library" },
            self.library.dir.display(),
            self.detection.default_mode,
            max_pages,
            self.detection.min_caption_score,
            self.registry.path.display()
        )
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.youtube.api_key = Some(api_key.into());
        self
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.youtube.api_base_url = url.into();
        self
    }

    pub fn with_library_dir(mut self, dir: PathBuf) -> Self {
        self.config.library.dir = dir;
        self
    }

    pub fn prefer_local(mut self, prefer: bool) -> Self {
        self.config.library.prefer_local = prefer;
        self
    }

    pub fn with_default_mode(mut self, mode: DetectionMode) -> Self {
        self.config.detection.default_mode = mode;
        self
    }

    pub fn with_max_comment_pages(mut self, pages: usize) -> Self {
        self.config.detection.max_comment_pages = pages;
        self
    }

    pub fn with_min_caption_score(mut self, score: f64) -> Self {
        self.config.detection.min_caption_score = score;
        self
    }

    pub fn with_registry_path(mut self, path: PathBuf) -> Self {
        self.config.registry.path = path;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.detection.default_mode, DetectionMode::Combined);
        assert_eq!(config.detection.min_caption_score, 0.35);
        assert_eq!(config.detection.comment_page_limit(), None);
        assert!(!config.uses_api());
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .with_api_key("key")
            .with_default_mode(DetectionMode::Chapters)
            .with_max_comment_pages(5)
            .build();

        assert!(config.uses_api());
        assert_eq!(config.detection.default_mode, DetectionMode::Chapters);
        assert_eq!(config.detection.comment_page_limit(), Some(5));

        let config = ConfigBuilder::new().with_api_key("key").prefer_local(true).build();
        assert!(!config.uses_api());
    }

    #[test]
    fn test_config_validation() {
        assert!(Config::default().validate().is_ok());

        let config = ConfigBuilder::new().with_min_caption_score(1.5).build();
        assert!(config.validate().is_err());

        let config = ConfigBuilder::new().with_api_base_url("not a url").build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [detection]
            default_mode = "captions"

            [youtube]
            api_key = "abc"
            "#,
        )
        .unwrap();

        assert_eq!(config.detection.default_mode, DetectionMode::Captions);
        assert_eq!(config.detection.min_caption_score, 0.35);
        assert_eq!(config.youtube.api_key.as_deref(), Some("abc"));
        assert_eq!(config.youtube.request_timeout_seconds, 30);
    }

    #[test]
    fn test_save_and_load_from() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("clip-detector.toml");

        let config = ConfigBuilder::new()
            .with_library_dir(temp_dir.path().to_path_buf())
            .with_max_comment_pages(3)
            .build();
        config.save(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.detection.max_comment_pages, 3);
        assert!(Config::load_from(&temp_dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_summary_mentions_source() {
        let summary = ConfigBuilder::new().with_max_comment_pages(2).build().summary();
        assert!(summary.contains("local library"));
        assert!(summary.contains("Max Comment Pages: 2"));
    }
}
