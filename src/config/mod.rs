use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable overriding `database.url`
pub const DATABASE_URL_ENV: &str = "YT_PROCESSOR_DATABASE_URL";

/// Environment variable overriding `database.api_key`
pub const DATABASE_KEY_ENV: &str = "YT_PROCESSOR_DATABASE_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// External tools and caption preferences
    pub youtube: YoutubeConfig,

    /// Object storage for captured frames
    pub storage: StorageConfig,

    /// PostgREST database for video, transcript and segment rows
    pub database: DatabaseConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoutubeConfig {
    /// yt-dlp executable
    pub yt_dlp_path: String,

    /// ffmpeg executable
    pub ffmpeg_path: String,

    /// Caption languages in order of preference
    pub languages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Bucket receiving the frames
    pub bucket: String,

    /// Region used to sign requests
    pub region: String,

    /// Custom S3 endpoint (Supabase Storage, R2, MinIO)
    pub endpoint_url: Option<String>,

    /// Base URL objects are publicly served from, followed by `/{bucket}/{path}`
    pub public_base_url: Option<String>,

    /// Use path-style addressing, required by most S3-compatible services
    pub force_path_style: bool,

    /// Cache lifetime in seconds attached to every upload
    pub cache_control: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Project or PostgREST URL
    pub url: String,

    /// API key sent as `apikey` and bearer token
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Parent directory for per-request temporary files
    pub temp_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            youtube: YoutubeConfig {
                yt_dlp_path: "yt-dlp".to_string(),
                ffmpeg_path: "ffmpeg".to_string(),
                languages: vec!["en".to_string()],
            },
            storage: StorageConfig {
                bucket: "youtube_frames".to_string(),
                region: "us-east-1".to_string(),
                endpoint_url: None,
                public_base_url: None,
                force_path_style: false,
                cache_control: "3600".to_string(),
            },
            database: DatabaseConfig {
                url: "".to_string(),
                api_key: "".to_string(),
            },
            app: AppConfig { temp_dir: None },
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            let content = fs_err::read_to_string(&config_path).context("Failed to read config file")?;

            serde_yaml::from_str(&content).context("Failed to parse config file")?
        } else {
            let config = Self::default();
            config.save().await?;
            config
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("yt-processor").join("config.yaml"))
    }

    /// Replace database credentials with values found in the environment
    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(DATABASE_URL_ENV).filter(|v| !v.is_empty()) {
            self.database.url = url;
        }
        if let Some(key) = lookup(DATABASE_KEY_ENV).filter(|v| !v.is_empty()) {
            self.database.api_key = key;
        }
    }

    /// Validate the settings needed to publish frames and rows
    pub fn validate(&self) -> Result<()> {
        if self.storage.bucket.is_empty() {
            anyhow::bail!("Storage bucket must be configured");
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL must be configured (or set {})", DATABASE_URL_ENV);
        }

        if self.database.api_key.is_empty() {
            anyhow::bail!("Database API key must be configured (or set {})", DATABASE_KEY_ENV);
        }

        if self.youtube.languages.is_empty() {
            anyhow::bail!("At least one caption language must be configured");
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Server: {}", self.server_address());
        println!("  yt-dlp: {}", self.youtube.yt_dlp_path);
        println!("  ffmpeg: {}", self.youtube.ffmpeg_path);
        println!("  Caption languages: {}", self.youtube.languages.join(", "));
        println!("  Bucket: {} ({})", self.storage.bucket, self.storage.region);
        if let Some(endpoint) = &self.storage.endpoint_url {
            println!("  Storage endpoint: {}", endpoint);
        }
        if let Some(base) = &self.storage.public_base_url {
            println!("  Public base URL: {}", base);
        }
        if self.database.url.is_empty() {
            println!("  Database: not configured");
        } else {
            println!("  Database: {}", self.database.url);
        }
    }

    /// Print where the configuration file lives
    pub fn print_location(&self) -> Result<()> {
        println!("Edit the config file to change settings:");
        println!("  {}", Self::config_path()?.display());
        Ok(())
    }

    /// Address the HTTP server binds to
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_round_trips_through_yaml() {
        let yaml = serde_yaml::to_string(&Config::default()).unwrap();
        let config: Config = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(config.storage.bucket, "youtube_frames");
        assert_eq!(config.storage.cache_control, "3600");
        assert_eq!(config.youtube.languages, vec!["en"]);
        assert_eq!(config.server_address(), "0.0.0.0:8000");
    }

    #[test]
    fn test_default_needs_database_before_publishing() {
        let err = Config::default().validate().unwrap_err();
        assert!(err.to_string().contains("Database URL"));
    }

    #[test]
    fn test_env_overrides_database_credentials() {
        let mut config = Config::default();
        config.apply_env_overrides(|key| match key {
            DATABASE_URL_ENV => Some("https://abc.supabase.co".to_string()),
            DATABASE_KEY_ENV => Some("service-key".to_string()),
            _ => None,
        });

        assert_eq!(config.database.url, "https://abc.supabase.co");
        assert_eq!(config.database.api_key, "service-key");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let mut config = Config::default();
        config.database.url = "https://file.example".to_string();
        config.apply_env_overrides(|_| Some(String::new()));

        assert_eq!(config.database.url, "https://file.example");
    }
}
