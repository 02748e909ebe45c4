//! Configuration management
//!
//! This module handles loading and saving the s3sync configuration file.
//! The file is TOML, looked up as `s3sync.toml` in the working directory
//! and then as `s3sync/config.toml` under the user config directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::options::{DEFAULT_CONCURRENCY, SyncOptions, clamp_concurrency};

/// Current configuration schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Project-local configuration file name
pub const LOCAL_CONFIG_FILE: &str = "s3sync.toml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Schema version for migration support
    pub schema_version: u32,

    /// How to reach the remote services
    #[serde(default)]
    pub connection: Connection,

    /// Directories to sync
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            connection: Connection::default(),
            targets: Vec::new(),
        }
    }
}

impl Config {
    /// Find a target by bucket name
    pub fn target(&self, bucket: &str) -> Result<&TargetConfig> {
        self.targets
            .iter()
            .find(|t| t.bucket == bucket)
            .ok_or_else(|| Error::NotFound(format!("No target configured for bucket {bucket}")))
    }
}

/// One directory-to-bucket sync as written in the config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Target bucket
    pub bucket: String,

    /// Local directory, relative to the working directory unless absolute
    pub source_dir: PathBuf,

    /// Regex filter applied to entry paths
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Glob filter applied to entry paths
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glob: Option<String>,

    /// Follow symlinks
    #[serde(default)]
    pub dereference_symlinks: bool,

    /// Maximum entries in flight (clamped to 1..=512)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    /// Remove tagged remote objects that no longer exist locally
    #[serde(default)]
    pub cleanup: bool,

    /// CloudFront distribution to invalidate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution_id: Option<String>,

    /// Upload objects as publicly readable
    #[serde(default)]
    pub public_read: bool,

    /// Canned ACL for uploads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl: Option<String>,

    /// Send a one-year Cache-Control header
    #[serde(default)]
    pub long_lived_cache: bool,

    /// Content type for unknown extensions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_content_type: Option<String>,

    /// Append accumulated errors to this file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_log: Option<PathBuf>,

    /// Abort on the first per-file error
    #[serde(default)]
    pub stop_on_error: bool,
}

impl TargetConfig {
    /// Compile into runtime options
    pub fn to_options(&self) -> Result<SyncOptions> {
        if self.bucket.trim().is_empty() {
            return Err(Error::Config("Target bucket cannot be empty".into()));
        }
        if self.source_dir.as_os_str().is_empty() {
            return Err(Error::Config(format!(
                "Target {} has no source_dir",
                self.bucket
            )));
        }

        let filter = match (&self.pattern, &self.glob) {
            (Some(_), Some(_)) => {
                return Err(Error::Config(format!(
                    "Target {} sets both pattern and glob",
                    self.bucket
                )));
            }
            (Some(pattern), None) => Some(Filter::pattern(pattern)?),
            (None, Some(glob)) => Some(Filter::glob(glob)?),
            (None, None) => None,
        };

        let mut options = SyncOptions::new(&self.bucket, &self.source_dir);
        options.filter = filter;
        options.dereference_symlinks = self.dereference_symlinks;
        options.concurrency_limit = clamp_concurrency(self.concurrency.unwrap_or(DEFAULT_CONCURRENCY));
        options.cleanup = self.cleanup;
        options.distribution_id = self.distribution_id.clone().filter(|id| !id.is_empty());
        options.public_read = self.public_read;
        options.acl = self.acl.clone();
        options.long_lived_cache = self.long_lived_cache;
        options.default_content_type = self.default_content_type.clone();
        options.error_log = self.error_log.clone();
        options.stop_on_error = self.stop_on_error;
        Ok(options)
    }
}

/// Configuration manager handles loading and saving config
#[derive(Debug)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Locate the configuration file
    ///
    /// Prefers `./s3sync.toml`; otherwise uses the user config directory.
    pub fn new() -> Result<Self> {
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return Ok(Self { config_path: local });
        }

        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not determine config directory".into()))?;
        let config_path = config_dir.join("s3sync").join("config.toml");
        Ok(Self { config_path })
    }

    /// Create a ConfigManager with a custom path
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
        }
    }

    /// Get the configuration file path
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load configuration from disk
    ///
    /// If the configuration file doesn't exist, returns a default configuration.
    pub fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&self.config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        if config.schema_version < SCHEMA_VERSION {
            config = self.migrate(config)?;
        } else if config.schema_version > SCHEMA_VERSION {
            return Err(Error::Config(format!(
                "Configuration file version {} is newer than supported version {}. Please upgrade s3sync.",
                config.schema_version, SCHEMA_VERSION
            )));
        }

        config.connection.validate()?;
        Ok(config)
    }

    /// Save configuration to disk
    ///
    /// Creates parent directories if they don't exist. The file may hold
    /// credentials, so on Unix it is made readable by the owner only.
    pub fn save(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(config)?;
        std::fs::write(&self.config_path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.config_path, permissions)?;
        }

        Ok(())
    }

    fn migrate(&self, config: Config) -> Result<Config> {
        let mut config = config;
        config.schema_version = SCHEMA_VERSION;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("s3sync.toml");
        let manager = ConfigManager::with_path(config_path);
        (manager, temp_dir)
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.schema_version, SCHEMA_VERSION);
        assert!(config.targets.is_empty());
        assert_eq!(config.connection, Connection::default());
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let (manager, _temp_dir) = temp_config_manager();
        let config = manager.load().unwrap();
        assert_eq!(config.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn test_save_and_load() {
        let (manager, _temp_dir) = temp_config_manager();

        let mut config = Config::default();
        config.connection.region = Some("eu-west-1".into());
        config.targets.push(TargetConfig {
            bucket: "my-site".into(),
            source_dir: "dist".into(),
            cleanup: true,
            distribution_id: Some("E2EXAMPLE".into()),
            ..Default::default()
        });

        manager.save(&config).unwrap();
        let loaded = manager.load().unwrap();

        assert_eq!(loaded.connection.region.as_deref(), Some("eu-west-1"));
        assert_eq!(loaded.targets.len(), 1);
        assert_eq!(loaded.targets[0].bucket, "my-site");
        assert!(loaded.targets[0].cleanup);
    }

    #[test]
    fn test_parse_full_target() {
        let content = r#"
            schema_version = 1

            [connection]
            endpoint = "http://localhost:9000"
            force_path_style = true

            [[targets]]
            bucket = "assets"
            source_dir = "public"
            pattern = "\\.(css|js)$"
            concurrency = 2048
            public_read = true
            long_lived_cache = true
            stop_on_error = true
        "#;
        let config: Config = toml::from_str(content).unwrap();
        let options = config.target("assets").unwrap().to_options().unwrap();

        assert_eq!(options.concurrency_limit, 512);
        assert!(options.public_read);
        assert!(options.stop_on_error);
        assert!(options.filter.is_some());
        assert!(config.connection.force_path_style);
    }

    #[test]
    fn test_schema_version_too_new() {
        let (manager, _temp_dir) = temp_config_manager();

        let content = format!("schema_version = {}\n", SCHEMA_VERSION + 1);
        std::fs::write(manager.config_path(), content).unwrap();

        let result = manager.load();
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("newer than supported")
        );
    }

    #[test]
    fn test_target_validation() {
        let target = TargetConfig {
            bucket: "".into(),
            source_dir: "dist".into(),
            ..Default::default()
        };
        assert!(matches!(target.to_options(), Err(Error::Config(_))));

        let target = TargetConfig {
            bucket: "b".into(),
            source_dir: "dist".into(),
            pattern: Some("x".into()),
            glob: Some("*".into()),
            ..Default::default()
        };
        assert!(matches!(target.to_options(), Err(Error::Config(_))));

        let target = TargetConfig {
            bucket: "b".into(),
            source_dir: "dist".into(),
            pattern: Some("(".into()),
            ..Default::default()
        };
        assert!(matches!(target.to_options(), Err(Error::InvalidPattern(_))));
    }

    #[test]
    fn test_unknown_target() {
        let config = Config::default();
        assert!(matches!(config.target("nope"), Err(Error::NotFound(_))));
    }
}
