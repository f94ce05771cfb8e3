use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Config directory not found")]
    DirectoryNotFound,

    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub git: GitConfig,
    pub ai: AiConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GitConfig {
    /// All repository paths must resolve under this directory.
    pub allowed_root: PathBuf,
    pub timeout_seconds: u64,
    pub max_output_bytes: usize,
    pub max_diff_bytes: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AiConfig {
    pub model: String,
    pub api_key_env: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub request_timeout_seconds: u64,
    /// Cap on raw error output embedded in diagnosis prompts.
    pub max_prompt_bytes: usize,
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        let home = std::env::var("HOME").map_err(|_| ConfigError::DirectoryNotFound)?;
        Ok(PathBuf::from(home).join(".config").join("gitsage"))
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Err(ConfigError::ReadError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Config file not found",
            )));
        }

        let contents = fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&contents)?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<(), ConfigError> {
        self.validate()?;

        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir)?;

        let path = Self::config_path()?;
        let contents = toml::to_string_pretty(self)?;

        fs::write(&path, contents)?;

        // Set permissions to 600 (owner read/write only); the file may
        // contain an API key.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&path, perms)?;
        }

        Ok(())
    }

    /// Create default configuration rooted at the given directory
    pub fn default_config(allowed_root: PathBuf) -> Self {
        Config {
            git: GitConfig {
                allowed_root,
                timeout_seconds: 30,
                max_output_bytes: 1024 * 1024,
                max_diff_bytes: 50_000,
            },
            ai: AiConfig {
                model: "gemini-2.5-flash".to_string(),
                api_key_env: "GEMINI_API_KEY".to_string(),
                api_key: None,
                request_timeout_seconds: 30,
                max_prompt_bytes: 3000,
            },
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.git.allowed_root.is_absolute() {
            return Err(ConfigError::InvalidValue(format!(
                "allowed_root must be an absolute path, got {}",
                self.git.allowed_root.display()
            )));
        }

        if self.git.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if self.git.max_output_bytes == 0 {
            return Err(ConfigError::InvalidValue(
                "max_output_bytes must be greater than 0".to_string(),
            ));
        }

        if !self.ai.model.starts_with("gemini-") {
            return Err(ConfigError::InvalidValue(format!(
                "Invalid model name: {}. Must be a Gemini model",
                self.ai.model
            )));
        }

        if self.ai.request_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "request_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Get API key from environment variable or config
    pub fn get_api_key(&self) -> Option<String> {
        if let Ok(key) = std::env::var(&self.ai.api_key_env) {
            if !key.is_empty() {
                return Some(key);
            }
        }

        self.ai.api_key.clone()
    }

    /// Check if API key is available
    pub fn has_api_key(&self) -> bool {
        self.get_api_key().is_some()
    }
}
