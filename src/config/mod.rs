pub mod settings;

pub use settings::{AiConfig, Config, ConfigError, GitConfig};
