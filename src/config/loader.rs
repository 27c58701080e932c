//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（studio.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["studio", "studio.local"];

/// 加载应用配置
///
/// # 环境变量示例
/// - `NOVEL_STUDIO_BACKEND__BASE_URL=http://127.0.0.1:5000`
/// - `NOVEL_STUDIO_EDITOR__AUTOSAVE_DELAY_MS=2000`
/// - `NOVEL_STUDIO_LOG__LEVEL=debug`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值
    builder = builder
        .set_default("backend.base_url", "http://localhost:5000")?
        .set_default("backend.timeout_secs", 30)?
        .set_default("editor.autosave_delay_ms", 3000)?
        .set_default("editor.history_capacity", 200)?
        .set_default("batch.max_count", 50)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 配置文件
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量，例如 NOVEL_STUDIO_BACKEND__BASE_URL
    builder = builder.add_source(
        Environment::with_prefix("NOVEL_STUDIO")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    let base_url = config.backend.base_url.trim();
    if base_url.is_empty() {
        return Err(ConfigError::ValidationError(
            "Backend base URL cannot be empty".to_string(),
        ));
    }
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::ValidationError(format!(
            "Backend base URL must start with http:// or https://, got {}",
            base_url
        )));
    }

    if config.editor.autosave_delay_ms == 0 {
        return Err(ConfigError::ValidationError(
            "Autosave delay cannot be 0".to_string(),
        ));
    }

    if config.editor.history_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "History capacity cannot be 0".to_string(),
        ));
    }

    if config.batch.max_count == 0 {
        return Err(ConfigError::ValidationError(
            "Batch max count cannot be 0".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Novel Studio Configuration ===");
    tracing::info!("Backend: {}", config.backend.base_url);
    tracing::info!("Request Timeout: {}s", config.backend.timeout_secs);
    tracing::info!("Autosave Delay: {}ms", config.editor.autosave_delay_ms);
    tracing::info!("History Capacity: {}", config.editor.history_capacity);
    tracing::info!("Batch Max Count: {}", config.batch.max_count);
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("==================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_validation_passes_for_valid_config() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_bad_base_url() {
        let mut config = AppConfig::default();
        config.backend.base_url = String::new();
        assert!(validate_config(&config).is_err());

        config.backend.base_url = "localhost:5000".to_string();
        assert!(validate_config(&config).is_err());

        config.backend.base_url = "https://studio.example.com".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_zero_values() {
        let mut config = AppConfig::default();
        config.editor.autosave_delay_ms = 0;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.editor.history_capacity = 0;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.batch.max_count = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[backend]\nbase_url = \"http://10.0.0.2:5000\"\n\n[editor]\nautosave_delay_ms = 2000"
        )
        .unwrap();

        let config = load_config_from_path(Some(file.path())).unwrap();
        assert_eq!(config.backend.base_url, "http://10.0.0.2:5000");
        assert_eq!(config.editor.autosave_delay_ms, 2000);
        assert_eq!(config.editor.history_capacity, 200);
        assert_eq!(config.batch.max_count, 50);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[batch]\nmax_count = 0").unwrap();

        let result = load_config_from_path(Some(file.path()));
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }
}
