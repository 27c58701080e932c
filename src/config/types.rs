//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::time::Duration;

use crate::domain::editor::DEFAULT_HISTORY_CAPACITY;

/// 应用主配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    /// 后端连接配置
    #[serde(default)]
    pub backend: BackendConfig,

    /// 编辑器配置
    #[serde(default)]
    pub editor: EditorConfig,

    /// 批量生成配置
    #[serde(default)]
    pub batch: BatchConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 后端连接配置
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// 后端 Base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// JSON 请求超时时间（秒），SSE 流不受限制
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// 编辑器配置
#[derive(Debug, Clone, Deserialize)]
pub struct EditorConfig {
    /// 自动保存防抖时长（毫秒）
    #[serde(default = "default_autosave_delay")]
    pub autosave_delay_ms: u64,

    /// 撤销历史最大条目数
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

fn default_autosave_delay() -> u64 {
    3000
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            autosave_delay_ms: default_autosave_delay(),
            history_capacity: default_history_capacity(),
        }
    }
}

impl EditorConfig {
    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }
}

/// 批量生成配置
#[derive(Debug, Clone, Deserialize)]
pub struct BatchConfig {
    /// 单个任务最多生成的章节数
    #[serde(default = "default_batch_max")]
    pub max_count: u32,
}

fn default_batch_max() -> u32 {
    50
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_count: default_batch_max(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.backend.base_url, "http://localhost:5000");
        assert_eq!(config.backend.timeout(), Duration::from_secs(30));
        assert_eq!(config.editor.autosave_delay(), Duration::from_millis(3000));
        assert_eq!(config.editor.history_capacity, 200);
        assert_eq!(config.batch.max_count, 50);
    }
}
