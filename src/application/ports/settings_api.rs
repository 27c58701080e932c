//! Settings API Port - 全局设置、生成参数、安全设置、系统 Prompt

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ApiError;
use crate::domain::project::ProjectId;

/// 生成参数（只发送设置了的字段）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GenerationParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
}

impl GenerationParams {
    pub fn is_empty(&self) -> bool {
        *self == GenerationParams::default()
    }
}

/// 安全设置，未建模的字段原样保留
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SafetySettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub harm_block_threshold: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_content_filter: Option<bool>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// 可选模型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub context: Option<u64>,
    #[serde(default)]
    pub desc: Option<String>,
}

/// GET /api/settings/global/full 的响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalSettings {
    pub current_model: Option<String>,
    pub current_provider: Option<String>,
    pub generation_config: GenerationParams,
    pub safety_settings: SafetySettings,
    pub config_presets: BTreeMap<String, GenerationParams>,
    /// provider -> models
    pub available_models: BTreeMap<String, Vec<ModelInfo>>,
    pub api_keys_configured: BTreeMap<String, bool>,
}

/// 当前生成参数与预设
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GenerationParamsView {
    pub config: GenerationParams,
    pub presets: BTreeMap<String, GenerationParams>,
}

/// 项目系统 Prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SystemPrompt {
    pub content: String,
    pub exists: bool,
}

/// Settings API Port
#[async_trait]
pub trait SettingsApiPort: Send + Sync {
    /// GET /api/settings/global/full
    async fn global_settings(&self) -> Result<GlobalSettings, ApiError>;

    /// GET /api/settings/params
    async fn generation_params(&self) -> Result<GenerationParamsView, ApiError>;

    /// POST /api/settings/params，返回更新后的参数
    async fn update_generation_params(
        &self,
        params: &GenerationParams,
    ) -> Result<GenerationParams, ApiError>;

    /// POST /api/settings/params/preset/:name
    async fn apply_preset(&self, name: &str) -> Result<GenerationParams, ApiError>;

    /// GET /api/settings/safety
    async fn safety_settings(&self) -> Result<SafetySettings, ApiError>;

    /// POST /api/settings/safety
    async fn update_safety_settings(
        &self,
        settings: &SafetySettings,
    ) -> Result<SafetySettings, ApiError>;

    /// GET /api/settings/system-prompt/:id
    async fn system_prompt(&self, project: &ProjectId) -> Result<SystemPrompt, ApiError>;

    /// POST /api/settings/system-prompt/:id
    async fn save_system_prompt(&self, project: &ProjectId, content: &str)
        -> Result<(), ApiError>;
}
