//! Settings Queries

use crate::domain::project::ProjectId;

/// 获取全局设置（模型、预设、API Key 状态）
#[derive(Debug, Clone)]
pub struct GetGlobalSettings;

/// 获取当前生成参数与预设列表
#[derive(Debug, Clone)]
pub struct GetGenerationParams;

/// 获取安全设置
#[derive(Debug, Clone)]
pub struct GetSafetySettings;

/// 获取项目的系统 Prompt
#[derive(Debug, Clone)]
pub struct GetSystemPrompt {
    pub project: ProjectId,
}
