//! Settings Commands

use crate::application::ports::{GenerationParams, SafetySettings};
use crate::domain::project::ProjectId;

/// 更新生成参数（只提交设置了的字段）
#[derive(Debug, Clone)]
pub struct UpdateGenerationParams {
    pub params: GenerationParams,
}

/// 应用参数预设
#[derive(Debug, Clone)]
pub struct ApplyPreset {
    pub name: String,
}

/// 更新安全设置
#[derive(Debug, Clone)]
pub struct UpdateSafety {
    pub settings: SafetySettings,
}

/// 保存项目系统 Prompt
#[derive(Debug, Clone)]
pub struct SaveSystemPrompt {
    pub project: ProjectId,
    pub content: String,
}
