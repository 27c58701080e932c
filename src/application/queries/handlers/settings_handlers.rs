//! Settings Query Handlers

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{
    GenerationParamsView, GlobalSettings, SafetySettings, SettingsApiPort, SystemPrompt,
};
use crate::application::queries::{
    GetGenerationParams, GetGlobalSettings, GetSafetySettings, GetSystemPrompt,
};

pub struct GetGlobalSettingsHandler {
    api: Arc<dyn SettingsApiPort>,
}

impl GetGlobalSettingsHandler {
    pub fn new(api: Arc<dyn SettingsApiPort>) -> Self {
        Self { api }
    }

    pub async fn handle(&self, _query: GetGlobalSettings) -> Result<GlobalSettings, ApplicationError> {
        Ok(self.api.global_settings().await?)
    }
}

pub struct GetGenerationParamsHandler {
    api: Arc<dyn SettingsApiPort>,
}

impl GetGenerationParamsHandler {
    pub fn new(api: Arc<dyn SettingsApiPort>) -> Self {
        Self { api }
    }

    pub async fn handle(
        &self,
        _query: GetGenerationParams,
    ) -> Result<GenerationParamsView, ApplicationError> {
        Ok(self.api.generation_params().await?)
    }
}

pub struct GetSafetySettingsHandler {
    api: Arc<dyn SettingsApiPort>,
}

impl GetSafetySettingsHandler {
    pub fn new(api: Arc<dyn SettingsApiPort>) -> Self {
        Self { api }
    }

    pub async fn handle(&self, _query: GetSafetySettings) -> Result<SafetySettings, ApplicationError> {
        Ok(self.api.safety_settings().await?)
    }
}

/// GetSystemPrompt Handler
///
/// 项目未设置过 Prompt 时返回 `exists = false` 的空内容
pub struct GetSystemPromptHandler {
    api: Arc<dyn SettingsApiPort>,
}

impl GetSystemPromptHandler {
    pub fn new(api: Arc<dyn SettingsApiPort>) -> Self {
        Self { api }
    }

    pub async fn handle(&self, query: GetSystemPrompt) -> Result<SystemPrompt, ApplicationError> {
        Ok(self.api.system_prompt(&query.project).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commands::handlers::SaveSystemPromptHandler;
    use crate::application::commands::SaveSystemPrompt;
    use crate::domain::project::ProjectId;
    use crate::infrastructure::memory::InMemoryBackend;

    #[tokio::test]
    async fn test_system_prompt_roundtrip_through_backend() {
        let backend = Arc::new(InMemoryBackend::new());
        let project = ProjectId::new("demo").unwrap();
        let query = GetSystemPromptHandler::new(backend.clone());

        let prompt = query
            .handle(GetSystemPrompt {
                project: project.clone(),
            })
            .await
            .unwrap();
        assert!(!prompt.exists);
        assert!(prompt.content.is_empty());

        SaveSystemPromptHandler::new(backend.clone())
            .handle(SaveSystemPrompt {
                project: project.clone(),
                content: "你是一位武侠小说作家".to_string(),
            })
            .await
            .unwrap();

        let prompt = query.handle(GetSystemPrompt { project }).await.unwrap();
        assert!(prompt.exists);
        assert_eq!(prompt.content, "你是一位武侠小说作家");
    }

    #[tokio::test]
    async fn test_generation_params_lists_presets() {
        let backend = Arc::new(InMemoryBackend::new());
        let view = GetGenerationParamsHandler::new(backend)
            .handle(GetGenerationParams)
            .await
            .unwrap();
        assert!(view.presets.contains_key("creative"));
        assert!(view.config.temperature.is_some());
    }
}
