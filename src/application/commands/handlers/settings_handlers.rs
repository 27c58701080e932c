//! Settings Command Handlers

use std::sync::Arc;

use crate::application::commands::{
    ApplyPreset, SaveSystemPrompt, UpdateGenerationParams, UpdateSafety,
};
use crate::application::error::ApplicationError;
use crate::application::ports::{GenerationParams, SafetySettings, SettingsApiPort};

pub struct UpdateGenerationParamsHandler {
    api: Arc<dyn SettingsApiPort>,
}

impl UpdateGenerationParamsHandler {
    pub fn new(api: Arc<dyn SettingsApiPort>) -> Self {
        Self { api }
    }

    pub async fn handle(
        &self,
        command: UpdateGenerationParams,
    ) -> Result<GenerationParams, ApplicationError> {
        let params = command.params;
        if params.is_empty() {
            return Err(ApplicationError::validation("没有要更新的参数"));
        }
        if let Some(t) = params.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(ApplicationError::validation("temperature 必须在 0 到 2 之间"));
            }
        }
        if let Some(p) = params.top_p {
            if !(0.0..=1.0).contains(&p) {
                return Err(ApplicationError::validation("top_p 必须在 0 到 1 之间"));
            }
        }

        let updated = self.api.update_generation_params(&params).await?;
        tracing::info!(params = ?updated, "Generation params updated");
        Ok(updated)
    }
}

pub struct ApplyPresetHandler {
    api: Arc<dyn SettingsApiPort>,
}

impl ApplyPresetHandler {
    pub fn new(api: Arc<dyn SettingsApiPort>) -> Self {
        Self { api }
    }

    pub async fn handle(&self, command: ApplyPreset) -> Result<GenerationParams, ApplicationError> {
        let name = command.name.trim();
        if name.is_empty() {
            return Err(ApplicationError::validation("预设名称不能为空"));
        }
        let params = self.api.apply_preset(name).await?;
        tracing::info!(preset = %name, "Preset applied");
        Ok(params)
    }
}

pub struct UpdateSafetyHandler {
    api: Arc<dyn SettingsApiPort>,
}

impl UpdateSafetyHandler {
    pub fn new(api: Arc<dyn SettingsApiPort>) -> Self {
        Self { api }
    }

    pub async fn handle(&self, command: UpdateSafety) -> Result<SafetySettings, ApplicationError> {
        let settings = self.api.update_safety_settings(&command.settings).await?;
        tracing::info!("Safety settings updated");
        Ok(settings)
    }
}

pub struct SaveSystemPromptHandler {
    api: Arc<dyn SettingsApiPort>,
}

impl SaveSystemPromptHandler {
    pub fn new(api: Arc<dyn SettingsApiPort>) -> Self {
        Self { api }
    }

    pub async fn handle(&self, command: SaveSystemPrompt) -> Result<(), ApplicationError> {
        self.api
            .save_system_prompt(&command.project, &command.content)
            .await?;
        tracing::info!(
            project = %command.project,
            chars = command.content.chars().count(),
            "System prompt saved"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory::InMemoryBackend;

    #[tokio::test]
    async fn test_update_params_validation() {
        let backend = Arc::new(InMemoryBackend::new());
        let handler = UpdateGenerationParamsHandler::new(backend.clone());

        let err = handler
            .handle(UpdateGenerationParams {
                params: GenerationParams::default(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::Validation(_)));

        let err = handler
            .handle(UpdateGenerationParams {
                params: GenerationParams {
                    temperature: Some(3.5),
                    ..Default::default()
                },
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::Validation(_)));

        let updated = handler
            .handle(UpdateGenerationParams {
                params: GenerationParams {
                    temperature: Some(0.7),
                    ..Default::default()
                },
            })
            .await
            .unwrap();
        assert_eq!(updated.temperature, Some(0.7));
    }

    #[tokio::test]
    async fn test_apply_unknown_preset_fails() {
        let backend = Arc::new(InMemoryBackend::new());
        let handler = ApplyPresetHandler::new(backend);
        assert!(handler
            .handle(ApplyPreset {
                name: "creative".to_string()
            })
            .await
            .is_ok());
        assert!(matches!(
            handler
                .handle(ApplyPreset {
                    name: "nope".to_string()
                })
                .await,
            Err(ApplicationError::Network(_))
        ));
    }
}
