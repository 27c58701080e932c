//! Structure Command Handlers

use std::sync::Arc;

use crate::application::commands::{AddChapter, AddVolume, GenerateStructure};
use crate::application::error::ApplicationError;
use crate::application::ports::ProjectApiPort;
use crate::domain::project::{ProjectId, Structure};

/// 结构变更后的结果：新文件名与刷新后的结构树
#[derive(Debug, Clone)]
pub struct StructureChanged {
    pub filename: Option<String>,
    pub message: Option<String>,
    pub structure: Structure,
}

async fn refreshed(
    api: &dyn ProjectApiPort,
    project: &ProjectId,
) -> Result<Structure, ApplicationError> {
    Ok(api.get_structure(project).await?.normalized())
}

// ============================================================================
// AddVolume
// ============================================================================

pub struct AddVolumeHandler {
    api: Arc<dyn ProjectApiPort>,
}

impl AddVolumeHandler {
    pub fn new(api: Arc<dyn ProjectApiPort>) -> Self {
        Self { api }
    }

    pub async fn handle(&self, command: AddVolume) -> Result<StructureChanged, ApplicationError> {
        let filename = self.api.create_volume(&command.project).await?;
        let structure = refreshed(self.api.as_ref(), &command.project).await?;

        tracing::info!(
            project = %command.project,
            filename = ?filename,
            volumes = structure.volumes.len(),
            "Volume added"
        );

        Ok(StructureChanged {
            filename,
            message: None,
            structure,
        })
    }
}

// ============================================================================
// AddChapter
// ============================================================================

pub struct AddChapterHandler {
    api: Arc<dyn ProjectApiPort>,
}

impl AddChapterHandler {
    pub fn new(api: Arc<dyn ProjectApiPort>) -> Self {
        Self { api }
    }

    pub async fn handle(&self, command: AddChapter) -> Result<StructureChanged, ApplicationError> {
        let current = refreshed(self.api.as_ref(), &command.project).await?;
        if current.volume(command.vol_num).is_none() {
            return Err(ApplicationError::not_found(
                "Volume",
                command.vol_num.to_string(),
            ));
        }

        let filename = self
            .api
            .create_chapter(&command.project, command.vol_num)
            .await?;
        let structure = refreshed(self.api.as_ref(), &command.project).await?;

        tracing::info!(
            project = %command.project,
            vol_num = command.vol_num,
            filename = ?filename,
            "Chapter added"
        );

        Ok(StructureChanged {
            filename,
            message: None,
            structure,
        })
    }
}

// ============================================================================
// GenerateStructure
// ============================================================================

pub struct GenerateStructureHandler {
    api: Arc<dyn ProjectApiPort>,
}

impl GenerateStructureHandler {
    pub fn new(api: Arc<dyn ProjectApiPort>) -> Self {
        Self { api }
    }

    pub async fn handle(
        &self,
        command: GenerateStructure,
    ) -> Result<StructureChanged, ApplicationError> {
        if command.master_outline.trim().is_empty() {
            return Err(ApplicationError::precondition("请先填写总纲"));
        }
        if command.volume_count == 0 {
            return Err(ApplicationError::validation("卷数必须大于 0"));
        }

        let message = self
            .api
            .generate_structure(&command.project, &command.master_outline, command.volume_count)
            .await?;
        let structure = refreshed(self.api.as_ref(), &command.project).await?;

        tracing::info!(
            project = %command.project,
            volume_count = command.volume_count,
            chapters = structure.total_chapters(),
            "Structure generated"
        );

        Ok(StructureChanged {
            filename: None,
            message: Some(message),
            structure,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::project::{Project, Volume};
    use crate::infrastructure::memory::InMemoryBackend;

    fn seeded() -> (Arc<InMemoryBackend>, ProjectId) {
        let backend = Arc::new(InMemoryBackend::new());
        backend.seed_project(
            Project {
                name: "p".to_string(),
                ..Default::default()
            },
            Structure {
                volumes: vec![Volume {
                    vol_num: 1,
                    ..Default::default()
                }],
                ..Default::default()
            },
        );
        (backend, ProjectId::new("p").unwrap())
    }

    #[tokio::test]
    async fn test_add_volume_and_chapter() {
        let (backend, project) = seeded();

        let result = AddVolumeHandler::new(backend.clone())
            .handle(AddVolume {
                project: project.clone(),
            })
            .await
            .unwrap();
        assert_eq!(result.structure.volumes.len(), 2);
        assert_eq!(result.structure.volumes[1].vol_num, 2);

        let result = AddChapterHandler::new(backend.clone())
            .handle(AddChapter {
                project: project.clone(),
                vol_num: 2,
            })
            .await
            .unwrap();
        assert_eq!(result.structure.volume(2).unwrap().chapter_count(), 1);
        assert!(result.filename.is_some());

        let err = AddChapterHandler::new(backend)
            .handle(AddChapter {
                project,
                vol_num: 9,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_generate_structure_requires_master_outline() {
        let (backend, project) = seeded();
        let handler = GenerateStructureHandler::new(backend);

        let err = handler
            .handle(GenerateStructure {
                project: project.clone(),
                master_outline: " ".to_string(),
                volume_count: 2,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::Precondition(_)));

        let result = handler
            .handle(GenerateStructure {
                project,
                master_outline: "少年成长".to_string(),
                volume_count: 3,
            })
            .await
            .unwrap();
        assert_eq!(result.structure.volumes.len(), 3);
        assert_eq!(result.structure.master_outline, "少年成长");
    }
}
