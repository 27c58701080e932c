//! Genesis Store - 新书创建向导
//!
//! 灵感 → AI 方案 → 选定方案 → 初始化项目

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{GenesisApiPort, Proposal};
use crate::domain::project::ProjectId;

/// 项目名只保留字母、数字、下划线与汉字，其余替换为下划线
pub fn safe_project_name(title: &str) -> String {
    title
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || ('\u{4e00}'..='\u{9fa5}').contains(&c) {
                c
            } else {
                '_'
            }
        })
        .collect()
}

pub struct GenesisStore {
    api: Arc<dyn GenesisApiPort>,
    inspiration: String,
    proposals: Vec<Proposal>,
    selected: Option<usize>,
    loading: bool,
    error: Option<String>,
}

impl GenesisStore {
    pub fn new(api: Arc<dyn GenesisApiPort>) -> Self {
        Self {
            api,
            inspiration: String::new(),
            proposals: Vec::new(),
            selected: None,
            loading: false,
            error: None,
        }
    }

    pub fn set_inspiration(&mut self, text: impl Into<String>) {
        self.inspiration = text.into();
    }

    pub fn inspiration(&self) -> &str {
        &self.inspiration
    }

    pub fn proposals(&self) -> &[Proposal] {
        &self.proposals
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// 最近一次失败的描述
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// 根据灵感生成方案，旧方案与选择被清空
    pub async fn generate_proposals(&mut self) -> Result<&[Proposal], ApplicationError> {
        if self.inspiration.trim().is_empty() {
            let err = ApplicationError::validation("请输入灵感");
            self.error = Some(err.user_message());
            return Err(err);
        }

        self.loading = true;
        self.error = None;
        let result = self.api.propose(self.inspiration.trim()).await;
        self.loading = false;

        match result {
            Ok(proposals) => {
                tracing::info!(count = proposals.len(), "Proposals generated");
                self.proposals = proposals;
                self.selected = None;
                Ok(&self.proposals)
            }
            Err(e) => {
                let err = ApplicationError::from(e);
                self.error = Some(err.user_message());
                Err(err)
            }
        }
    }

    pub fn select(&mut self, index: usize) -> Result<&Proposal, ApplicationError> {
        let proposal = self
            .proposals
            .get(index)
            .ok_or_else(|| ApplicationError::not_found("Proposal", index.to_string()))?;
        self.selected = Some(index);
        Ok(proposal)
    }

    pub fn selected(&self) -> Option<&Proposal> {
        self.selected.and_then(|i| self.proposals.get(i))
    }

    /// 初始化项目
    ///
    /// `name` 为空时使用选中方案的书名；`config_yaml` 为空时使用选中方案的配置
    pub async fn initialize_project(
        &mut self,
        name: Option<&str>,
        config_yaml: Option<&str>,
    ) -> Result<ProjectId, ApplicationError> {
        let selected = self.selected().cloned();
        let title = name
            .map(str::to_string)
            .or_else(|| selected.as_ref().map(|p| p.title.clone()))
            .unwrap_or_default();
        let safe_name = safe_project_name(&title);
        let project = ProjectId::new(safe_name.clone())
            .map_err(|_| ApplicationError::validation("请先选择方案或填写项目名称"))?;

        let config_yaml = config_yaml
            .map(str::to_string)
            .or_else(|| selected.map(|p| p.config_yaml))
            .unwrap_or_default();
        if config_yaml.trim().is_empty() {
            let err = ApplicationError::validation("缺少项目配置");
            self.error = Some(err.user_message());
            return Err(err);
        }

        self.loading = true;
        let result = self.api.init_project(&safe_name, &config_yaml).await;
        self.loading = false;

        match result {
            Ok(()) => {
                tracing::info!(project = %project, "Project initialized");
                self.error = None;
                Ok(project)
            }
            Err(e) => {
                let err = ApplicationError::from(e);
                self.error = Some(err.user_message());
                Err(err)
            }
        }
    }

    /// 回到初始状态
    pub fn reset(&mut self) {
        self.inspiration.clear();
        self.proposals.clear();
        self.selected = None;
        self.loading = false;
        self.error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::ProjectApiPort;
    use crate::infrastructure::memory::InMemoryBackend;

    #[test]
    fn test_safe_project_name() {
        assert_eq!(safe_project_name("斗破 苍穹!"), "斗破_苍穹_");
        assert_eq!(safe_project_name("my-novel_2"), "my_novel_2");
    }

    #[tokio::test]
    async fn test_empty_inspiration_is_rejected() {
        let backend = Arc::new(InMemoryBackend::new());
        let mut store = GenesisStore::new(backend);
        store.set_inspiration("   ");
        let err = store.generate_proposals().await.unwrap_err();
        assert!(matches!(err, ApplicationError::Validation(_)));
        assert_eq!(store.error(), Some("请输入灵感"));
    }

    #[tokio::test]
    async fn test_wizard_flow_initializes_project() {
        let backend = Arc::new(InMemoryBackend::new());
        let mut store = GenesisStore::new(backend.clone());
        store.set_inspiration("废柴少年逆袭");

        let proposals = store.generate_proposals().await.unwrap();
        assert!(!proposals.is_empty());
        assert!(store.selected().is_none());

        let title = store.select(0).unwrap().title.clone();
        let project = store.initialize_project(None, None).await.unwrap();
        assert_eq!(project.as_str(), safe_project_name(&title));

        let projects = backend.list_projects().await.unwrap();
        assert!(projects.iter().any(|p| p.name == project.as_str()));
        assert!(store.error().is_none());
    }

    #[tokio::test]
    async fn test_initialize_without_selection_or_name_fails() {
        let backend = Arc::new(InMemoryBackend::new());
        let mut store = GenesisStore::new(backend);
        let err = store.initialize_project(None, None).await.unwrap_err();
        assert!(matches!(err, ApplicationError::Validation(_)));
    }
}
