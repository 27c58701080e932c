//! Project Store

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::ProjectApiPort;
use crate::domain::project::Project;

/// 项目列表仓库
///
/// 当前项目只记录名称，`current()` 每次在列表中查找，
/// 列表刷新后自然指向最新数据。
pub struct ProjectStore {
    api: Arc<dyn ProjectApiPort>,
    projects: Vec<Project>,
    current: Option<String>,
}

impl ProjectStore {
    pub fn new(api: Arc<dyn ProjectApiPort>) -> Self {
        Self {
            api,
            projects: Vec::new(),
            current: None,
        }
    }

    /// 重新获取项目列表
    pub async fn fetch_projects(&mut self) -> Result<&[Project], ApplicationError> {
        self.projects = self.api.list_projects().await?;
        tracing::debug!(count = self.projects.len(), "Projects fetched");
        Ok(&self.projects)
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    /// 载入并设为当前项目
    ///
    /// 列表为空时先获取；找不到时再刷新一次，仍找不到返回 NotFound
    pub async fn load_project(&mut self, name: &str) -> Result<&Project, ApplicationError> {
        if self.projects.is_empty() || !self.contains(name) {
            self.fetch_projects().await?;
        }
        if !self.contains(name) {
            return Err(ApplicationError::not_found("Project", name));
        }

        self.current = Some(name.to_string());
        tracing::info!(project = %name, "Project loaded");
        self.current()
            .ok_or_else(|| ApplicationError::not_found("Project", name))
    }

    pub fn current(&self) -> Option<&Project> {
        let name = self.current.as_deref()?;
        self.projects.iter().find(|p| p.name == name)
    }

    pub fn set_current(&mut self, name: Option<&str>) {
        self.current = name.map(str::to_string);
    }

    fn contains(&self, name: &str) -> bool {
        self.projects.iter().any(|p| p.name == name)
    }
}
