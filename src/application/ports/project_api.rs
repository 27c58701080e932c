//! Project API Port - 项目、结构树与正文
//!
//! 具体实现在 infrastructure/http（HTTP）与 infrastructure/memory（内存）

use async_trait::async_trait;

use super::ApiError;
use crate::domain::project::{NodeRef, Project, ProjectId, Structure};

/// Project API Port
#[async_trait]
pub trait ProjectApiPort: Send + Sync {
    /// GET /api/projects
    async fn list_projects(&self) -> Result<Vec<Project>, ApiError>;

    /// GET /api/projects/:id
    async fn get_project(&self, project: &ProjectId) -> Result<Project, ApiError>;

    /// GET /api/project/:id/structure
    async fn get_structure(&self, project: &ProjectId) -> Result<Structure, ApiError>;

    /// POST /api/project/:id/structure/node
    ///
    /// 返回后端写入的文件名
    async fn save_node(
        &self,
        project: &ProjectId,
        node: &NodeRef,
        content: &str,
    ) -> Result<Option<String>, ApiError>;

    /// 新建卷（不带 filename 的 volume 节点）
    async fn create_volume(&self, project: &ProjectId) -> Result<Option<String>, ApiError>;

    /// 在指定卷下新建章节
    async fn create_chapter(
        &self,
        project: &ProjectId,
        vol_num: u32,
    ) -> Result<Option<String>, ApiError>;

    /// GET /api/project/:id/chapter/:num
    async fn get_chapter(&self, project: &ProjectId, chapter_num: u32) -> Result<String, ApiError>;

    /// POST /api/project/:id/chapter/:num
    async fn save_chapter(
        &self,
        project: &ProjectId,
        chapter_num: u32,
        content: &str,
    ) -> Result<(), ApiError>;

    /// POST /api/project/:id/structure/generate
    ///
    /// 返回后端消息
    async fn generate_structure(
        &self,
        project: &ProjectId,
        master_outline: &str,
        volume_count: u32,
    ) -> Result<String, ApiError>;
}
