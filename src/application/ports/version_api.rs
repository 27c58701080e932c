//! Version API Port - 文件历史版本

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::domain::project::ProjectId;

/// 后端保存的一个文件版本
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileVersion {
    pub version_id: String,
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub content_hash: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub word_count: u64,
}

/// Version API Port
///
/// `path` 是相对项目目录的文件路径
#[async_trait]
pub trait VersionApiPort: Send + Sync {
    /// POST /api/versions/:project/list `{path}`
    async fn list_versions(
        &self,
        project: &ProjectId,
        path: &str,
    ) -> Result<Vec<FileVersion>, ApiError>;

    /// POST /api/versions/:project/restore `{path, version_id}`
    ///
    /// 版本不存在时返回 false；恢复前后端会把当前内容另存为一个版本
    async fn restore_version(
        &self,
        project: &ProjectId,
        path: &str,
        version_id: &str,
    ) -> Result<bool, ApiError>;
}
