//! Export API Port - 导出与下载

use async_trait::async_trait;

use super::ApiError;
use crate::domain::project::ProjectId;

/// 导出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Txt,
    Docx,
    Epub,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Txt => "txt",
            ExportFormat::Docx => "docx",
            ExportFormat::Epub => "epub",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "txt" => Some(Self::Txt),
            "docx" => Some(Self::Docx),
            "epub" => Some(Self::Epub),
            _ => None,
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Export API Port
#[async_trait]
pub trait ExportApiPort: Send + Sync {
    /// POST /api/export/:format，返回生成的文件名
    async fn export(&self, project: &ProjectId, format: ExportFormat) -> Result<String, ApiError>;

    /// GET /api/export/:id/download/:filename
    async fn download(&self, project: &ProjectId, filename: &str) -> Result<Vec<u8>, ApiError>;
}
