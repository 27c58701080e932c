//! Export Command Handlers

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

use crate::application::commands::ExportProject;
use crate::application::error::ApplicationError;
use crate::application::ports::ExportApiPort;

/// ExportProject Handler - 导出、下载并写入本地文件
pub struct ExportProjectHandler {
    api: Arc<dyn ExportApiPort>,
}

impl ExportProjectHandler {
    pub fn new(api: Arc<dyn ExportApiPort>) -> Self {
        Self { api }
    }

    pub async fn handle(&self, command: ExportProject) -> Result<PathBuf, ApplicationError> {
        let filename = self.api.export(&command.project, command.format).await?;

        // 服务端文件名只取最后一段
        let local_name = Path::new(&filename)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("{}.{}", command.project, command.format));

        let bytes = self.api.download(&command.project, &filename).await?;

        fs::create_dir_all(&command.out_dir)
            .await
            .map_err(|e| ApplicationError::invalid_state(format!("无法创建目录: {}", e)))?;
        let path = command.out_dir.join(local_name);
        fs::write(&path, &bytes)
            .await
            .map_err(|e| ApplicationError::invalid_state(format!("无法写入文件: {}", e)))?;

        tracing::info!(
            project = %command.project,
            format = %command.format,
            path = %path.display(),
            bytes = bytes.len(),
            "Project exported"
        );

        Ok(path)
    }
}
