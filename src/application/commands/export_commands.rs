//! Export Commands

use std::path::PathBuf;

use crate::application::ports::ExportFormat;
use crate::domain::project::ProjectId;

/// 导出项目并下载到本地目录
#[derive(Debug, Clone)]
pub struct ExportProject {
    pub project: ProjectId,
    pub format: ExportFormat,
    pub out_dir: PathBuf,
}
