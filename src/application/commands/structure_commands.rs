//! Structure Commands - 结构树写操作

use crate::domain::project::ProjectId;

/// 新建卷
#[derive(Debug, Clone)]
pub struct AddVolume {
    pub project: ProjectId,
}

/// 在指定卷下新建章节
#[derive(Debug, Clone)]
pub struct AddChapter {
    pub project: ProjectId,
    pub vol_num: u32,
}

/// 根据总纲让 AI 生成卷/章结构
#[derive(Debug, Clone)]
pub struct GenerateStructure {
    pub project: ProjectId,
    pub master_outline: String,
    pub volume_count: u32,
}
