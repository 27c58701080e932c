//! Project Context - Errors

use thiserror::Error;

use super::Selection;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("卷不存在: 第 {0} 卷")]
    VolumeNotFound(u32),

    #[error("章节不存在: 第 {volume} 卷 第 {chapter} 章")]
    ChapterNotFound { volume: u32, chapter: u32 },

    #[error("无效的选择: {0:?}")]
    InvalidSelection(Selection),
}
