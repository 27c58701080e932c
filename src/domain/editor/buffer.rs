//! 编辑缓冲区的值类型

use serde::{Deserialize, Serialize};

/// 缓冲区种类：章纲/纲要 或 正文
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Outline,
    Chapter,
}

impl BufferKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BufferKind::Outline => "outline",
            BufferKind::Chapter => "chapter",
        }
    }
}

/// 保存状态
///
/// 状态流转: saved → unsaved → saving → {saved | unsaved}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SaveStatus {
    #[default]
    Saved,
    Saving,
    Unsaved,
}

impl SaveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaveStatus::Saved => "saved",
            SaveStatus::Saving => "saving",
            SaveStatus::Unsaved => "unsaved",
        }
    }

    /// 工具栏徽标文字
    pub fn label(&self) -> &'static str {
        match self {
            SaveStatus::Saved => "已保存",
            SaveStatus::Saving => "保存中...",
            SaveStatus::Unsaved => "未保存",
        }
    }

    /// 合并两个缓冲区的状态：saving 优先，其次 unsaved
    pub fn combine(self, other: SaveStatus) -> SaveStatus {
        match (self, other) {
            (SaveStatus::Saving, _) | (_, SaveStatus::Saving) => SaveStatus::Saving,
            (SaveStatus::Unsaved, _) | (_, SaveStatus::Unsaved) => SaveStatus::Unsaved,
            _ => SaveStatus::Saved,
        }
    }
}

/// 缓冲区对快照（撤销历史的单元）
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    pub outline: String,
    pub chapter: String,
}

impl Snapshot {
    pub fn new(outline: impl Into<String>, chapter: impl Into<String>) -> Self {
        Self {
            outline: outline.into(),
            chapter: chapter.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_status() {
        assert_eq!(SaveStatus::Saved.combine(SaveStatus::Saved), SaveStatus::Saved);
        assert_eq!(SaveStatus::Saved.combine(SaveStatus::Unsaved), SaveStatus::Unsaved);
        assert_eq!(SaveStatus::Unsaved.combine(SaveStatus::Saving), SaveStatus::Saving);
    }
}
