//! Project Context - Value Objects

use serde::{Deserialize, Serialize};

/// 项目唯一标识（项目名即主键）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    pub fn new(name: impl Into<String>) -> Result<Self, &'static str> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err("项目名称不能为空");
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 编辑器当前选中的结构节点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selection {
    /// 总纲
    Master,
    /// 卷纲
    Volume(u32),
    /// 章节（章纲 + 正文）
    Chapter { volume: u32, chapter: u32 },
}

impl Selection {
    pub fn chapter(volume: u32, chapter: u32) -> Self {
        Self::Chapter { volume, chapter }
    }

    pub fn is_chapter(&self) -> bool {
        matches!(self, Self::Chapter { .. })
    }

    /// 章节号（仅章节选择有效）
    pub fn chapter_num(&self) -> Option<u32> {
        match self {
            Self::Chapter { chapter, .. } => Some(*chapter),
            _ => None,
        }
    }

    pub fn volume_num(&self) -> Option<u32> {
        match self {
            Self::Master => None,
            Self::Volume(volume) | Self::Chapter { volume, .. } => Some(*volume),
        }
    }

    /// 工具栏显示的标题
    pub fn label(&self) -> String {
        match self {
            Self::Master => "总纲".to_string(),
            Self::Volume(volume) => format!("第 {} 卷 - 卷纲", volume),
            Self::Chapter { volume, chapter } => {
                format!("第 {} 卷 - 第 {} 章", volume, chapter)
            }
        }
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self::Master
    }
}

/// 纲要保存目标（对应 structure/node 接口的 type 字段）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeRef {
    Master,
    Volume { filename: Option<String> },
    Script { filename: Option<String> },
}

impl NodeRef {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Master => "master",
            Self::Volume { .. } => "volume",
            Self::Script { .. } => "script",
        }
    }

    pub fn filename(&self) -> Option<&str> {
        match self {
            Self::Master => None,
            Self::Volume { filename } | Self::Script { filename } => filename.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_id_rejects_blank() {
        assert!(ProjectId::new("  ").is_err());
        assert_eq!(ProjectId::new("剑来").unwrap().as_str(), "剑来");
    }

    #[test]
    fn test_selection_labels() {
        assert_eq!(Selection::Master.label(), "总纲");
        assert_eq!(Selection::Volume(2).label(), "第 2 卷 - 卷纲");
        assert_eq!(Selection::chapter(1, 5).label(), "第 1 卷 - 第 5 章");
    }

    #[test]
    fn test_selection_accessors() {
        let selection = Selection::chapter(3, 7);
        assert!(selection.is_chapter());
        assert_eq!(selection.chapter_num(), Some(7));
        assert_eq!(selection.volume_num(), Some(3));
        assert_eq!(Selection::Master.volume_num(), None);
    }
}
