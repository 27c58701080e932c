//! Project Context - Entities

use serde::{Deserialize, Serialize};

/// 项目摘要（项目列表中的一项）
///
/// 后端返回的字段并不完整，缺失字段使用默认值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Project {
    pub name: String,
    pub title: String,
    pub genre: String,
    pub current_volume: u32,
    pub current_chapter: u32,
    pub target_words: u64,
    pub words_per_chapter: u64,
    pub modified: Option<String>,
    pub word_count: u64,
}

impl Project {
    /// 显示名称：优先使用书名
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.name
        } else {
            &self.title
        }
    }
}

/// 卷
///
/// 不变量:
/// - vol_num 在项目内唯一，且为排序键
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Volume {
    pub vol_num: u32,
    /// 卷纲内容
    pub content: String,
    pub filename: Option<String>,
    pub scripts: Vec<Script>,
}

impl Volume {
    pub fn script(&self, script_num: u32) -> Option<&Script> {
        self.scripts.iter().find(|s| s.script_num == script_num)
    }

    pub fn script_mut(&mut self, script_num: u32) -> Option<&mut Script> {
        self.scripts.iter_mut().find(|s| s.script_num == script_num)
    }

    pub fn chapter_count(&self) -> usize {
        self.scripts.len()
    }

    pub fn word_count(&self) -> u64 {
        self.scripts.iter().map(|s| s.word_count).sum()
    }
}

/// 章节（章纲节点）
///
/// 正文与章纲分开存储，按需加载
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Script {
    pub script_num: u32,
    /// 章纲内容
    pub content: String,
    pub filename: Option<String>,
    /// 正文字数
    pub word_count: u64,
}
