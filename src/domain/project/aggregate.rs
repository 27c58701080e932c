//! Project Context - Aggregate Root

use serde::{Deserialize, Serialize};

use super::{NodeRef, ProjectError, Script, Selection, Volume};

/// 项目结构树聚合根：总纲 → 卷 → 章
///
/// 不变量:
/// - volumes 按 vol_num 升序
/// - 卷内 scripts 按 script_num 升序
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Structure {
    pub title: String,
    pub master_outline: String,
    pub volumes: Vec<Volume>,
}

impl Structure {
    /// 排序卷和章节，保证不变量
    pub fn normalized(mut self) -> Self {
        self.volumes.sort_by_key(|v| v.vol_num);
        for volume in &mut self.volumes {
            volume.scripts.sort_by_key(|s| s.script_num);
        }
        self
    }

    pub fn volume(&self, vol_num: u32) -> Option<&Volume> {
        self.volumes.iter().find(|v| v.vol_num == vol_num)
    }

    pub fn script(&self, vol_num: u32, script_num: u32) -> Option<&Script> {
        self.volume(vol_num).and_then(|v| v.script(script_num))
    }

    /// 检查选择是否指向存在的节点
    pub fn validate(&self, selection: &Selection) -> Result<(), ProjectError> {
        match *selection {
            Selection::Master => Ok(()),
            Selection::Volume(volume) => self
                .volume(volume)
                .map(|_| ())
                .ok_or(ProjectError::VolumeNotFound(volume)),
            Selection::Chapter { volume, chapter } => {
                let vol = self
                    .volume(volume)
                    .ok_or(ProjectError::VolumeNotFound(volume))?;
                vol.script(chapter)
                    .map(|_| ())
                    .ok_or(ProjectError::ChapterNotFound { volume, chapter })
            }
        }
    }

    /// 选中节点的纲要文本
    pub fn outline_for(&self, selection: &Selection) -> String {
        match *selection {
            Selection::Master => self.master_outline.clone(),
            Selection::Volume(volume) => self
                .volume(volume)
                .map(|v| v.content.clone())
                .unwrap_or_default(),
            Selection::Chapter { volume, chapter } => self
                .script(volume, chapter)
                .map(|s| s.content.clone())
                .unwrap_or_default(),
        }
    }

    /// 选中节点的纲要保存目标
    pub fn node_for(&self, selection: &Selection) -> NodeRef {
        match *selection {
            Selection::Master => NodeRef::Master,
            Selection::Volume(volume) => NodeRef::Volume {
                filename: self.volume(volume).and_then(|v| v.filename.clone()),
            },
            Selection::Chapter { volume, chapter } => NodeRef::Script {
                filename: self.script(volume, chapter).and_then(|s| s.filename.clone()),
            },
        }
    }

    /// 同步本地树中的纲要文本（保存成功后调用）
    pub fn set_outline(&mut self, selection: &Selection, text: &str) {
        match *selection {
            Selection::Master => self.master_outline = text.to_string(),
            Selection::Volume(volume) => {
                if let Some(v) = self.volumes.iter_mut().find(|v| v.vol_num == volume) {
                    v.content = text.to_string();
                }
            }
            Selection::Chapter { volume, chapter } => {
                if let Some(s) = self
                    .volumes
                    .iter_mut()
                    .find(|v| v.vol_num == volume)
                    .and_then(|v| v.script_mut(chapter))
                {
                    s.content = text.to_string();
                }
            }
        }
    }

    /// 同步本地树中的章节字数
    pub fn set_word_count(&mut self, volume: u32, chapter: u32, word_count: u64) {
        if let Some(s) = self
            .volumes
            .iter_mut()
            .find(|v| v.vol_num == volume)
            .and_then(|v| v.script_mut(chapter))
        {
            s.word_count = word_count;
        }
    }

    pub fn next_volume_number(&self) -> u32 {
        self.volumes.iter().map(|v| v.vol_num).max().unwrap_or(0) + 1
    }

    pub fn total_chapters(&self) -> usize {
        self.volumes.iter().map(Volume::chapter_count).sum()
    }

    pub fn total_words(&self) -> u64 {
        self.volumes.iter().map(Volume::word_count).sum()
    }
}
