//! 带防抖自动保存的文本缓冲区
//!
//! 每个缓冲区持有自己的计时器句柄：新的编辑会中止并替换上一个计时器
//! （尾沿防抖）。计时器到期后把保存交给独立任务执行，之后的按键只会
//! 取消计时器，不会取消进行中的请求。
//!
//! 同一缓冲区的保存由 `save_lock` 串行化；拿到锁后若内容已在当前
//! revision 保存过则直接跳过。

use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::task::AbortHandle;
use tokio::time::sleep;

use super::{lock, write};
use crate::application::error::ApplicationError;
use crate::application::ports::{ApiError, Notification, NotifierPort, ProjectApiPort};
use crate::domain::editor::{BufferKind, SaveStatus};
use crate::domain::project::{NodeRef, ProjectId, Selection, Structure};
use crate::domain::text_stats::word_count;

/// 缓冲区内容写回的位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SaveTarget {
    /// 总纲 / 卷纲 / 章纲节点
    Outline {
        project: ProjectId,
        selection: Selection,
        node: NodeRef,
    },
    /// 章节正文
    Chapter {
        project: ProjectId,
        volume: u32,
        chapter: u32,
    },
}

/// 保存触发来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SaveTrigger {
    Auto,
    Manual,
}

impl SaveTrigger {
    fn as_str(&self) -> &'static str {
        match self {
            SaveTrigger::Auto => "auto",
            SaveTrigger::Manual => "manual",
        }
    }
}

/// 执行保存所需的依赖
#[derive(Clone)]
pub(crate) struct Saver {
    projects: Arc<dyn ProjectApiPort>,
    notifier: Arc<dyn NotifierPort>,
    structure: Arc<RwLock<Structure>>,
}

impl Saver {
    pub(crate) fn new(
        projects: Arc<dyn ProjectApiPort>,
        notifier: Arc<dyn NotifierPort>,
        structure: Arc<RwLock<Structure>>,
    ) -> Self {
        Self {
            projects,
            notifier,
            structure,
        }
    }

    async fn persist(&self, target: &SaveTarget, text: &str) -> Result<(), ApiError> {
        match target {
            SaveTarget::Outline { project, node, .. } => {
                self.projects.save_node(project, node, text).await?;
            }
            SaveTarget::Chapter {
                project, chapter, ..
            } => {
                self.projects.save_chapter(project, *chapter, text).await?;
            }
        }
        Ok(())
    }

    /// 保存成功后同步本地结构树
    fn apply(&self, target: &SaveTarget, text: &str) {
        let mut structure = write(&self.structure);
        match target {
            SaveTarget::Outline { selection, .. } => structure.set_outline(selection, text),
            SaveTarget::Chapter {
                volume, chapter, ..
            } => structure.set_word_count(*volume, *chapter, word_count(text) as u64),
        }
    }
}

#[derive(Debug, Default)]
struct BufferState {
    text: String,
    revision: u64,
    saved_revision: u64,
    status: SaveStatus,
    /// 每次重新加载递增，旧保存的结果不会落到新内容上
    epoch: u64,
    target: Option<SaveTarget>,
}

/// 带保存状态机的单个缓冲区
pub(crate) struct TrackedBuffer {
    kind: BufferKind,
    state: Mutex<BufferState>,
    timer: Mutex<Option<AbortHandle>>,
    save_lock: tokio::sync::Mutex<()>,
}

impl TrackedBuffer {
    pub(crate) fn new(kind: BufferKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            state: Mutex::new(BufferState::default()),
            timer: Mutex::new(None),
            save_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub(crate) fn text(&self) -> String {
        lock(&self.state).text.clone()
    }

    pub(crate) fn status(&self) -> SaveStatus {
        lock(&self.state).status
    }

    pub(crate) fn is_dirty(&self) -> bool {
        let state = lock(&self.state);
        state.revision != state.saved_revision
    }

    /// 载入新内容：取消计时器，不保存旧内容，状态回到 saved
    pub(crate) fn load(&self, text: String, target: Option<SaveTarget>) {
        self.cancel_timer();
        let mut state = lock(&self.state);
        state.text = text;
        state.revision += 1;
        state.saved_revision = state.revision;
        state.status = SaveStatus::Saved;
        state.epoch += 1;
        state.target = target;
    }

    /// 替换内容，返回内容是否变化
    pub(crate) fn replace(&self, text: &str) -> bool {
        let mut state = lock(&self.state);
        if state.text == text {
            return false;
        }
        state.text = text.to_string();
        state.revision += 1;
        state.status = SaveStatus::Unsaved;
        true
    }

    /// 当前载入代数，每次 `load` 递增
    pub(crate) fn epoch(&self) -> u64 {
        lock(&self.state).epoch
    }

    /// 仅当缓冲区仍是 `epoch` 那一代时替换，返回是否写入
    pub(crate) fn replace_in(&self, epoch: u64, text: &str) -> bool {
        let mut state = lock(&self.state);
        if state.epoch != epoch || state.text == text {
            return false;
        }
        state.text = text.to_string();
        state.revision += 1;
        state.status = SaveStatus::Unsaved;
        true
    }

    /// 追加内容（流式生成），缓冲区已重新载入时丢弃
    pub(crate) fn append_in(&self, epoch: u64, chunk: &str) -> bool {
        let mut state = lock(&self.state);
        if chunk.is_empty() || state.epoch != epoch {
            return false;
        }
        state.text.push_str(chunk);
        state.revision += 1;
        state.status = SaveStatus::Unsaved;
        true
    }

    pub(crate) fn cancel_timer(&self) {
        if let Some(handle) = lock(&self.timer).take() {
            handle.abort();
        }
    }

    /// 重新开始防抖计时
    pub(crate) fn schedule(self: &Arc<Self>, saver: Saver, delay: Duration) {
        let buffer = Arc::clone(self);
        let mut timer = lock(&self.timer);
        if let Some(existing) = timer.take() {
            existing.abort();
        }

        let handle = tokio::spawn(async move {
            sleep(delay).await;
            tokio::spawn(async move {
                // 失败已通过通知上报
                let _ = buffer.flush(&saver, SaveTrigger::Auto).await;
            });
        });

        *timer = Some(handle.abort_handle());
        tracing::debug!(
            buffer = self.kind.as_str(),
            delay_ms = delay.as_millis() as u64,
            "Autosave scheduled"
        );
    }

    /// 立即保存，返回是否真的发出了请求
    pub(crate) async fn flush(
        &self,
        saver: &Saver,
        trigger: SaveTrigger,
    ) -> Result<bool, ApplicationError> {
        let _guard = self.save_lock.lock().await;

        let (text, revision, epoch, target) = {
            let mut state = lock(&self.state);
            let Some(target) = state.target.clone() else {
                return Ok(false);
            };
            if state.revision == state.saved_revision {
                state.status = SaveStatus::Saved;
                return Ok(false);
            }
            state.status = SaveStatus::Saving;
            (state.text.clone(), state.revision, state.epoch, target)
        };

        let result = saver.persist(&target, &text).await;

        let mut state = lock(&self.state);
        if state.epoch != epoch {
            drop(state);
            tracing::debug!(
                buffer = self.kind.as_str(),
                "Save finished after buffer was reloaded"
            );
            if let Err(e) = result {
                tracing::warn!(
                    buffer = self.kind.as_str(),
                    trigger = trigger.as_str(),
                    error = %e,
                    "Save of reloaded buffer failed"
                );
                if trigger == SaveTrigger::Auto {
                    saver.notifier.notify(Notification::error("自动保存失败"));
                }
                return Err(e.into());
            }
            saver.apply(&target, &text);
            return Ok(true);
        }

        match result {
            Ok(()) => {
                state.saved_revision = revision;
                state.status = if state.revision == revision {
                    SaveStatus::Saved
                } else {
                    SaveStatus::Unsaved
                };
                drop(state);
                saver.apply(&target, &text);
                tracing::info!(
                    buffer = self.kind.as_str(),
                    trigger = trigger.as_str(),
                    revision = revision,
                    chars = text.chars().count(),
                    "Buffer saved"
                );
                Ok(true)
            }
            Err(e) => {
                state.status = SaveStatus::Unsaved;
                drop(state);
                tracing::warn!(
                    buffer = self.kind.as_str(),
                    trigger = trigger.as_str(),
                    error = %e,
                    "Buffer save failed"
                );
                if trigger == SaveTrigger::Auto {
                    saver.notifier.notify(Notification::error("自动保存失败"));
                }
                Err(e.into())
            }
        }
    }
}
