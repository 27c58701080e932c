//! 章纲/正文编辑会话
//!
//! 一个会话对应一个打开的项目。会话持有两个带自动保存的缓冲区
//! （纲要、正文）、撤销历史和当前选择；所有操作都通过 `&self`
//! 调用，可在多个任务间共享（克隆即共享同一会话）。

use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::autosave::{SaveTarget, SaveTrigger, Saver, TrackedBuffer};
use super::{lock, read};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    BackendPorts, GenerationApiPort, Notification, NotifierPort, ProjectApiPort,
};
use crate::config::EditorConfig;
use crate::domain::editor::{BufferKind, History, SaveStatus, Snapshot};
use crate::domain::project::{ProjectId, Selection, Structure};
use crate::domain::text_stats::word_count;

pub(super) const MSG_SELECT_CHAPTER: &str = "请先选择一个章节";
pub(super) const MSG_READ_ONLY: &str = "正在生成中，正文只读";

pub(super) struct SessionInner {
    pub(super) project: ProjectId,
    pub(super) projects: Arc<dyn ProjectApiPort>,
    pub(super) generation: Arc<dyn GenerationApiPort>,
    pub(super) notifier: Arc<dyn NotifierPort>,
    pub(super) structure: Arc<RwLock<Structure>>,
    pub(super) saver: Saver,
    pub(super) autosave_delay: Duration,
    pub(super) selection: Mutex<Selection>,
    pub(super) outline: Arc<TrackedBuffer>,
    pub(super) chapter: Arc<TrackedBuffer>,
    pub(super) history: Mutex<History>,
    /// Some 表示正在生成
    pub(super) active_generation: Mutex<Option<ActiveToken>>,
    pub(super) generation_seq: AtomicU64,
}

/// 当前生成的标识与取消令牌
pub(super) struct ActiveToken {
    pub(super) id: u64,
    pub(super) token: CancellationToken,
}

/// 编辑会话
#[derive(Clone)]
pub struct EditorSession {
    pub(super) inner: Arc<SessionInner>,
}

impl EditorSession {
    /// 打开项目：加载结构树并选中总纲
    pub async fn open(
        project: ProjectId,
        ports: &BackendPorts,
        notifier: Arc<dyn NotifierPort>,
        config: &EditorConfig,
    ) -> Result<Self, ApplicationError> {
        let structure = ports.projects.get_structure(&project).await?.normalized();
        let structure = Arc::new(RwLock::new(structure));
        let saver = Saver::new(ports.projects.clone(), notifier.clone(), structure.clone());

        let session = Self {
            inner: Arc::new(SessionInner {
                project,
                projects: ports.projects.clone(),
                generation: ports.generation.clone(),
                notifier,
                structure,
                saver,
                autosave_delay: config.autosave_delay(),
                selection: Mutex::new(Selection::Master),
                outline: TrackedBuffer::new(BufferKind::Outline),
                chapter: TrackedBuffer::new(BufferKind::Chapter),
                history: Mutex::new(History::new(config.history_capacity)),
                active_generation: Mutex::new(None),
                generation_seq: AtomicU64::new(0),
            }),
        };

        session.select(Selection::Master).await?;

        tracing::info!(project = %session.inner.project, "Editor session opened");
        Ok(session)
    }

    /// 切换选择
    ///
    /// 取消两个缓冲区挂起的自动保存（不保存），清空撤销历史，
    /// 载入新节点的内容。正文加载失败时使用空正文。
    pub async fn select(&self, selection: Selection) -> Result<(), ApplicationError> {
        let inner = &self.inner;
        read(&inner.structure).validate(&selection)?;

        self.abort_generation();
        inner.outline.cancel_timer();
        inner.chapter.cancel_timer();
        lock(&inner.history).clear();
        *lock(&inner.selection) = selection;

        let (outline, node) = {
            let structure = read(&inner.structure);
            (structure.outline_for(&selection), structure.node_for(&selection))
        };

        let body = match selection {
            Selection::Chapter { chapter, .. } => {
                match inner.projects.get_chapter(&inner.project, chapter).await {
                    Ok(body) => body,
                    Err(e) => {
                        tracing::warn!(
                            project = %inner.project,
                            chapter = chapter,
                            error = %e,
                            "Failed to load chapter body, starting empty"
                        );
                        String::new()
                    }
                }
            }
            _ => String::new(),
        };

        // 加载期间选择又变了，放弃这次结果
        if *lock(&inner.selection) != selection {
            return Ok(());
        }

        inner.outline.load(
            outline,
            Some(SaveTarget::Outline {
                project: inner.project.clone(),
                selection,
                node,
            }),
        );
        let chapter_target = match selection {
            Selection::Chapter { volume, chapter } => Some(SaveTarget::Chapter {
                project: inner.project.clone(),
                volume,
                chapter,
            }),
            _ => None,
        };
        inner.chapter.load(body, chapter_target);

        tracing::debug!(
            project = %inner.project,
            selection = %selection.label(),
            "Selection loaded"
        );
        Ok(())
    }

    /// 编辑纲要
    pub fn edit_outline(&self, text: impl Into<String>) -> Result<(), ApplicationError> {
        let text = text.into();
        let before = self.snapshot();
        if self.inner.outline.replace(&text) {
            lock(&self.inner.history).record(before);
            self.schedule(&self.inner.outline);
        }
        Ok(())
    }

    /// 编辑正文
    ///
    /// 生成期间正文只读，编辑被拒绝且内容不变
    pub fn edit_chapter(&self, text: impl Into<String>) -> Result<(), ApplicationError> {
        if !self.selection().is_chapter() {
            return Err(ApplicationError::precondition(MSG_SELECT_CHAPTER));
        }
        if self.is_generating() {
            return Err(ApplicationError::precondition(MSG_READ_ONLY));
        }

        let text = text.into();
        let before = self.snapshot();
        if self.inner.chapter.replace(&text) {
            lock(&self.inner.history).record(before);
            self.schedule(&self.inner.chapter);
        }
        Ok(())
    }

    /// 手动保存：跳过防抖，先纲要后正文，两者都完成才算成功
    pub async fn save(&self) -> Result<(), ApplicationError> {
        let inner = &self.inner;
        inner.outline.cancel_timer();
        inner.chapter.cancel_timer();

        let result = async {
            inner.outline.flush(&inner.saver, SaveTrigger::Manual).await?;
            if self.selection().is_chapter() {
                inner.chapter.flush(&inner.saver, SaveTrigger::Manual).await?;
            }
            Ok::<_, ApplicationError>(())
        }
        .await;

        match result {
            Ok(()) => {
                inner.notifier.notify(Notification::success("保存成功"));
                Ok(())
            }
            Err(e) => {
                inner
                    .notifier
                    .notify(Notification::error(format!("保存失败: {}", e.user_message())));
                Err(e)
            }
        }
    }

    /// 撤销，返回是否有可恢复的快照
    pub fn undo(&self) -> Result<bool, ApplicationError> {
        self.ensure_not_generating()?;
        let current = self.snapshot();
        let restored = lock(&self.inner.history).undo(current);
        Ok(match restored {
            Some(snapshot) => {
                self.restore(snapshot);
                true
            }
            None => false,
        })
    }

    /// 重做，返回是否有可恢复的快照
    pub fn redo(&self) -> Result<bool, ApplicationError> {
        self.ensure_not_generating()?;
        let restored = lock(&self.inner.history).redo();
        Ok(match restored {
            Some(snapshot) => {
                self.restore(snapshot);
                true
            }
            None => false,
        })
    }

    pub fn can_undo(&self) -> bool {
        lock(&self.inner.history).can_undo()
    }

    pub fn can_redo(&self) -> bool {
        lock(&self.inner.history).can_redo()
    }

    /// 搜索面板交回的整段文本，写入当前聚焦的缓冲区
    pub fn apply_replacement(&self, text: impl Into<String>) -> Result<(), ApplicationError> {
        match self.focused_kind() {
            BufferKind::Chapter => self.edit_chapter(text),
            BufferKind::Outline => self.edit_outline(text),
        }
    }

    /// 章节选择聚焦正文，其他选择聚焦纲要
    pub fn focused_kind(&self) -> BufferKind {
        if self.selection().is_chapter() {
            BufferKind::Chapter
        } else {
            BufferKind::Outline
        }
    }

    pub fn focused_text(&self) -> String {
        self.text_of(self.focused_kind())
    }

    /// 停止生成（仅客户端），返回是否有正在进行的生成
    pub fn stop_generation(&self) -> bool {
        match lock(&self.inner.active_generation).as_ref() {
            Some(active) => {
                active.token.cancel();
                true
            }
            None => false,
        }
    }

    /// 取消并立即释放生成标志，旧的流循环之后自行退出
    fn abort_generation(&self) {
        if let Some(active) = lock(&self.inner.active_generation).take() {
            active.token.cancel();
            tracing::debug!(
                project = %self.inner.project,
                generation = active.id,
                "Generation detached"
            );
        }
    }

    /// 关闭会话：取消计时器与生成，未保存的内容不会写回
    pub fn close(&self) {
        self.abort_generation();
        self.inner.outline.cancel_timer();
        self.inner.chapter.cancel_timer();
        tracing::info!(project = %self.inner.project, "Editor session closed");
    }

    pub fn project(&self) -> &ProjectId {
        &self.inner.project
    }

    pub fn outline(&self) -> String {
        self.inner.outline.text()
    }

    pub fn chapter(&self) -> String {
        self.inner.chapter.text()
    }

    pub fn text_of(&self, kind: BufferKind) -> String {
        match kind {
            BufferKind::Outline => self.outline(),
            BufferKind::Chapter => self.chapter(),
        }
    }

    /// 两个缓冲区合并后的状态
    pub fn status(&self) -> SaveStatus {
        self.inner.outline.status().combine(self.inner.chapter.status())
    }

    pub fn status_of(&self, kind: BufferKind) -> SaveStatus {
        match kind {
            BufferKind::Outline => self.inner.outline.status(),
            BufferKind::Chapter => self.inner.chapter.status(),
        }
    }

    pub fn is_generating(&self) -> bool {
        lock(&self.inner.active_generation).is_some()
    }

    pub fn selection(&self) -> Selection {
        *lock(&self.inner.selection)
    }

    /// 结构树快照
    pub fn structure(&self) -> Structure {
        read(&self.inner.structure).clone()
    }

    /// (纲要字数, 正文字数)
    pub fn word_counts(&self) -> (usize, usize) {
        (word_count(&self.outline()), word_count(&self.chapter()))
    }

    pub(super) fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.outline(), self.chapter())
    }

    pub(super) fn record_history(&self) {
        let before = self.snapshot();
        lock(&self.inner.history).record(before);
    }

    pub(super) fn schedule(&self, buffer: &Arc<TrackedBuffer>) {
        buffer.schedule(self.inner.saver.clone(), self.inner.autosave_delay);
    }

    fn ensure_not_generating(&self) -> Result<(), ApplicationError> {
        if self.is_generating() {
            return Err(ApplicationError::precondition(MSG_READ_ONLY));
        }
        Ok(())
    }

    /// 恢复快照本身也是一次编辑，内容变化的缓冲区重新计时
    fn restore(&self, snapshot: Snapshot) {
        if self.inner.outline.replace(&snapshot.outline) {
            self.schedule(&self.inner.outline);
        }
        if self.selection().is_chapter() && self.inner.chapter.replace(&snapshot.chapter) {
            self.schedule(&self.inner.chapter);
        }
    }
}

#[cfg(test)]
pub(super) mod tests {
    use super::*;
    use crate::application::ports::NotificationLevel;
    use crate::domain::project::{Project, Script, Volume};
    use crate::infrastructure::events::NotificationPublisher;
    use crate::infrastructure::memory::{InMemoryBackend, SaveCall};

    pub(crate) fn sample_structure() -> Structure {
        Structure {
            title: "洞穴奇谈".to_string(),
            master_outline: "少年踏上旅程".to_string(),
            volumes: vec![Volume {
                vol_num: 1,
                content: "第一卷：出发".to_string(),
                filename: Some("volume_01.md".to_string()),
                scripts: (1..=5)
                    .map(|n| Script {
                        script_num: n,
                        content: if n == 5 {
                            "hero enters the cave".to_string()
                        } else {
                            format!("章纲{}", n)
                        },
                        filename: Some(format!("v01_s{:02}.md", n)),
                        word_count: 0,
                    })
                    .collect(),
            }],
        }
    }

    pub(crate) struct Fixture {
        pub backend: Arc<InMemoryBackend>,
        pub publisher: Arc<NotificationPublisher>,
        pub session: EditorSession,
    }

    pub(crate) async fn fixture() -> Fixture {
        let backend = Arc::new(InMemoryBackend::new());
        let project = ProjectId::new("cave").unwrap();
        backend.seed_project(
            Project {
                name: "cave".to_string(),
                ..Default::default()
            },
            sample_structure(),
        );
        backend.set_chapter(&project, 1, "第一章正文");
        backend.set_chapter(&project, 2, "第二章正文");

        let publisher = Arc::new(NotificationPublisher::new(64));
        let ports = BackendPorts::from_backend(backend.clone());
        let session = EditorSession::open(
            project,
            &ports,
            publisher.clone(),
            &EditorConfig::default(),
        )
        .await
        .unwrap();

        Fixture {
            backend,
            publisher,
            session,
        }
    }

    async fn wait(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_keystrokes_coalesce_into_one_save() {
        let f = fixture().await;
        assert_eq!(f.session.status(), SaveStatus::Saved);

        f.session.edit_outline("少").unwrap();
        wait(1000).await;
        f.session.edit_outline("少年").unwrap();
        wait(1000).await;
        f.session.edit_outline("少年出发").unwrap();
        assert_eq!(f.session.status(), SaveStatus::Unsaved);

        wait(2900).await;
        assert!(f.backend.save_calls().is_empty());

        wait(200).await;
        let calls = f.backend.save_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0],
            SaveCall::Node {
                kind: "master",
                filename: None,
                content: "少年出发".to_string()
            }
        );
        assert_eq!(f.session.status(), SaveStatus::Saved);
        assert_eq!(f.session.structure().master_outline, "少年出发");
    }

    #[tokio::test(start_paused = true)]
    async fn test_selection_switch_drops_pending_save() {
        let f = fixture().await;
        f.session.select(Selection::chapter(1, 1)).await.unwrap();
        assert_eq!(f.session.chapter(), "第一章正文");

        f.session.edit_chapter("改过的第一章").unwrap();
        f.session.edit_outline("改过的章纲").unwrap();
        wait(1000).await;

        f.session.select(Selection::chapter(1, 2)).await.unwrap();
        assert_eq!(f.session.chapter(), "第二章正文");
        assert_eq!(f.session.outline(), "章纲2");
        assert_eq!(f.session.status(), SaveStatus::Saved);
        assert!(!f.session.can_undo());

        wait(10_000).await;
        assert!(f.backend.save_calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_chapter_body_loads_empty() {
        let f = fixture().await;
        f.session.select(Selection::chapter(1, 4)).await.unwrap();
        assert_eq!(f.session.chapter(), "");
        assert_eq!(f.session.outline(), "章纲4");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_selection_is_rejected() {
        let f = fixture().await;
        let err = f.session.select(Selection::chapter(3, 1)).await.unwrap_err();
        assert!(matches!(err, ApplicationError::NotFound { .. }));
        assert_eq!(f.session.selection(), Selection::Master);
    }

    #[tokio::test(start_paused = true)]
    async fn test_chapter_edit_requires_chapter_selection() {
        let f = fixture().await;
        let err = f.session.edit_chapter("正文").unwrap_err();
        assert!(matches!(err, ApplicationError::Precondition(_)));
        assert_eq!(f.session.chapter(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_undo_redo_restore_both_buffers() {
        let f = fixture().await;
        f.session.select(Selection::chapter(1, 1)).await.unwrap();

        f.session.edit_outline("纲A").unwrap();
        f.session.edit_chapter("正文A").unwrap();
        f.session.edit_chapter("正文AB").unwrap();

        assert!(f.session.undo().unwrap());
        assert_eq!(f.session.chapter(), "正文A");
        assert!(f.session.undo().unwrap());
        assert_eq!(f.session.chapter(), "第一章正文");
        assert_eq!(f.session.outline(), "纲A");
        assert!(f.session.undo().unwrap());
        assert_eq!(f.session.outline(), "章纲1");
        assert!(!f.session.undo().unwrap());

        assert!(f.session.redo().unwrap());
        assert_eq!(f.session.outline(), "纲A");
        assert!(f.session.redo().unwrap());
        assert!(f.session.redo().unwrap());
        assert_eq!(f.session.chapter(), "正文AB");
        assert!(!f.session.redo().unwrap());

        // 恢复快照是一次编辑，会重新计时保存
        wait(3100).await;
        let calls = f.backend.save_calls();
        assert_eq!(calls.len(), 2);
        assert!(calls.contains(&SaveCall::Chapter {
            chapter: 1,
            content: "正文AB".to_string()
        }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_save_outline_then_chapter() {
        let f = fixture().await;
        let mut rx = f.publisher.subscribe();
        f.session.select(Selection::chapter(1, 1)).await.unwrap();
        f.session.edit_outline("新章纲").unwrap();
        f.session.edit_chapter("新正文").unwrap();

        f.session.save().await.unwrap();
        assert_eq!(
            f.backend.save_calls(),
            vec![
                SaveCall::Node {
                    kind: "script",
                    filename: Some("v01_s01.md".to_string()),
                    content: "新章纲".to_string()
                },
                SaveCall::Chapter {
                    chapter: 1,
                    content: "新正文".to_string()
                },
            ]
        );
        assert_eq!(f.session.status(), SaveStatus::Saved);
        assert_eq!(rx.try_recv().unwrap().message, "保存成功");

        // 计时器已取消，不会再保存一次
        wait(5000).await;
        assert_eq!(f.backend.save_calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_save_racing_timer_saves_once() {
        let f = fixture().await;
        f.session.edit_outline("竞争").unwrap();
        wait(3000).await;
        f.session.save().await.unwrap();
        wait(100).await;
        assert_eq!(f.backend.save_calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_autosave_reverts_to_unsaved_without_retry() {
        let f = fixture().await;
        let mut rx = f.publisher.subscribe();
        f.backend.set_fail_saves(true);

        f.session.edit_outline("会失败").unwrap();
        wait(3100).await;
        assert_eq!(f.session.status(), SaveStatus::Unsaved);
        let notification = rx.try_recv().unwrap();
        assert_eq!(notification.level, NotificationLevel::Error);
        assert_eq!(notification.message, "自动保存失败");

        wait(30_000).await;
        assert_eq!(f.backend.save_calls().len(), 1);

        // 下一次编辑重新安排保存
        f.backend.set_fail_saves(false);
        f.session.edit_outline("会成功").unwrap();
        wait(3100).await;
        assert_eq!(f.session.status(), SaveStatus::Saved);
        assert_eq!(f.backend.save_calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_during_in_flight_save_schedules_follow_up() {
        let f = fixture().await;
        f.backend.set_save_delay(Duration::from_millis(1000));

        f.session.edit_outline("第一稿").unwrap();
        assert_eq!(f.session.status(), SaveStatus::Unsaved);
        wait(3100).await;
        assert_eq!(f.session.status(), SaveStatus::Saving);
        assert_eq!(f.backend.save_calls().len(), 1);

        // 保存进行中的按键不取消请求，只把状态打回 unsaved
        f.session.edit_outline("第二稿").unwrap();
        assert_eq!(f.session.status(), SaveStatus::Unsaved);
        wait(1000).await;
        assert_eq!(f.session.status(), SaveStatus::Unsaved);
        assert_eq!(f.backend.save_calls().len(), 1);

        wait(2500).await;
        assert_eq!(f.session.status(), SaveStatus::Saving);
        wait(1000).await;
        assert_eq!(f.session.status(), SaveStatus::Saved);
        assert_eq!(
            f.backend.save_calls(),
            vec![
                SaveCall::Node {
                    kind: "master",
                    filename: None,
                    content: "第一稿".to_string()
                },
                SaveCall::Node {
                    kind: "master",
                    filename: None,
                    content: "第二稿".to_string()
                },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_save_after_switch_is_still_reported() {
        let f = fixture().await;
        let mut rx = f.publisher.subscribe();
        f.backend.set_save_delay(Duration::from_millis(1000));
        f.backend.set_fail_saves(true);

        f.session.edit_outline("切换前的总纲").unwrap();
        wait(3100).await;
        assert_eq!(f.session.status(), SaveStatus::Saving);

        f.session.select(Selection::Volume(1)).await.unwrap();
        wait(2000).await;

        let notification = rx.try_recv().unwrap();
        assert_eq!(notification.level, NotificationLevel::Error);
        assert_eq!(notification.message, "自动保存失败");
        assert_eq!(f.session.outline(), "第一卷：出发");
        assert_eq!(f.session.status(), SaveStatus::Saved);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_edit_is_not_an_undo_step() {
        let f = fixture().await;
        f.session.edit_outline("少年踏上旅程").unwrap();
        assert!(!f.session.can_undo());
        assert_eq!(f.session.status(), SaveStatus::Saved);

        f.session.edit_outline("少年启程").unwrap();
        f.session.edit_outline("少年启程").unwrap();
        assert!(f.session.undo().unwrap());
        assert_eq!(f.session.outline(), "少年踏上旅程");
        assert!(!f.session.can_undo());
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_replacement_targets_focused_buffer() {
        let f = fixture().await;
        f.session.apply_replacement("替换后的总纲").unwrap();
        assert_eq!(f.session.outline(), "替换后的总纲");

        f.session.select(Selection::chapter(1, 2)).await.unwrap();
        assert_eq!(f.session.focused_kind(), BufferKind::Chapter);
        f.session.apply_replacement("替换后的正文").unwrap();
        assert_eq!(f.session.chapter(), "替换后的正文");
        assert_eq!(f.session.word_counts(), (3, 6));
    }
}
