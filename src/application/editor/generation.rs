//! AI 正文流式生成
//!
//! 与保存状态机正交：先创建任务拿到 queue_id，再打开一条按 ID
//! 限定的事件流。第一个事件到达前清空正文，之后每个 chunk 追加到
//! 正文缓冲区，任一终止事件结束循环。流在函数返回前被丢弃，连接
//! 只关闭一次。

use futures_util::StreamExt;
use std::sync::atomic::Ordering;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::autosave::SaveTrigger;
use super::lock;
use super::session::{ActiveToken, EditorSession, MSG_SELECT_CHAPTER};
use crate::application::error::ApplicationError;
use crate::application::ports::{GenerationEvent, Notification, StartGenerationRequest};
use crate::domain::project::Selection;
use crate::domain::text_stats::word_count;

/// 一次生成的结局
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// complete 事件，携带最终字数
    Completed { word_count: u64 },
    /// error 事件
    Failed { message: String },
    /// done 事件
    Finished,
    /// 用户停止或切换了选择
    Cancelled,
    /// 终止事件之前连接断开，已生成的内容保留
    Disconnected,
}

impl GenerationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            GenerationOutcome::Completed { .. } | GenerationOutcome::Finished
        )
    }

    fn as_str(&self) -> &'static str {
        match self {
            GenerationOutcome::Completed { .. } => "completed",
            GenerationOutcome::Failed { .. } => "failed",
            GenerationOutcome::Finished => "finished",
            GenerationOutcome::Cancelled => "cancelled",
            GenerationOutcome::Disconnected => "disconnected",
        }
    }
}

/// 离开作用域时清除生成标志（只清除自己的那一次）
struct ActiveGeneration<'a> {
    slot: &'a Mutex<Option<ActiveToken>>,
    id: u64,
}

impl Drop for ActiveGeneration<'_> {
    fn drop(&mut self) {
        let mut slot = lock(self.slot);
        if slot.as_ref().is_some_and(|active| active.id == self.id) {
            slot.take();
        }
    }
}

impl EditorSession {
    /// 为当前章节生成正文
    ///
    /// 前置条件：选中章节且章纲非空，否则不发任何请求。
    /// 正文里未保存的编辑会先保存一次再清空。
    pub async fn generate(&self) -> Result<GenerationOutcome, ApplicationError> {
        let inner = &self.inner;
        let selection = self.selection();
        let Selection::Chapter { chapter, .. } = selection else {
            return Err(ApplicationError::precondition(MSG_SELECT_CHAPTER));
        };
        let outline = self.outline();
        if outline.trim().is_empty() {
            return Err(ApplicationError::precondition("请先填写章纲"));
        }

        let (id, token) = {
            let mut active = lock(&inner.active_generation);
            if active.is_some() {
                return Err(ApplicationError::invalid_state("正在生成中"));
            }
            let id = inner.generation_seq.fetch_add(1, Ordering::SeqCst);
            let token = CancellationToken::new();
            *active = Some(ActiveToken {
                id,
                token: token.clone(),
            });
            (id, token)
        };
        let _active = ActiveGeneration {
            slot: &inner.active_generation,
            id,
        };
        // 切换选择后缓冲区换代，旧流的写入全部丢弃
        let epoch = inner.chapter.epoch();

        if inner.chapter.is_dirty() {
            inner.chapter.cancel_timer();
            inner.chapter.flush(&inner.saver, SaveTrigger::Auto).await?;
        }

        let request = StartGenerationRequest::content(inner.project.clone(), outline, chapter);
        let mut stream = match self.open_stream(request).await {
            Ok(stream) => stream,
            Err(e) => {
                inner
                    .notifier
                    .notify(Notification::error(format!("生成失败: {}", e.user_message())));
                return Err(e);
            }
        };

        // 第一个事件到达前清空正文，撤销可以找回
        if inner.chapter.epoch() == epoch {
            self.record_history();
            inner.chapter.replace_in(epoch, "");
        }

        let outcome = loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => break GenerationOutcome::Cancelled,
                next = stream.next() => next,
            };

            match next {
                Some(Ok(GenerationEvent::Chunk { content })) => {
                    inner.chapter.append_in(epoch, &content);
                }
                Some(Ok(GenerationEvent::Complete {
                    content,
                    word_count: reported,
                })) => {
                    if !content.is_empty() {
                        inner.chapter.replace_in(epoch, &content);
                    }
                    let word_count = if reported > 0 {
                        reported
                    } else {
                        word_count(&self.chapter()) as u64
                    };
                    break GenerationOutcome::Completed { word_count };
                }
                Some(Ok(GenerationEvent::Error { message })) => {
                    break GenerationOutcome::Failed { message }
                }
                Some(Ok(GenerationEvent::Done)) => break GenerationOutcome::Finished,
                Some(Ok(GenerationEvent::Start { message })) => {
                    tracing::debug!(project = %inner.project, chapter, message = %message, "Generation accepted");
                }
                Some(Ok(GenerationEvent::Ping | GenerationEvent::Unknown)) => {}
                Some(Err(e)) => {
                    tracing::warn!(project = %inner.project, chapter, error = %e, "Generation stream failed");
                    break GenerationOutcome::Disconnected;
                }
                None => break GenerationOutcome::Disconnected,
            }
        };
        drop(stream);

        tracing::info!(
            project = %inner.project,
            chapter,
            outcome = outcome.as_str(),
            chars = self.chapter().chars().count(),
            "Generation finished"
        );

        let notification = match &outcome {
            GenerationOutcome::Completed { word_count } => {
                Notification::success(format!("生成完成，共 {} 字", word_count))
            }
            GenerationOutcome::Finished => Notification::success("生成完成"),
            GenerationOutcome::Failed { message } => {
                Notification::error(format!("生成失败: {}", message))
            }
            GenerationOutcome::Cancelled => Notification::info("已停止生成"),
            GenerationOutcome::Disconnected => {
                Notification::warning("连接中断，已保留生成的内容")
            }
        };
        inner.notifier.notify(notification);

        // 选择没变时把生成结果交给自动保存
        if self.selection() == selection
            && inner.chapter.epoch() == epoch
            && inner.chapter.is_dirty()
        {
            self.schedule(&inner.chapter);
        }

        Ok(outcome)
    }

    async fn open_stream(
        &self,
        request: StartGenerationRequest,
    ) -> Result<crate::application::ports::EventStream<GenerationEvent>, ApplicationError> {
        let chapter = request.chapter_num;
        let queue_id = self.inner.generation.start_generation(request).await?;
        tracing::info!(
            project = %self.inner.project,
            chapter,
            queue_id = %queue_id,
            "Generation started"
        );
        Ok(self.inner.generation.open_generation_stream(&queue_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::super::session::tests::fixture;
    use super::*;
    use crate::application::ports::NotificationLevel;
    use crate::domain::editor::SaveStatus;
    use crate::infrastructure::memory::SaveCall;
    use std::time::Duration;

    fn chunk(s: &str) -> GenerationEvent {
        GenerationEvent::Chunk {
            content: s.to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_streamed_chunks_build_chapter_and_autosave() {
        let f = fixture().await;
        f.backend.script_generation(
            vec![
                GenerationEvent::Start {
                    message: "开始".to_string(),
                },
                chunk("他"),
                GenerationEvent::Ping,
                chunk("走进了洞穴"),
                GenerationEvent::Complete {
                    content: String::new(),
                    word_count: 6,
                },
            ],
            Duration::ZERO,
        );
        let mut rx = f.publisher.subscribe();

        f.session.select(Selection::chapter(1, 5)).await.unwrap();
        assert_eq!(f.session.outline(), "hero enters the cave");

        let outcome = f.session.generate().await.unwrap();
        assert_eq!(outcome, GenerationOutcome::Completed { word_count: 6 });
        assert_eq!(f.session.chapter(), "他走进了洞穴");
        assert!(!f.session.is_generating());
        assert_eq!(f.backend.streams_opened(), 1);
        assert_eq!(f.backend.streams_closed(), 1);
        assert_eq!(rx.try_recv().unwrap().message, "生成完成，共 6 字");

        let requests = f.backend.generation_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].chapter_num, 5);
        assert_eq!(requests[0].stage, "content");
        assert_eq!(requests[0].outline, "hero enters the cave");

        assert_eq!(f.session.status(), SaveStatus::Unsaved);
        tokio::time::sleep(Duration::from_millis(3100)).await;
        assert_eq!(
            f.backend.save_calls(),
            vec![SaveCall::Chapter {
                chapter: 5,
                content: "他走进了洞穴".to_string()
            }]
        );
        assert_eq!(f.session.status(), SaveStatus::Saved);
    }

    #[tokio::test(start_paused = true)]
    async fn test_preconditions_block_request() {
        let f = fixture().await;
        let err = f.session.generate().await.unwrap_err();
        assert!(matches!(err, ApplicationError::Precondition(ref m) if m == "请先选择一个章节"));

        f.session.select(Selection::chapter(1, 1)).await.unwrap();
        f.session.edit_outline("   ").unwrap();
        let err = f.session.generate().await.unwrap_err();
        assert!(matches!(err, ApplicationError::Precondition(ref m) if m == "请先填写章纲"));

        assert!(f.backend.generation_requests().is_empty());
        assert_eq!(f.backend.streams_opened(), 0);
        assert!(!f.session.is_generating());
    }

    #[tokio::test(start_paused = true)]
    async fn test_chapter_is_read_only_while_generating() {
        let f = fixture().await;
        f.backend.script_generation(
            vec![chunk("第一段"), chunk("第二段"), GenerationEvent::Done],
            Duration::from_millis(500),
        );
        f.session.select(Selection::chapter(1, 1)).await.unwrap();

        let session = f.session.clone();
        let task = tokio::spawn(async move { session.generate().await });

        tokio::time::sleep(Duration::from_millis(700)).await;
        assert!(f.session.is_generating());
        assert_eq!(f.session.chapter(), "第一段");

        let err = f.session.edit_chapter("用户输入").unwrap_err();
        assert!(matches!(err, ApplicationError::Precondition(_)));
        assert!(f.session.undo().is_err());
        assert_eq!(f.session.chapter(), "第一段");

        let outcome = task.await.unwrap().unwrap();
        assert_eq!(outcome, GenerationOutcome::Finished);
        assert_eq!(f.session.chapter(), "第一段第二段");
        assert!(f.session.edit_chapter("可以编辑了").is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_closes_stream_and_keeps_partial_text() {
        let f = fixture().await;
        f.backend.script_generation(
            vec![chunk("片段"), chunk("不会到达"), GenerationEvent::Done],
            Duration::from_millis(1000),
        );
        f.session.select(Selection::chapter(1, 2)).await.unwrap();

        let session = f.session.clone();
        let task = tokio::spawn(async move { session.generate().await });
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert!(f.session.stop_generation());
        let outcome = task.await.unwrap().unwrap();
        assert_eq!(outcome, GenerationOutcome::Cancelled);
        assert_eq!(f.session.chapter(), "片段");
        assert_eq!(f.backend.streams_closed(), 1);
        assert!(!f.session.stop_generation());
    }

    #[tokio::test(start_paused = true)]
    async fn test_switching_selection_releases_generation() {
        let f = fixture().await;
        f.backend.script_generation(
            vec![chunk("旧章节"), chunk("迟到的片段"), GenerationEvent::Done],
            Duration::from_millis(1000),
        );
        f.session.select(Selection::chapter(1, 1)).await.unwrap();

        let session = f.session.clone();
        let task = tokio::spawn(async move { session.generate().await });
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(f.session.chapter(), "旧章节");

        f.session.select(Selection::chapter(1, 2)).await.unwrap();
        assert!(!f.session.is_generating());
        assert_eq!(f.session.chapter(), "第二章正文");
        f.session.edit_chapter("第二章新写的").unwrap();

        let outcome = task.await.unwrap().unwrap();
        assert_eq!(outcome, GenerationOutcome::Cancelled);
        assert_eq!(f.session.chapter(), "第二章新写的");
        assert_eq!(f.backend.streams_closed(), 1);

        // 旧生成不安排保存，只有新章节的编辑写回
        tokio::time::sleep(Duration::from_millis(3100)).await;
        assert_eq!(
            f.backend.save_calls(),
            vec![SaveCall::Chapter {
                chapter: 2,
                content: "第二章新写的".to_string()
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_before_terminal_event() {
        let f = fixture().await;
        f.backend
            .script_generation(vec![chunk("半"), chunk("截")], Duration::ZERO);
        f.session.select(Selection::chapter(1, 1)).await.unwrap();

        let outcome = f.session.generate().await.unwrap();
        assert_eq!(outcome, GenerationOutcome::Disconnected);
        assert_eq!(f.session.chapter(), "半截");
        assert!(!f.session.is_generating());
        assert_eq!(f.backend.streams_closed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_event_is_reported() {
        let f = fixture().await;
        f.backend.script_generation(
            vec![
                chunk("开头"),
                GenerationEvent::Error {
                    message: "模型超时".to_string(),
                },
            ],
            Duration::ZERO,
        );
        let mut rx = f.publisher.subscribe();
        f.session.select(Selection::chapter(1, 1)).await.unwrap();

        let outcome = f.session.generate().await.unwrap();
        assert_eq!(
            outcome,
            GenerationOutcome::Failed {
                message: "模型超时".to_string()
            }
        );
        assert_eq!(f.session.chapter(), "开头");
        let notification = rx.try_recv().unwrap();
        assert_eq!(notification.level, NotificationLevel::Error);
        assert_eq!(f.backend.streams_closed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_chapter_edits_saved_before_clear() {
        let f = fixture().await;
        f.backend
            .script_generation(vec![chunk("新内容"), GenerationEvent::Done], Duration::ZERO);
        f.session.select(Selection::chapter(1, 1)).await.unwrap();
        f.session.edit_chapter("草稿").unwrap();

        f.session.generate().await.unwrap();
        assert_eq!(
            f.backend.save_calls()[0],
            SaveCall::Chapter {
                chapter: 1,
                content: "草稿".to_string()
            }
        );

        // 清空可以撤销
        assert!(f.session.undo().unwrap());
        assert_eq!(f.session.chapter(), "草稿");
    }
}
