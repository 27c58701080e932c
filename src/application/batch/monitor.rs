//! 批量生成监视器实现

use futures_util::StreamExt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::progress::{BatchProgress, BatchStatus, LogLevel};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    BatchEvent, CreateBatchRequest, GenerationApiPort, Notification, NotifierPort,
};
use crate::config::BatchConfig;
use crate::domain::project::ProjectId;

/// 批量生成监视器
///
/// 进度通过 `watch` 通道发布；`stop` 只关闭本地连接，不通知后端。
pub struct BatchMonitor {
    generation: Arc<dyn GenerationApiPort>,
    notifier: Arc<dyn NotifierPort>,
    max_count: u32,
    progress: watch::Sender<BatchProgress>,
    cancel: Mutex<Option<CancellationToken>>,
}

impl BatchMonitor {
    pub fn new(
        generation: Arc<dyn GenerationApiPort>,
        notifier: Arc<dyn NotifierPort>,
        config: &BatchConfig,
    ) -> Self {
        let (progress, _) = watch::channel(BatchProgress::default());
        Self {
            generation,
            notifier,
            max_count: config.max_count,
            progress,
            cancel: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<BatchProgress> {
        self.progress.subscribe()
    }

    /// 当前进度快照
    pub fn progress(&self) -> BatchProgress {
        self.progress.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.progress.borrow().running
    }

    /// 创建任务并消费进度流直到结束，返回最终状态
    pub async fn start(
        &self,
        project: &ProjectId,
        start_chapter: u32,
        count: u32,
    ) -> Result<BatchStatus, ApplicationError> {
        if start_chapter == 0 {
            return Err(ApplicationError::validation("起始章节必须大于 0"));
        }
        if count == 0 || count > self.max_count {
            return Err(ApplicationError::validation(format!(
                "章节数量必须在 1 到 {} 之间",
                self.max_count
            )));
        }

        let token = {
            let mut cancel = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
            if cancel.is_some() {
                return Err(ApplicationError::invalid_state("批量任务正在运行"));
            }
            let token = CancellationToken::new();
            *cancel = Some(token.clone());
            token
        };

        let status = self.run(project, start_chapter, count, &token).await;

        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.progress.send_modify(|p| p.running = false);
        status
    }

    /// 停止（仅客户端），返回是否有正在运行的任务
    pub fn stop(&self) -> bool {
        let cancel = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
        match cancel.as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    async fn run(
        &self,
        project: &ProjectId,
        start_chapter: u32,
        count: u32,
        token: &CancellationToken,
    ) -> Result<BatchStatus, ApplicationError> {
        self.progress.send_replace(BatchProgress {
            task_id: None,
            current: 0,
            total: count,
            status: BatchStatus::Creating,
            running: true,
            log: Vec::new(),
        });
        self.log(
            LogLevel::Info,
            format!("开始批量生成: 从第 {} 章开始，共 {} 章", start_chapter, count),
        );

        let request = CreateBatchRequest {
            project: project.clone(),
            start_chapter,
            count,
        };
        let stream = async {
            let task_id = self.generation.create_batch(request).await?;
            self.progress.send_modify(|p| {
                p.task_id = Some(task_id.clone());
                p.status = BatchStatus::Running;
                p.push(LogLevel::Info, format!("任务创建成功: {}", task_id));
            });
            tracing::info!(
                project = %project,
                task_id = %task_id,
                start_chapter,
                count,
                "Batch task created"
            );
            self.generation.open_batch_stream(&task_id).await
        }
        .await;

        let mut stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                let err = ApplicationError::from(e);
                self.finish(BatchStatus::Failed, LogLevel::Error, format!("错误: {}", err.user_message()));
                self.notifier
                    .notify(Notification::error(format!("批量生成失败: {}", err.user_message())));
                return Err(err);
            }
        };

        let status = loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    self.finish(BatchStatus::Stopped, LogLevel::Warning, "已停止生成");
                    break BatchStatus::Stopped;
                }
                next = stream.next() => next,
            };

            match next {
                Some(Ok(BatchEvent::Progress {
                    current,
                    total,
                    message,
                })) => {
                    self.progress.send_modify(|p| {
                        p.current = current;
                        if total > 0 {
                            p.total = total;
                        }
                        let message = if message.is_empty() {
                            format!("进度 {}/{}", current, p.total)
                        } else {
                            message
                        };
                        p.push(LogLevel::Info, message);
                    });
                }
                Some(Ok(BatchEvent::Complete { chapter })) => {
                    self.progress.send_modify(|p| {
                        let chapter =
                            chapter.unwrap_or(start_chapter + p.current.saturating_sub(1));
                        p.push(LogLevel::Success, format!("第 {} 章生成完成", chapter));
                    });
                }
                Some(Ok(BatchEvent::TaskStarted { task })) => {
                    self.log(LogLevel::Info, format!("开始生成: {}", task.label()));
                }
                Some(Ok(BatchEvent::TaskCompleted { task })) => {
                    self.progress.send_modify(|p| {
                        p.current = (p.current + 1).min(p.total);
                        p.push(LogLevel::Success, format!("完成: {}", task.label()));
                    });
                }
                Some(Ok(BatchEvent::TaskFailed { task })) => {
                    let error = task.error.clone().unwrap_or_default();
                    tracing::warn!(
                        project = %project,
                        chapter = ?task.chapter_num,
                        error = %error,
                        "Batch task failed"
                    );
                    self.progress.send_modify(|p| {
                        p.current = (p.current + 1).min(p.total);
                        p.push(LogLevel::Warning, format!("失败: {} - {}", task.label(), error));
                    });
                }
                Some(Ok(BatchEvent::TaskCancelled { task })) => {
                    self.log(LogLevel::Warning, format!("已取消: {}", task.label()));
                }
                Some(Ok(BatchEvent::Done)) => {
                    self.progress.send_modify(|p| p.current = p.total);
                    self.finish(BatchStatus::Completed, LogLevel::Success, "批量生成完成！");
                    self.notifier.notify(Notification::success("批量生成完成"));
                    break BatchStatus::Completed;
                }
                Some(Ok(BatchEvent::Error { message })) => {
                    self.finish(BatchStatus::Failed, LogLevel::Error, format!("错误: {}", message));
                    self.notifier
                        .notify(Notification::error(format!("批量生成失败: {}", message)));
                    break BatchStatus::Failed;
                }
                Some(Ok(BatchEvent::Ping | BatchEvent::Unknown)) => {}
                Some(Err(e)) => {
                    tracing::warn!(project = %project, error = %e, "Batch stream failed");
                    self.finish(BatchStatus::Disconnected, LogLevel::Error, "连接断开");
                    break BatchStatus::Disconnected;
                }
                None => {
                    self.finish(BatchStatus::Disconnected, LogLevel::Error, "连接断开");
                    break BatchStatus::Disconnected;
                }
            }
        };
        drop(stream);

        tracing::info!(project = %project, status = status.as_str(), "Batch monitor finished");
        Ok(status)
    }

    fn log(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        self.progress.send_modify(|p| p.push(level, message));
    }

    fn finish(&self, status: BatchStatus, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        self.progress.send_modify(|p| {
            p.status = status;
            p.running = false;
            p.push(level, message);
        });
    }
}
