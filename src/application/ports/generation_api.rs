//! Generation API Port - AI 生成任务与进度流
//!
//! 两阶段协议：先同步创建任务拿到 ID，再按 ID 打开一条 SSE 流。
//! 丢弃返回的流即关闭底层连接。

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::domain::project::ProjectId;

/// 类型化的事件流
pub type EventStream<T> = BoxStream<'static, Result<T, ApiError>>;

/// 流式生成请求
#[derive(Debug, Clone)]
pub struct StartGenerationRequest {
    pub project: ProjectId,
    /// 生成阶段，正文为 "content"
    pub stage: String,
    pub outline: String,
    pub chapter_num: u32,
}

impl StartGenerationRequest {
    pub fn content(project: ProjectId, outline: impl Into<String>, chapter_num: u32) -> Self {
        Self {
            project,
            stage: "content".to_string(),
            outline: outline.into(),
            chapter_num,
        }
    }
}

/// 批量生成请求
#[derive(Debug, Clone)]
pub struct CreateBatchRequest {
    pub project: ProjectId,
    pub start_chapter: u32,
    pub count: u32,
}

impl CreateBatchRequest {
    /// 最后一章（含）
    pub fn end_chapter(&self) -> u32 {
        self.start_chapter + self.count.saturating_sub(1)
    }
}

/// 单章生成进度事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerationEvent {
    Start {
        #[serde(default)]
        message: String,
    },
    /// 追加到正文缓冲区
    Chunk {
        #[serde(default)]
        content: String,
    },
    /// 成功结束，携带完整正文与字数
    Complete {
        #[serde(default)]
        content: String,
        #[serde(default)]
        word_count: u64,
    },
    /// 失败结束
    Error {
        #[serde(default)]
        message: String,
    },
    /// 结束（无负载）
    Done,
    /// 保活帧
    Ping,
    #[serde(other)]
    Unknown,
}

impl GenerationEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GenerationEvent::Complete { .. } | GenerationEvent::Error { .. } | GenerationEvent::Done
        )
    }
}

/// 批量生成进度事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchEvent {
    Progress {
        #[serde(default)]
        current: u32,
        #[serde(default)]
        total: u32,
        #[serde(default)]
        message: String,
    },
    /// 单章完成
    Complete {
        #[serde(default)]
        chapter: Option<u32>,
    },
    /// 单个章节任务开始
    TaskStarted {
        #[serde(default)]
        task: BatchTask,
    },
    /// 单个章节任务成功
    TaskCompleted {
        #[serde(default)]
        task: BatchTask,
    },
    /// 单个章节任务重试后仍失败，批量继续
    TaskFailed {
        #[serde(default)]
        task: BatchTask,
    },
    TaskCancelled {
        #[serde(default)]
        task: BatchTask,
    },
    /// 全部完成
    #[serde(alias = "job_completed")]
    Done,
    Error {
        #[serde(default)]
        message: String,
    },
    Ping,
    #[serde(other)]
    Unknown,
}

/// 批量事件里携带的章节任务
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchTask {
    #[serde(default)]
    pub chapter_num: Option<u32>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub error: Option<String>,
}

impl BatchTask {
    /// 日志里显示的名称：有标题用标题，否则用章节号
    pub fn label(&self) -> String {
        match (self.title.trim(), self.chapter_num) {
            ("", Some(num)) => format!("第 {} 章", num),
            ("", None) => "未命名章节".to_string(),
            (title, _) => title.to_string(),
        }
    }
}

impl BatchEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchEvent::Done | BatchEvent::Error { .. })
    }
}

/// Generation API Port
#[async_trait]
pub trait GenerationApiPort: Send + Sync {
    /// POST /api/generate/stream，返回 queue_id
    async fn start_generation(&self, request: StartGenerationRequest) -> Result<String, ApiError>;

    /// GET /api/generate/progress/:queue_id (SSE)
    async fn open_generation_stream(
        &self,
        queue_id: &str,
    ) -> Result<EventStream<GenerationEvent>, ApiError>;

    /// POST /api/batch/create，返回 task_id
    async fn create_batch(&self, request: CreateBatchRequest) -> Result<String, ApiError>;

    /// GET /api/batch/progress/:task_id (SSE)
    async fn open_batch_stream(&self, task_id: &str) -> Result<EventStream<BatchEvent>, ApiError>;
}
