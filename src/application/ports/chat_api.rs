//! Chat API Port - AI 写作助手对话

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::domain::project::ProjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// 一条对话消息，序列化为 `{"role": "...", "content": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Chat API Port
#[async_trait]
pub trait ChatApiPort: Send + Sync {
    /// POST /api/chat `{project, message, history}`，返回助手回复
    async fn chat(
        &self,
        project: &ProjectId,
        message: &str,
        history: &[ChatMessage],
    ) -> Result<String, ApiError>;
}
