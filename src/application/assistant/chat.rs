//! Chat Session - 侧边栏对话
//!
//! 每次请求附带最近 [`CHAT_HISTORY_WINDOW`] 条有效消息作为上下文。
//! 请求失败不会中断会话，而是以一条错误回复的形式留在对话里。

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{ChatApiPort, ChatMessage};
use crate::domain::project::ProjectId;

/// 随请求发送的历史消息条数
pub const CHAT_HISTORY_WINDOW: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub message: ChatMessage,
    /// 请求失败时生成的回复，不计入后续上下文
    pub is_error: bool,
}

pub struct ChatSession {
    project: ProjectId,
    api: Arc<dyn ChatApiPort>,
    entries: Vec<ChatEntry>,
}

impl ChatSession {
    pub fn new(project: ProjectId, api: Arc<dyn ChatApiPort>) -> Self {
        Self {
            project,
            api,
            entries: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// 下一次请求会带上的上下文
    pub fn history(&self) -> Vec<ChatMessage> {
        let valid: Vec<&ChatEntry> = self.entries.iter().filter(|e| !e.is_error).collect();
        let skip = valid.len().saturating_sub(CHAT_HISTORY_WINDOW);
        valid
            .into_iter()
            .skip(skip)
            .map(|e| e.message.clone())
            .collect()
    }

    /// 发送一条消息，返回助手的回复
    ///
    /// 空消息在发请求前被拒绝；请求失败时回复为错误条目
    pub async fn send(&mut self, text: &str) -> Result<ChatEntry, ApplicationError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ApplicationError::validation("消息不能为空"));
        }

        let history = self.history();
        self.entries.push(ChatEntry {
            message: ChatMessage::user(text),
            is_error: false,
        });

        let reply = match self.api.chat(&self.project, text, &history).await {
            Ok(reply) => ChatEntry {
                message: ChatMessage::assistant(reply),
                is_error: false,
            },
            Err(e) => {
                let err = ApplicationError::from(e);
                tracing::warn!(project = %self.project, error = %err, "Chat request failed");
                ChatEntry {
                    message: ChatMessage::assistant(format!(
                        "抱歉，发生了错误: {}",
                        err.user_message()
                    )),
                    is_error: true,
                }
            }
        };
        self.entries.push(reply.clone());
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::ChatRole;
    use crate::infrastructure::memory::InMemoryBackend;

    fn session(backend: &Arc<InMemoryBackend>, project: &str) -> ChatSession {
        ChatSession::new(ProjectId::new(project).unwrap(), backend.clone())
    }

    #[tokio::test]
    async fn test_history_is_limited_to_recent_messages() {
        let backend = Arc::new(InMemoryBackend::demo());
        let mut chat = session(&backend, "demo");

        for i in 0..6 {
            let reply = chat.send(&format!("问题{}", i)).await.unwrap();
            assert_eq!(reply.message.role, ChatRole::Assistant);
            assert!(!reply.is_error);
        }
        assert_eq!(chat.entries().len(), 12);

        let requests = backend.chat_requests();
        assert_eq!(requests.len(), 6);
        assert!(requests[0].1.is_empty());
        assert_eq!(requests[1].1.len(), 2);
        let last = &requests[5].1;
        assert_eq!(last.len(), CHAT_HISTORY_WINDOW);
        assert_eq!(last[0], ChatMessage::user("问题0"));
        assert_eq!(last[8], ChatMessage::user("问题4"));
        assert_eq!(last[9].role, ChatRole::Assistant);
    }

    #[tokio::test]
    async fn test_blank_message_is_not_sent() {
        let backend = Arc::new(InMemoryBackend::demo());
        let mut chat = session(&backend, "demo");

        assert!(matches!(
            chat.send("   ").await,
            Err(ApplicationError::Validation(_))
        ));
        assert!(chat.entries().is_empty());
        assert!(backend.chat_requests().is_empty());
    }

    #[tokio::test]
    async fn test_failed_reply_stays_in_conversation() {
        let backend = Arc::new(InMemoryBackend::demo());
        let mut chat = session(&backend, "missing");

        let reply = chat.send("你好").await.unwrap();
        assert!(reply.is_error);
        assert!(reply.message.content.starts_with("抱歉，发生了错误: "));
        assert_eq!(chat.entries().len(), 2);
        assert_eq!(chat.history(), vec![ChatMessage::user("你好")]);

        chat.clear();
        assert!(chat.entries().is_empty());
    }
}
