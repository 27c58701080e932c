//! 应用层错误定义
//!
//! 统一的操作错误类型。任何错误都不会终结会话：调用方在操作边界
//! 捕获并通过通知展示。

use thiserror::Error;

use crate::application::ports::ApiError;
use crate::domain::project::ProjectError;
use crate::domain::worldbook::CardError;

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 请求失败或超时，下一轮由用户重试
    #[error("Network error: {0}")]
    Network(String),

    /// 请求发出前在客户端被拦截
    #[error("Validation error: {0}")]
    Validation(String),

    /// 流上收到 error 事件或连接中断
    #[error("Stream terminated: {0}")]
    StreamTerminal(String),

    /// 前置条件不满足，不发请求
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// 资源未找到
    #[error("{resource_type} not found: {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    /// 状态无效
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// 后端响应无法解析
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ApplicationError {
    /// 创建 NotFound 错误
    pub fn not_found(resource_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type,
            id: id.into(),
        }
    }

    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// 创建前置条件错误
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    /// 创建流终止错误
    pub fn stream_terminal(message: impl Into<String>) -> Self {
        Self::StreamTerminal(message.into())
    }

    /// 创建状态无效错误
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// 面向用户的简短描述（toast 文案）
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(msg)
            | Self::Validation(msg)
            | Self::StreamTerminal(msg)
            | Self::Precondition(msg)
            | Self::InvalidState(msg)
            | Self::InvalidResponse(msg) => msg.clone(),
            Self::NotFound { resource_type, id } => format!("{} 不存在: {}", resource_type, id),
        }
    }
}

impl From<ApiError> for ApplicationError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Network(msg) => Self::Network(msg),
            ApiError::Timeout => Self::Network("请求超时".to_string()),
            ApiError::Status { message, .. } => Self::Network(message),
            ApiError::InvalidResponse(msg) => Self::InvalidResponse(msg),
        }
    }
}

impl From<CardError> for ApplicationError {
    fn from(err: CardError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<ProjectError> for ApplicationError {
    fn from(err: ProjectError) -> Self {
        match err {
            ProjectError::VolumeNotFound(volume) => Self::not_found("Volume", volume.to_string()),
            ProjectError::ChapterNotFound { volume, chapter } => {
                Self::not_found("Chapter", format!("{}-{}", volume, chapter))
            }
            ProjectError::InvalidSelection(selection) => {
                Self::Precondition(format!("无效的选择: {}", selection.label()))
            }
        }
    }
}
