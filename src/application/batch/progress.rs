//! 批量任务的实时投影

use chrono::{DateTime, Local};
use serde::Serialize;

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Success => "success",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        }
    }
}

/// 带时间戳的日志行
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub at: DateTime<Local>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            at: Local::now(),
        }
    }

    /// 界面显示形式，如 `[14:03:22] 第 3 章生成完成`
    pub fn display_line(&self) -> String {
        format!("[{}] {}", self.at.format("%H:%M:%S"), self.message)
    }
}

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    #[default]
    Idle,
    Creating,
    Running,
    Completed,
    Failed,
    /// 用户在客户端停止，服务端任务不受影响
    Stopped,
    /// 终止事件之前连接断开
    Disconnected,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Idle => "idle",
            BatchStatus::Creating => "creating",
            BatchStatus::Running => "running",
            BatchStatus::Completed => "completed",
            BatchStatus::Failed => "failed",
            BatchStatus::Stopped => "stopped",
            BatchStatus::Disconnected => "disconnected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BatchStatus::Completed
                | BatchStatus::Failed
                | BatchStatus::Stopped
                | BatchStatus::Disconnected
        )
    }
}

/// 批量任务进度
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchProgress {
    pub task_id: Option<String>,
    pub current: u32,
    pub total: u32,
    pub status: BatchStatus,
    pub running: bool,
    pub log: Vec<LogEntry>,
}

impl BatchProgress {
    pub(crate) fn push(&mut self, level: LogLevel, message: impl Into<String>) {
        self.log.push(LogEntry::new(level, message));
    }

    /// 完成百分比 (0-100)
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        (self.current.min(self.total) * 100) / self.total
    }

    pub fn last_message(&self) -> Option<&str> {
        self.log.last().map(|e| e.message.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent() {
        let mut progress = BatchProgress::default();
        assert_eq!(progress.percent(), 0);
        progress.total = 4;
        progress.current = 1;
        assert_eq!(progress.percent(), 25);
        progress.current = 9;
        assert_eq!(progress.percent(), 100);
    }

    #[test]
    fn test_display_line() {
        let entry = LogEntry::new(LogLevel::Success, "批量生成完成！");
        let line = entry.display_line();
        assert!(line.starts_with('['));
        assert!(line.ends_with("] 批量生成完成！"));
    }
}
