//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（后端 REST/SSE 接口、通知）
//! - editor: 编辑器会话（自动保存、撤销/重做、AI 生成）
//! - batch: 批量生成监视器
//! - worldbook: 设定卡片管理
//! - assistant: AI 写作助手对话与文件版本
//! - stores: 项目与新书向导状态
//! - shortcuts: 键盘快捷键分发
//! - commands / queries: 结构、导出、设置、统计的命令与查询处理器
//! - error: 应用层错误定义

pub mod assistant;
pub mod batch;
pub mod commands;
pub mod editor;
pub mod error;
pub mod ports;
pub mod queries;
pub mod shortcuts;
pub mod stores;
pub mod worldbook;

// Re-exports
pub use assistant::{ChatEntry, ChatSession, VersionHistory, CHAT_HISTORY_WINDOW};

pub use batch::{BatchMonitor, BatchProgress, BatchStatus, LogEntry, LogLevel};

pub use commands::{
    AddChapter, AddVolume, ApplyPreset, ExportProject, GenerateStructure, SaveSystemPrompt,
    UpdateGenerationParams, UpdateSafety,
    // Handlers
    handlers::{
        AddChapterHandler, AddVolumeHandler, ApplyPresetHandler, ExportProjectHandler,
        GenerateStructureHandler, SaveSystemPromptHandler, StructureChanged,
        UpdateGenerationParamsHandler, UpdateSafetyHandler,
    },
};

pub use editor::{EditorSession, GenerationOutcome};

pub use error::ApplicationError;

pub use ports::{
    ApiError, BackendPort, BackendPorts, Notification, NotificationLevel, NotifierPort,
};

pub use queries::{
    GetDashboard, GetGenerationParams, GetGlobalSettings, GetSafetySettings, GetSystemPrompt,
    // Handlers
    handlers::{
        Dashboard, GetDashboardHandler, GetGenerationParamsHandler, GetGlobalSettingsHandler,
        GetSafetySettingsHandler, GetSystemPromptHandler,
    },
};

pub use shortcuts::{KeyChord, ShortcutAction, ShortcutDispatcher, ShortcutHandler};

pub use stores::{safe_project_name, GenesisStore, ProjectStore};

pub use worldbook::{Confirmation, WorldbookManager};
