//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层之间的抽象接口：后端各 API 面与通知

mod backend;
mod chat_api;
mod errors;
mod export_api;
mod generation_api;
mod genesis_api;
mod notifier;
mod project_api;
mod settings_api;
mod statistics_api;
mod version_api;
mod worldbook_api;

pub use backend::{BackendPort, BackendPorts};
pub use chat_api::{ChatApiPort, ChatMessage, ChatRole};
pub use errors::ApiError;
pub use export_api::{ExportApiPort, ExportFormat};
pub use generation_api::{
    BatchEvent, BatchTask, CreateBatchRequest, EventStream, GenerationApiPort, GenerationEvent,
    StartGenerationRequest,
};
pub use genesis_api::{GenesisApiPort, Proposal};
pub use notifier::{Notification, NotificationLevel, NotifierPort};
pub use project_api::ProjectApiPort;
pub use settings_api::{
    GenerationParams, GenerationParamsView, GlobalSettings, ModelInfo, SafetySettings,
    SettingsApiPort, SystemPrompt,
};
pub use statistics_api::{DailyWords, RecentEdit, Statistics, StatisticsApiPort};
pub use version_api::{FileVersion, VersionApiPort};
pub use worldbook_api::WorldbookApiPort;
