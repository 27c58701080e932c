//! 后端端口集合
//!
//! 同一个后端实现所有端口；组件只持有自己需要的那部分

use std::sync::Arc;

use super::{
    ChatApiPort, ExportApiPort, GenerationApiPort, GenesisApiPort, ProjectApiPort,
    SettingsApiPort, StatisticsApiPort, VersionApiPort, WorldbookApiPort,
};

/// 实现了全部后端端口的类型
pub trait BackendPort:
    ProjectApiPort
    + GenerationApiPort
    + WorldbookApiPort
    + ExportApiPort
    + StatisticsApiPort
    + SettingsApiPort
    + GenesisApiPort
    + ChatApiPort
    + VersionApiPort
{
}

impl<T> BackendPort for T where
    T: ProjectApiPort
        + GenerationApiPort
        + WorldbookApiPort
        + ExportApiPort
        + StatisticsApiPort
        + SettingsApiPort
        + GenesisApiPort
    + ChatApiPort
    + VersionApiPort
{
}

/// 按关注点拆分的端口句柄
#[derive(Clone)]
pub struct BackendPorts {
    pub projects: Arc<dyn ProjectApiPort>,
    pub generation: Arc<dyn GenerationApiPort>,
    pub worldbook: Arc<dyn WorldbookApiPort>,
    pub export: Arc<dyn ExportApiPort>,
    pub statistics: Arc<dyn StatisticsApiPort>,
    pub settings: Arc<dyn SettingsApiPort>,
    pub genesis: Arc<dyn GenesisApiPort>,
    pub chat: Arc<dyn ChatApiPort>,
    pub versions: Arc<dyn VersionApiPort>,
}

impl BackendPorts {
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: BackendPort + 'static,
    {
        Self {
            projects: backend.clone(),
            generation: backend.clone(),
            worldbook: backend.clone(),
            export: backend.clone(),
            statistics: backend.clone(),
            settings: backend.clone(),
            genesis: backend.clone(),
            chat: backend.clone(),
            versions: backend,
        }
    }
}
