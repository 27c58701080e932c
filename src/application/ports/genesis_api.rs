//! Genesis API Port - 新书创建向导

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::ApiError;

/// AI 根据灵感给出的方案
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Proposal {
    pub title: String,
    pub core_positioning: String,
    /// 字符串或字符串数组，原样保留
    pub highlights: serde_json::Value,
    pub introduction: String,
    pub config_yaml: String,
}

/// Genesis API Port
#[async_trait]
pub trait GenesisApiPort: Send + Sync {
    /// POST /api/genesis/propose
    async fn propose(&self, inspiration: &str) -> Result<Vec<Proposal>, ApiError>;

    /// POST /api/genesis/init
    async fn init_project(&self, project_name: &str, config_yaml: &str) -> Result<(), ApiError>;
}
