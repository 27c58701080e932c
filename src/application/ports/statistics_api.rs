//! Statistics API Port - 写作统计

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ApiError;
use crate::domain::project::ProjectId;

/// 总体统计
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Statistics {
    pub total_words: u64,
    pub total_chapters: u64,
    /// 日期 (YYYY-MM-DD) -> 字数
    pub daily_words: BTreeMap<String, u64>,
}

/// 每日字数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyWords {
    pub date: String,
    #[serde(default)]
    pub words: u64,
}

/// 最近编辑
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentEdit {
    pub filename: String,
    #[serde(default)]
    pub modified: String,
}

/// Statistics API Port
#[async_trait]
pub trait StatisticsApiPort: Send + Sync {
    /// GET /api/statistics/:id
    async fn statistics(&self, project: &ProjectId) -> Result<Statistics, ApiError>;

    /// GET /api/statistics/:id/daily
    async fn daily(&self, project: &ProjectId) -> Result<Vec<DailyWords>, ApiError>;

    /// GET /api/statistics/:id/recent
    async fn recent(&self, project: &ProjectId) -> Result<Vec<RecentEdit>, ApiError>;
}
