//! Statistics Queries

use crate::domain::project::ProjectId;

/// 获取统计面板数据（汇总、每日字数、最近编辑）
#[derive(Debug, Clone)]
pub struct GetDashboard {
    pub project: ProjectId,
}
