//! Novel Studio - AI 小说创作客户端核心
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Project Context: 结构树（总纲 / 卷纲 / 章纲）与选择
//! - Editor Context: 保存状态、撤销历史、搜索替换
//! - Worldbook Context: 设定卡片
//!
//! 应用层 (application/):
//! - Ports: 端口定义（后端各 API 面、通知）
//! - Editor: 防抖自动保存、AI 流式生成
//! - Batch: 批量生成监视
//! - Commands / Queries: 结构、导出、设置、统计
//!
//! 基础设施层 (infrastructure/):
//! - HTTP: reqwest 后端客户端
//! - SSE: 事件流解码
//! - Memory: 内存后端（测试与离线演示）
//! - Events: 通知广播

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
