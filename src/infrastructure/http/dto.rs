//! Data Transfer Objects - 后端请求体与响应体
//!
//! 响应结构以后端实际返回为准，缺失字段一律取默认值

use serde::{Deserialize, Serialize};

use crate::application::ports::{
    ChatMessage, DailyWords, FileVersion, GenerationParams, Proposal, RecentEdit, SafetySettings,
};
use crate::domain::project::Project;
use crate::domain::worldbook::Card;

// ============================================================================
// 通用
// ============================================================================

/// 非 2xx 响应体 `{"error": "..."}`
#[derive(Debug, Deserialize)]
pub(super) struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub(super) struct ContentBody<'a> {
    pub content: &'a str,
}

#[derive(Debug, Deserialize)]
pub(super) struct ContentResponse {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct MessageResponse {
    pub message: Option<String>,
}

// ============================================================================
// Project
// ============================================================================

/// 项目列表：裸数组或 `{projects: [...]}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum ProjectsResponse {
    List(Vec<Project>),
    Wrapped { projects: Vec<Project> },
}

impl ProjectsResponse {
    pub fn into_projects(self) -> Vec<Project> {
        match self {
            ProjectsResponse::List(projects) | ProjectsResponse::Wrapped { projects } => projects,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct SaveNodeBody<'a> {
    #[serde(rename = "type")]
    pub node_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<&'a str>,
    pub content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vol_num: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct SavedNode {
    pub filename: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct SaveNodeResponse {
    pub node: SavedNode,
}

#[derive(Debug, Serialize)]
pub(super) struct GenerateStructureBody<'a> {
    pub master_outline: &'a str,
    pub volume_count: u32,
}

// ============================================================================
// Generation
// ============================================================================

#[derive(Debug, Serialize)]
pub(super) struct StageParams<'a> {
    pub outline: &'a str,
    pub chapter_num: u32,
}

#[derive(Debug, Serialize)]
pub(super) struct StartGenerationBody<'a> {
    pub project: &'a str,
    pub stage: &'a str,
    pub params: StageParams<'a>,
}

#[derive(Debug, Deserialize)]
pub(super) struct QueueResponse {
    pub queue_id: String,
}

/// 后端读取 `start`/`end`，`start_chapter`/`count` 一并发送
#[derive(Debug, Serialize)]
pub(super) struct CreateBatchBody<'a> {
    pub project: &'a str,
    pub start_chapter: u32,
    pub count: u32,
    pub start: u32,
    pub end: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct BatchCreatedResponse {
    pub task_id: Option<String>,
    pub job_id: Option<String>,
}

// ============================================================================
// Worldbook
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum CardsResponse {
    Wrapped { cards: Vec<Card> },
    List(Vec<Card>),
}

impl CardsResponse {
    pub fn into_cards(self) -> Vec<Card> {
        match self {
            CardsResponse::Wrapped { cards } | CardsResponse::List(cards) => cards,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum CardResponse {
    Wrapped { card: Card },
    Bare(Card),
}

impl CardResponse {
    pub fn into_card(self) -> Card {
        match self {
            CardResponse::Wrapped { card } | CardResponse::Bare(card) => card,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct ExtractResponse {
    pub extracted: Vec<Card>,
}

// ============================================================================
// Export / Statistics
// ============================================================================

#[derive(Debug, Serialize)]
pub(super) struct ExportBody<'a> {
    pub project: &'a str,
}

#[derive(Debug, Deserialize)]
pub(super) struct ExportResponse {
    pub filename: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct DailyResponse {
    pub daily: Vec<DailyWords>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct RecentResponse {
    pub recent: Vec<RecentEdit>,
}

// ============================================================================
// Settings / Genesis
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct ParamsResponse {
    pub config: GenerationParams,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct SafetyResponse {
    pub settings: SafetySettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct ProposalsResponse {
    pub proposals: Vec<Proposal>,
}

#[derive(Debug, Serialize)]
pub(super) struct ProposalRef<'a> {
    pub config_yaml: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct GenesisInitBody<'a> {
    pub project_name: &'a str,
    pub proposal: ProposalRef<'a>,
    pub config_yaml: &'a str,
}

// ============================================================================
// Chat / Versions
// ============================================================================

#[derive(Debug, Serialize)]
pub(super) struct ChatBody<'a> {
    pub project: &'a str,
    pub message: &'a str,
    pub history: &'a [ChatMessage],
}

/// 回复字段名为 `reply`，也接受 `response`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct ChatResponse {
    #[serde(alias = "response")]
    pub reply: String,
}

#[derive(Debug, Serialize)]
pub(super) struct VersionPathBody<'a> {
    pub path: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct VersionsResponse {
    pub versions: Vec<FileVersion>,
}

#[derive(Debug, Serialize)]
pub(super) struct RestoreVersionBody<'a> {
    pub path: &'a str,
    pub version_id: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct SuccessResponse {
    pub success: bool,
}
