//! Worldbook Context - 世界观设定卡片
//!
//! 职责:
//! - 卡片实体与类别
//! - 客户端过滤与计数

mod card;
mod errors;
mod filter;

pub use card::{Card, CardDraft, CardId, CardType};
pub use errors::CardError;
pub use filter::{category_counts, CardFilter, CategoryFilter};
