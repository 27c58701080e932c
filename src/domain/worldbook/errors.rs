//! Worldbook Context - Errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CardError {
    #[error("卡片名称不能为空")]
    EmptyName,

    #[error("未知的卡片类别: {0}")]
    UnknownType(String),
}
