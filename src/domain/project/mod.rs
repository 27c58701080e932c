//! Project Context - 项目结构限界上下文
//!
//! 职责:
//! - 项目摘要
//! - 总纲 / 卷 / 章 结构树
//! - 编辑器选择

mod aggregate;
mod entities;
mod errors;
mod value_objects;

pub use aggregate::Structure;
pub use entities::{Project, Script, Volume};
pub use errors::ProjectError;
pub use value_objects::{NodeRef, ProjectId, Selection};
