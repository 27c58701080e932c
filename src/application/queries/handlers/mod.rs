//! Query Handlers 实现

mod settings_handlers;
mod statistics_handlers;

pub use settings_handlers::*;
pub use statistics_handlers::*;
