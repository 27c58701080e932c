//! Command Handlers

mod export_handlers;
mod settings_handlers;
mod structure_handlers;

pub use export_handlers::ExportProjectHandler;
pub use settings_handlers::{
    ApplyPresetHandler, SaveSystemPromptHandler, UpdateGenerationParamsHandler,
    UpdateSafetyHandler,
};
pub use structure_handlers::{
    AddChapterHandler, AddVolumeHandler, GenerateStructureHandler, StructureChanged,
};
