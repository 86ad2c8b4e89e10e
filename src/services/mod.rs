pub mod checkpoint;
pub mod event_translator;
pub mod orchestrator;
pub mod prompt_templates;
pub mod source_metadata;
pub mod structured_output;
