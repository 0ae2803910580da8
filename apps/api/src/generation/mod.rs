// Résumé generation: section selection, backends, the section pipeline,
// document assembly, cover letters and the orchestrator tying them together.
// All LLM calls go through llm_client.

pub mod assembler;
pub mod backend;
pub mod cover_letter;
pub mod generator;
pub mod handlers;
pub mod job_info;
pub mod pipeline;
pub mod prompts;
pub mod screening;
pub mod section;
