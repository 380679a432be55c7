pub mod api;
pub mod llm;
pub mod models;
