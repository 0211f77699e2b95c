pub mod command;
pub mod config;
pub mod database;
pub mod embedding;
pub mod emotion;
pub mod llm_client;
pub mod memory;
pub mod orchestrator;
pub mod personality;
