pub mod catalog;
pub mod hosted;
pub mod ollama;
pub mod orchestrator;
pub mod persona;
pub mod provider;
