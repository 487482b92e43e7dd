pub mod llm;
pub mod repository;
pub mod session;
