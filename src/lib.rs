pub mod context;
pub mod core;
pub mod llm;
pub mod memory;
pub mod pipeline;
pub mod rag;
pub mod scrape;
pub mod server;
pub mod session;
pub mod state;
