pub mod context;
pub mod core;
pub mod extract;
pub mod launch;
pub mod llm;
pub mod rag;
pub mod server;
pub mod state;
pub mod themes;
