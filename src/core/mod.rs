pub mod chat;
pub mod context_cache;
pub mod embeddings;
pub mod engine;
pub mod generation;
pub mod lifecycle;
pub mod locks;
pub mod logging;
pub mod retrieval;
pub mod templates;
pub mod versioning;
