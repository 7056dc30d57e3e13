// Entity identifiers and type tags
pub mod id;

// Entity model, type-compatibility rules, name matching
pub mod entity;

// Redis-backed persistence (key schema, batched writes)
pub mod storage;

// Per-process object cache
pub mod cache;

// Inter-process coordination channel
pub mod isc;

// World orchestration
pub mod world;

// Configuration
pub mod config;

// Error taxonomy
pub mod error;
