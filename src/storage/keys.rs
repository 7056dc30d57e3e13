//! Backing-store key schema.
//!
//! The namespace prefixes are significant and shared with every process
//! attached to the same store: `s:` for per-object state, `i:` for global
//! indexes, `c:` for pub/sub channels.

use crate::id::{EntityId, EntityType};

/// Hash of entity metadata fields (`name`, `creator`, `parent`, `location`, ...)
pub fn meta(id: &EntityId) -> String {
    format!("s:{}:meta", id.extended())
}

/// Hash of property name → JSON-encoded value
pub fn props(id: &EntityId) -> String {
    format!("s:{}:props", id.extended())
}

/// Set of ids currently contained in this entity
pub fn contents(id: &EntityId) -> String {
    format!("s:{}:contents", id.extended())
}

/// Raw script source text (Script entities only)
pub fn script(id: &EntityId) -> String {
    format!("s:{}:script", id.extended())
}

/// Global set of all ids of one type
pub fn type_index(etype: EntityType) -> String {
    format!("i:{}:all", etype.prefix())
}

/// Per-entity message channel
pub fn channel(id: &EntityId) -> String {
    format!("c:{}", id.extended())
}

/// Hash of lowercase player name → player id
pub const PLAYER_NAMES: &str = "i:p:names";

/// Hash of named root pointers
pub const ROOTS: &str = "i:root";

/// World-wide message channel
pub const WORLD_CHANNEL: &str = "c:world";

/// Inter-process coordination channel
pub const ISC_CHANNEL: &str = "c:isc";
