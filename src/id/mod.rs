use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::WorldError;

#[cfg(test)]
mod tests;

/// The closed set of entity kinds.
///
/// The single-character prefix is significant on the wire: it appears in
/// extended ids (`r:<shortid>`) and in index keys (`i:r:all`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Room,
    Player,
    Item,
    Script,
    Action,
}

impl EntityType {
    /// One-character prefix used in extended ids and index keys
    pub fn prefix(&self) -> &'static str {
        match self {
            EntityType::Room => "r",
            EntityType::Player => "p",
            EntityType::Item => "i",
            EntityType::Script => "s",
            EntityType::Action => "a",
        }
    }

    /// Reverse of [`prefix`](Self::prefix); `None` for unrecognized tags
    pub fn from_prefix(prefix: &str) -> Option<EntityType> {
        match prefix {
            "r" => Some(EntityType::Room),
            "p" => Some(EntityType::Player),
            "i" => Some(EntityType::Item),
            "s" => Some(EntityType::Script),
            "a" => Some(EntityType::Action),
            _ => None,
        }
    }

    /// Human-readable label, used in log lines and error messages
    pub fn label(&self) -> &'static str {
        match self {
            EntityType::Room => "room",
            EntityType::Player => "player",
            EntityType::Item => "item",
            EntityType::Script => "script",
            EntityType::Action => "action",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Entity identifier: a `(type, shortid)` pair.
///
/// The string form `type:shortid` is the "extended id". Shortids are opaque,
/// globally unique tokens (UUIDv7 at generation time) and are never reused,
/// even after the entity is destroyed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityId {
    etype: EntityType,
    short: String,
}

impl EntityId {
    pub fn new(etype: EntityType, short: impl Into<String>) -> Self {
        Self {
            etype,
            short: short.into(),
        }
    }

    /// Mint a fresh identifier with a time-ordered shortid
    pub fn generate(etype: EntityType) -> Self {
        Self {
            etype,
            short: Uuid::now_v7().simple().to_string(),
        }
    }

    pub fn etype(&self) -> EntityType {
        self.etype
    }

    pub fn short(&self) -> &str {
        &self.short
    }

    /// Extended string form, `type:shortid`
    pub fn extended(&self) -> String {
        format!("{}:{}", self.etype.prefix(), self.short)
    }

    /// Parse a full extended id. The type prefix is required here; use
    /// [`split_extended_id`] when a bare shortid is acceptable.
    pub fn parse(s: &str) -> Result<EntityId, WorldError> {
        match split_extended_id(s)? {
            (Some(etype), short) => Ok(EntityId::new(etype, short)),
            (None, _) => Err(WorldError::InvalidId(format!(
                "'{}' is missing a type prefix",
                s
            ))),
        }
    }

    /// Interpret a short or extended id where the expected type is already
    /// known from context. A conflicting explicit prefix is an error.
    pub fn parse_in_context(s: &str, etype: EntityType) -> Result<EntityId, WorldError> {
        match split_extended_id(s)? {
            (Some(tagged), short) if tagged == etype => Ok(EntityId::new(etype, short)),
            (Some(tagged), _) => Err(WorldError::InvalidId(format!(
                "'{}' is a {}, expected a {}",
                s, tagged, etype
            ))),
            (None, short) => Ok(EntityId::new(etype, short)),
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.etype.prefix(), self.short)
    }
}

/// Split an id string into its optional type tag and shortid.
///
/// Accepted forms:
/// - `"r:abc"` → `(Some(Room), "abc")`
/// - `"abc"` → `(None, "abc")` (bare shortid, type known from context)
///
/// Rejected: an unrecognized type tag (`"_:abc"`), a tag with no id after
/// it (`"r:"`), and the empty string.
pub fn split_extended_id(s: &str) -> Result<(Option<EntityType>, &str), WorldError> {
    if s.is_empty() {
        return Err(WorldError::InvalidId("empty id".to_string()));
    }

    match s.split_once(':') {
        None => Ok((None, s)),
        Some((prefix, rest)) => {
            let etype = EntityType::from_prefix(prefix).ok_or_else(|| {
                WorldError::InvalidId(format!("unknown type tag '{}' in '{}'", prefix, s))
            })?;
            if rest.is_empty() {
                return Err(WorldError::InvalidId(format!(
                    "'{}' has a type tag but no id",
                    s
                )));
            }
            Ok((Some(etype), rest))
        }
    }
}
