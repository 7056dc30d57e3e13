use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::error::WorldError;
use crate::id::{EntityId, EntityType};

#[cfg(test)]
mod tests;

/// Reserved command-prefix character. Action names must not contain it,
/// otherwise the action could never be invoked by the command layer.
pub const COMMAND_PREFIX: char = '@';

/// An entity in the world.
///
/// `parent` is the ownership/authorship lineage pointer; `location` is the
/// containment pointer. These are distinct relations: an item authored by a
/// player (`parent`) may sit in a room (`location`).
///
/// `destroyed` is an in-memory marker only. Destroy deletes the persisted
/// record outright, so a loaded entity is never destroyed; the flag exists
/// so an instance that was destroyed through this process rejects further
/// mutation immediately.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub creator: Option<EntityId>,
    pub parent: Option<EntityId>,
    pub location: Option<EntityId>,
    /// Room or Script triggered by this action (Action entities only)
    pub target: Option<EntityId>,
    /// Script source text, loaded lazily (Script entities only)
    pub source: Option<String>,
    pub created: DateTime<Utc>,
    pub destroyed: bool,
}

impl Entity {
    /// Build a fresh, not-yet-persisted entity with a generated id.
    pub fn new(
        etype: EntityType,
        name: impl Into<String>,
        creator: Option<EntityId>,
        parent: Option<EntityId>,
        location: Option<EntityId>,
    ) -> Self {
        Self {
            id: EntityId::generate(etype),
            name: name.into(),
            creator,
            parent,
            location,
            target: None,
            source: None,
            created: Utc::now(),
            destroyed: false,
        }
    }

    pub fn etype(&self) -> EntityType {
        self.id.etype()
    }

    pub fn is(&self, etype: EntityType) -> bool {
        self.id.etype() == etype
    }

    /// Metadata hash fields as written to `s:<id>:meta`.
    ///
    /// Absent pointers are omitted rather than stored as empty strings.
    /// Script source is not a metadata field; it lives under its own key.
    pub fn meta_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("name", self.name.clone()),
            ("created", self.created.to_rfc3339()),
        ];
        if let Some(creator) = &self.creator {
            fields.push(("creator", creator.extended()));
        }
        if let Some(parent) = &self.parent {
            fields.push(("parent", parent.extended()));
        }
        if let Some(location) = &self.location {
            fields.push(("location", location.extended()));
        }
        if let Some(target) = &self.target {
            fields.push(("target", target.extended()));
        }
        fields
    }

    /// Rebuild an entity from its metadata hash.
    pub fn from_meta(id: EntityId, meta: &HashMap<String, String>) -> Result<Entity, WorldError> {
        let pointer = |field: &str| -> Result<Option<EntityId>, WorldError> {
            meta.get(field).map(|s| EntityId::parse(s)).transpose()
        };

        let name = meta
            .get("name")
            .cloned()
            .ok_or_else(|| WorldError::InvalidId(format!("metadata for '{}' has no name", id)))?;
        let created = meta
            .get("created")
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        Ok(Entity {
            name,
            creator: pointer("creator")?,
            parent: pointer("parent")?,
            location: pointer("location")?,
            target: pointer("target")?,
            source: None,
            created,
            destroyed: false,
            id,
        })
    }

    /// Case-insensitive match on the full name or on any `;`-delimited
    /// alias token. No fuzzy matching.
    pub fn name_matches(&self, term: &str) -> bool {
        name_matches(&self.name, term)
    }
}

/// Which entity types may appear as `parent` of a given type.
pub fn parent_allowed(child: EntityType, parent: EntityType) -> bool {
    use EntityType::*;
    match child {
        Room => parent == Room,
        Player => parent == Room,
        Item => matches!(parent, Room | Player | Item),
        Script => parent == Player,
        Action => parent == Player,
    }
}

/// Which entity types may appear as `location` (container) of a given type.
pub fn location_allowed(child: EntityType, container: EntityType) -> bool {
    use EntityType::*;
    match child {
        Room => container == Room,
        Player => matches!(container, Room | Item),
        Item => matches!(container, Room | Player | Item),
        Script => matches!(container, Room | Player | Item),
        Action => matches!(container, Room | Player | Item | Script),
    }
}

/// Which entity types an Action may trigger.
pub fn target_allowed(target: EntityType) -> bool {
    matches!(target, EntityType::Room | EntityType::Script)
}

/// Validate a name at create/rename time.
pub fn validate_name(etype: EntityType, name: &str) -> Result<(), WorldError> {
    if name.trim().is_empty() {
        return Err(WorldError::InvalidName("name must not be empty".to_string()));
    }
    if etype == EntityType::Action && name.contains(COMMAND_PREFIX) {
        return Err(WorldError::InvalidName(format!(
            "action names must not contain '{}'",
            COMMAND_PREFIX
        )));
    }
    Ok(())
}

/// Case-insensitive exact match on a full name or on any `;`-delimited
/// alias token.
pub fn name_matches(name: &str, term: &str) -> bool {
    if name.eq_ignore_ascii_case(term) {
        return true;
    }
    name.split(';')
        .any(|alias| alias.trim().eq_ignore_ascii_case(term))
}
