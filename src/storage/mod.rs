use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;
use tracing::warn;

use crate::entity::Entity;
use crate::error::WorldError;
use crate::id::{EntityId, EntityType};

pub mod keys;
mod props;

pub use props::PropValue;

/// Named root pointers stored in the `i:root` hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootRef {
    RootRoom,
    God,
    StartRoom,
    PlayerRoot,
}

impl RootRef {
    pub fn field(&self) -> &'static str {
        match self {
            RootRef::RootRoom => "root_room",
            RootRef::God => "god",
            RootRef::StartRoom => "start_room",
            RootRef::PlayerRoot => "player_root",
        }
    }
}

/// Root pointers loaded at world bootstrap.
#[derive(Debug, Clone, Default)]
pub struct RootPointers {
    pub root_room: Option<EntityId>,
    pub god: Option<EntityId>,
    pub start_room: Option<EntityId>,
    pub player_root: Option<EntityId>,
}

/// Translates entity operations into backing-store reads and writes.
///
/// Every mutating recipe is one atomic pipeline (MULTI/EXEC): either all of
/// its writes land back-to-back or none are visible. Reads of missing keys
/// return `None`/empty rather than erroring.
#[derive(Clone)]
pub struct Storage {
    conn: ConnectionManager,
}

impl Storage {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    /// True if a metadata record exists for this id
    pub async fn object_exists(&self, id: &EntityId) -> Result<bool, WorldError> {
        let mut conn = self.conn.clone();
        Ok(conn.exists(keys::meta(id)).await?)
    }

    /// Load the raw metadata hash; `None` when no record exists
    pub async fn load_meta(
        &self,
        id: &EntityId,
    ) -> Result<Option<HashMap<String, String>>, WorldError> {
        let mut conn = self.conn.clone();
        let meta: HashMap<String, String> = conn.hgetall(keys::meta(id)).await?;
        if meta.is_empty() {
            Ok(None)
        } else {
            Ok(Some(meta))
        }
    }

    /// Persist a freshly created entity.
    ///
    /// One batch: metadata hash, per-type index, player name index, and the
    /// membership-add for the initial location. Refuses to overwrite an
    /// existing metadata record.
    pub async fn add_object(&self, entity: &Entity) -> Result<(), WorldError> {
        let mut conn = self.conn.clone();
        let ext = entity.id.extended();

        if conn.exists::<_, bool>(keys::meta(&entity.id)).await? {
            return Err(WorldError::ObjectIdExists(ext));
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.hset_multiple(keys::meta(&entity.id), &entity.meta_fields())
            .ignore();
        pipe.sadd(keys::type_index(entity.etype()), &ext).ignore();
        if entity.is(EntityType::Player) {
            pipe.hset(keys::PLAYER_NAMES, entity.name.to_lowercase(), &ext)
                .ignore();
        }
        if let Some(location) = &entity.location {
            pipe.sadd(keys::contents(location), &ext).ignore();
        }
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    /// Delete every key belonging to an entity and unlink it from the
    /// indexes and its container. Idempotent: deleting an already-absent
    /// object succeeds.
    pub async fn destroy_object(&self, entity: &Entity) -> Result<(), WorldError> {
        let mut conn = self.conn.clone();
        let ext = entity.id.extended();

        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.del(keys::meta(&entity.id)).ignore();
        pipe.del(keys::props(&entity.id)).ignore();
        pipe.del(keys::contents(&entity.id)).ignore();
        if entity.is(EntityType::Script) {
            pipe.del(keys::script(&entity.id)).ignore();
        }
        pipe.srem(keys::type_index(entity.etype()), &ext).ignore();
        if entity.is(EntityType::Player) {
            pipe.hdel(keys::PLAYER_NAMES, entity.name.to_lowercase())
                .ignore();
        }
        if let Some(location) = &entity.location {
            pipe.srem(keys::contents(location), &ext).ignore();
        }
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    /// Rewrite the location pointer and move the id between the old and new
    /// membership sets, all in one batch.
    pub async fn move_object(
        &self,
        id: &EntityId,
        old: Option<&EntityId>,
        new: Option<&EntityId>,
    ) -> Result<(), WorldError> {
        let mut conn = self.conn.clone();
        let ext = id.extended();

        let mut pipe = redis::pipe();
        pipe.atomic();
        match new {
            Some(new) => {
                pipe.hset(keys::meta(id), "location", new.extended()).ignore();
                pipe.sadd(keys::contents(new), &ext).ignore();
            }
            None => {
                pipe.hdel(keys::meta(id), "location").ignore();
            }
        }
        if let Some(old) = old {
            pipe.srem(keys::contents(old), &ext).ignore();
        }
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    /// Rewrite the parent pointer. Parents carry no membership set, so this
    /// is a single field write.
    pub async fn reparent_object(
        &self,
        id: &EntityId,
        new_parent: &EntityId,
    ) -> Result<(), WorldError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .hset(keys::meta(id), "parent", new_parent.extended())
            .await?;
        Ok(())
    }

    /// Relocate a set of entities sharing one source container to one
    /// destination, in a single batch. Used by destroy-time spill: partial
    /// migration must not be observable.
    pub async fn move_objects(
        &self,
        ids: &[EntityId],
        from: &EntityId,
        to: Option<&EntityId>,
    ) -> Result<(), WorldError> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();

        let mut pipe = redis::pipe();
        pipe.atomic();
        for id in ids {
            let ext = id.extended();
            match to {
                Some(to) => {
                    pipe.hset(keys::meta(id), "location", to.extended()).ignore();
                    pipe.sadd(keys::contents(to), &ext).ignore();
                }
                None => {
                    pipe.hdel(keys::meta(id), "location").ignore();
                }
            }
            pipe.srem(keys::contents(from), &ext).ignore();
        }
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    /// Rewrite the name, updating the player name index in the same batch
    /// so there is no window where the old and new name both (or neither)
    /// resolve.
    pub async fn rename_object(
        &self,
        entity: &Entity,
        new_name: &str,
    ) -> Result<(), WorldError> {
        let mut conn = self.conn.clone();

        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.hset(keys::meta(&entity.id), "name", new_name).ignore();
        if entity.is(EntityType::Player) {
            pipe.hdel(keys::PLAYER_NAMES, entity.name.to_lowercase())
                .ignore();
            pipe.hset(
                keys::PLAYER_NAMES,
                new_name.to_lowercase(),
                entity.id.extended(),
            )
            .ignore();
        }
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    /// Raw member ids of a container's membership set
    pub async fn contents_ids(&self, id: &EntityId) -> Result<Vec<String>, WorldError> {
        let mut conn = self.conn.clone();
        Ok(conn.smembers(keys::contents(id)).await?)
    }

    /// All ids of one type, from the global per-type index. Unparseable
    /// entries are logged and skipped.
    pub async fn all_ids(&self, etype: EntityType) -> Result<Vec<EntityId>, WorldError> {
        let mut conn = self.conn.clone();
        let raw: Vec<String> = conn.smembers(keys::type_index(etype)).await?;
        let mut ids = Vec::with_capacity(raw.len());
        for entry in raw {
            match EntityId::parse(&entry) {
                Ok(id) => ids.push(id),
                Err(e) => warn!(entry = %entry, error = %e, "Skipping malformed index entry"),
            }
        }
        Ok(ids)
    }

    pub async fn get_prop(
        &self,
        id: &EntityId,
        key: &str,
    ) -> Result<Option<PropValue>, WorldError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.hget(keys::props(id), key).await?;
        raw.map(|s| PropValue::decode(&s)).transpose()
    }

    /// Write one property. `None` deletes the field rather than storing a
    /// null marker.
    pub async fn set_prop(
        &self,
        id: &EntityId,
        key: &str,
        value: Option<&PropValue>,
    ) -> Result<(), WorldError> {
        let mut conn = self.conn.clone();
        match value {
            Some(value) => {
                value.validate()?;
                let _: () = conn.hset(keys::props(id), key, value.encode()?).await?;
            }
            None => {
                let _: () = conn.hdel(keys::props(id), key).await?;
            }
        }
        Ok(())
    }

    pub async fn get_props(
        &self,
        id: &EntityId,
    ) -> Result<HashMap<String, PropValue>, WorldError> {
        let mut conn = self.conn.clone();
        let raw: HashMap<String, String> = conn.hgetall(keys::props(id)).await?;
        let mut out = HashMap::with_capacity(raw.len());
        for (key, value) in raw {
            out.insert(key, PropValue::decode(&value)?);
        }
        Ok(out)
    }

    /// Write several properties in one batch
    pub async fn set_props(
        &self,
        id: &EntityId,
        values: &HashMap<String, PropValue>,
    ) -> Result<(), WorldError> {
        if values.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        pipe.atomic();
        for (key, value) in values {
            value.validate()?;
            pipe.hset(keys::props(id), key, value.encode()?).ignore();
        }
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    /// Case-insensitive player lookup through the name index
    pub async fn find_player_by_name(
        &self,
        name: &str,
    ) -> Result<Option<EntityId>, WorldError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.hget(keys::PLAYER_NAMES, name.to_lowercase()).await?;
        raw.map(|s| EntityId::parse(&s)).transpose()
    }

    /// Opaque credential string stored on the player's metadata hash.
    /// Hashing/verification happens outside the core.
    pub async fn player_credential(&self, id: &EntityId) -> Result<Option<String>, WorldError> {
        let mut conn = self.conn.clone();
        Ok(conn.hget(keys::meta(id), "password").await?)
    }

    pub async fn set_player_credential(
        &self,
        id: &EntityId,
        credential: &str,
    ) -> Result<(), WorldError> {
        let mut conn = self.conn.clone();
        let _: () = conn.hset(keys::meta(id), "password", credential).await?;
        Ok(())
    }

    pub async fn get_root(&self, root: RootRef) -> Result<Option<EntityId>, WorldError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.hget(keys::ROOTS, root.field()).await?;
        raw.map(|s| EntityId::parse(&s)).transpose()
    }

    pub async fn set_root(&self, root: RootRef, id: &EntityId) -> Result<(), WorldError> {
        let mut conn = self.conn.clone();
        let _: () = conn.hset(keys::ROOTS, root.field(), id.extended()).await?;
        Ok(())
    }

    pub async fn load_roots(&self) -> Result<RootPointers, WorldError> {
        let mut conn = self.conn.clone();
        let raw: HashMap<String, String> = conn.hgetall(keys::ROOTS).await?;
        let pointer = |root: RootRef| -> Result<Option<EntityId>, WorldError> {
            raw.get(root.field()).map(|s| EntityId::parse(s)).transpose()
        };
        Ok(RootPointers {
            root_room: pointer(RootRef::RootRoom)?,
            god: pointer(RootRef::God)?,
            start_room: pointer(RootRef::StartRoom)?,
            player_root: pointer(RootRef::PlayerRoot)?,
        })
    }

    pub async fn script_source(&self, id: &EntityId) -> Result<Option<String>, WorldError> {
        let mut conn = self.conn.clone();
        Ok(conn.get(keys::script(id)).await?)
    }

    pub async fn set_script_source(
        &self,
        id: &EntityId,
        source: &str,
    ) -> Result<(), WorldError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(keys::script(id), source).await?;
        Ok(())
    }

    /// Publish a payload on a channel sharing this store
    pub async fn publish(&self, channel: &str, payload: &str) -> Result<(), WorldError> {
        let mut conn = self.conn.clone();
        let _: () = conn.publish(channel, payload).await?;
        Ok(())
    }

    /// Number of connections currently subscribed to a channel
    pub async fn subscriber_count(&self, channel: &str) -> Result<i64, WorldError> {
        let mut conn = self.conn.clone();
        let counts: HashMap<String, i64> = redis::cmd("PUBSUB")
            .arg("NUMSUB")
            .arg(channel)
            .query_async(&mut conn)
            .await?;
        Ok(counts.get(channel).copied().unwrap_or(0))
    }

    /// Delete every object and index key. The caller is responsible for
    /// checking that no other process is attached first.
    pub async fn wipe(&self) -> Result<u64, WorldError> {
        let mut conn = self.conn.clone();
        let mut deleted = 0u64;
        for pattern in ["s:*", "i:*"] {
            let found: Vec<String> = conn.keys(pattern).await?;
            if !found.is_empty() {
                let removed: u64 = conn.del(found).await?;
                deleted += removed;
            }
        }
        Ok(deleted)
    }
}
