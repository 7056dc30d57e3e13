use anyhow::{bail, Context, Result};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::cache::ObjectCache;
use crate::config::{CacheConfig, MudConfig};
use crate::entity::{
    location_allowed, parent_allowed, target_allowed, validate_name, Entity,
};
use crate::error::WorldError;
use crate::id::{EntityId, EntityType};
use crate::isc::Isc;
use crate::storage::{keys, PropValue, RootPointers, RootRef, Storage};

mod events;
#[cfg(test)]
mod tests;

pub use events::{DestroyEvent, MoveEvent, MoveKind};

const STATE_CREATED: u8 = 0;
const STATE_LIVE: u8 = 1;
const STATE_SHUTDOWN: u8 = 2;

struct WorldRuntime {
    storage: Storage,
    cache: Arc<ObjectCache>,
    isc: Isc,
}

/// Ids of the entities seeded by [`World::bootstrap`].
#[derive(Debug, Clone)]
pub struct BootstrapIds {
    pub root_room: EntityId,
    pub god: EntityId,
    pub start_room: EntityId,
    pub player_root: EntityId,
}

/// The single entry point for every subsystem touching world state.
///
/// Composes Storage, the per-process object cache and the coordination
/// channel. One instance per process; constructed at process start and
/// initialized once. Every mutating entry point checks the lifecycle state
/// first and fails fast with `WorldNotInitialized` / `WorldShutdown`.
pub struct World {
    config: MudConfig,
    state: AtomicU8,
    runtime: OnceLock<WorldRuntime>,
    move_tx: broadcast::Sender<MoveEvent>,
    destroy_tx: broadcast::Sender<DestroyEvent>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl World {
    pub fn new(config: MudConfig) -> Self {
        let (move_tx, _) = broadcast::channel(1000);
        let (destroy_tx, _) = broadcast::channel(100);
        Self {
            config,
            state: AtomicU8::new(STATE_CREATED),
            runtime: OnceLock::new(),
            move_tx,
            destroy_tx,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Connect to the backing store, join the coordination channel and
    /// start the background loops. Must be called exactly once.
    pub async fn init(&self) -> Result<()> {
        if self.state.load(Ordering::SeqCst) != STATE_CREATED {
            bail!("world already initialized");
        }

        info!(url = %self.config.redis.url, "Connecting to backing store");
        let client = redis::Client::open(self.config.redis.url.as_str())
            .context("Invalid redis URL")?;
        let conn = client
            .get_connection_manager()
            .await
            .context("Failed to connect to redis")?;

        let (isc_tx, isc_rx) = mpsc::unbounded_channel();
        let cache = Arc::new(ObjectCache::new(isc_tx.clone()));
        let storage = Storage::new(conn.clone());

        let (isc, mut isc_tasks) = Isc::join(
            &client,
            conn,
            &self.config.redis.isc_channel,
            Arc::clone(&cache),
            isc_tx,
            isc_rx,
        )
        .await?;

        let sweep = tokio::spawn(run_sweep(Arc::clone(&cache), self.config.cache.clone()));

        let roots = storage.load_roots().await?;
        if roots.root_room.is_none() {
            warn!("No root room configured; storage may need bootstrapping");
        }

        let mut tasks = self.tasks.lock().unwrap();
        tasks.append(&mut isc_tasks);
        tasks.push(sweep);
        drop(tasks);

        self.runtime
            .set(WorldRuntime {
                storage,
                cache,
                isc,
            })
            .ok()
            .expect("runtime set twice");
        self.state.store(STATE_LIVE, Ordering::SeqCst);

        info!("World initialized");
        Ok(())
    }

    /// Stop the background loops and detach from the coordination channel.
    /// Safe to call repeatedly; all further world calls fail with
    /// `WorldShutdown`.
    pub async fn shutdown(&self) {
        if self.state.swap(STATE_SHUTDOWN, Ordering::SeqCst) == STATE_SHUTDOWN {
            return;
        }
        let tasks: Vec<JoinHandle<()>> = self.tasks.lock().unwrap().drain(..).collect();
        for task in tasks {
            task.abort();
        }
        info!("World shut down");
    }

    fn runtime(&self) -> Result<&WorldRuntime, WorldError> {
        match self.state.load(Ordering::SeqCst) {
            STATE_SHUTDOWN => Err(WorldError::WorldShutdown),
            STATE_CREATED => Err(WorldError::WorldNotInitialized),
            _ => self.runtime.get().ok_or(WorldError::WorldNotInitialized),
        }
    }

    /// Observer channel for move/reparent events
    pub fn subscribe_moves(&self) -> broadcast::Receiver<MoveEvent> {
        self.move_tx.subscribe()
    }

    /// Observer channel for destroy events
    pub fn subscribe_destroys(&self) -> broadcast::Receiver<DestroyEvent> {
        self.destroy_tx.subscribe()
    }

    // ── Lookup ────────────────────────────────────────────────────────────

    /// Cached instance only; never loads from storage
    pub fn get_object(
        &self,
        id: &EntityId,
        expected: Option<EntityType>,
    ) -> Result<Option<Entity>, WorldError> {
        self.runtime()?.cache.get_object(id, expected)
    }

    /// Cached instance if present, else load from storage and register.
    /// First materialization wins across concurrent callers.
    pub async fn imitate(&self, id: &EntityId) -> Result<Entity, WorldError> {
        let rt = self.runtime()?;
        if let Some(cached) = rt.cache.get_object(id, None)? {
            return Ok(cached);
        }
        let meta = rt
            .storage
            .load_meta(id)
            .await?
            .ok_or_else(|| WorldError::ObjectDoesNotExist(id.extended()))?;
        let entity = Entity::from_meta(id.clone(), &meta)?;
        Ok(rt.cache.register_imitated(entity))
    }

    /// [`imitate`](Self::imitate) with a type expectation checked up front
    pub async fn imitate_typed(
        &self,
        id: &EntityId,
        etype: EntityType,
    ) -> Result<Entity, WorldError> {
        if id.etype() != etype {
            return Err(WorldError::InvalidId(format!(
                "'{}' is a {}, expected a {}",
                id,
                id.etype(),
                etype
            )));
        }
        self.imitate(id).await
    }

    /// All ids of one type, from the global per-type index
    pub async fn all_ids(&self, etype: EntityType) -> Result<Vec<EntityId>, WorldError> {
        self.runtime()?.storage.all_ids(etype).await
    }

    /// Player lookup through the case-insensitive name index. A stale index
    /// entry pointing at a missing record resolves to `None`.
    pub async fn find_player_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Entity>, WorldError> {
        let rt = self.runtime()?;
        let Some(id) = rt.storage.find_player_by_name(name).await? else {
            return Ok(None);
        };
        match self.imitate(&id).await {
            Ok(player) => Ok(Some(player)),
            Err(WorldError::ObjectDoesNotExist(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    // ── Creation ──────────────────────────────────────────────────────────

    pub async fn create_room(
        &self,
        name: &str,
        creator: Option<&EntityId>,
        parent: Option<&EntityId>,
        location: Option<&EntityId>,
    ) -> Result<Entity, WorldError> {
        self.create_entity(EntityType::Room, name, creator, parent, location, None)
            .await
    }

    pub async fn create_player(
        &self,
        name: &str,
        creator: Option<&EntityId>,
        parent: Option<&EntityId>,
        location: Option<&EntityId>,
    ) -> Result<Entity, WorldError> {
        let rt = self.runtime()?;
        if let Some(existing) = rt.storage.find_player_by_name(name).await? {
            debug!(name = %name, existing = %existing, "Player name collision");
            return Err(WorldError::PlayerNameAlreadyExists(name.to_string()));
        }
        self.create_entity(EntityType::Player, name, creator, parent, location, None)
            .await
    }

    pub async fn create_item(
        &self,
        name: &str,
        creator: Option<&EntityId>,
        parent: Option<&EntityId>,
        location: Option<&EntityId>,
    ) -> Result<Entity, WorldError> {
        self.create_entity(EntityType::Item, name, creator, parent, location, None)
            .await
    }

    pub async fn create_script(
        &self,
        name: &str,
        creator: Option<&EntityId>,
        parent: Option<&EntityId>,
        location: Option<&EntityId>,
    ) -> Result<Entity, WorldError> {
        self.create_entity(EntityType::Script, name, creator, parent, location, None)
            .await
    }

    /// Actions additionally carry an optional trigger target (a Room or a
    /// Script).
    pub async fn create_action(
        &self,
        name: &str,
        creator: Option<&EntityId>,
        parent: Option<&EntityId>,
        location: Option<&EntityId>,
        target: Option<&EntityId>,
    ) -> Result<Entity, WorldError> {
        self.create_entity(EntityType::Action, name, creator, parent, location, target)
            .await
    }

    async fn create_entity(
        &self,
        etype: EntityType,
        name: &str,
        creator: Option<&EntityId>,
        parent: Option<&EntityId>,
        location: Option<&EntityId>,
        target: Option<&EntityId>,
    ) -> Result<Entity, WorldError> {
        let rt = self.runtime()?;

        validate_name(etype, name)?;

        if let Some(parent) = parent {
            let existing = self.imitate(parent).await?;
            if existing.destroyed {
                return Err(WorldError::ObjectDestroyed(parent.extended()));
            }
            if !parent_allowed(etype, parent.etype()) {
                return Err(WorldError::InvalidParent(format!(
                    "a {} cannot have a {} parent",
                    etype,
                    parent.etype()
                )));
            }
        }
        if let Some(location) = location {
            let existing = self.imitate(location).await?;
            if existing.destroyed {
                return Err(WorldError::ObjectDestroyed(location.extended()));
            }
            if !location_allowed(etype, location.etype()) {
                return Err(WorldError::InvalidLocation(format!(
                    "a {} cannot be located in a {}",
                    etype,
                    location.etype()
                )));
            }
        }
        if let Some(target) = target {
            if !target_allowed(target.etype()) {
                return Err(WorldError::InvalidLocation(format!(
                    "an action cannot target a {}",
                    target.etype()
                )));
            }
            let existing = self.imitate(target).await?;
            if existing.destroyed {
                return Err(WorldError::ObjectDestroyed(target.extended()));
            }
        }

        let mut entity = Entity::new(
            etype,
            name,
            creator.cloned(),
            parent.cloned(),
            location.cloned(),
        );
        entity.target = target.cloned();

        // Register before the persistence write: of two concurrent creates
        // for one id, exactly one passes this check-and-insert.
        rt.cache.register_created(entity.clone())?;
        if let Err(e) = rt.storage.add_object(&entity).await {
            rt.cache.unregister(&entity.id);
            return Err(e);
        }

        info!(id = %entity.id, etype = %etype, name = %name, "Entity created");
        Ok(entity)
    }

    // ── Mutation ──────────────────────────────────────────────────────────

    /// Rewrite the name. For players the name-lookup index is updated in
    /// the same batch, so a refresh read from any process observes the new
    /// name and the index together.
    pub async fn rename(&self, id: &EntityId, new_name: &str) -> Result<Entity, WorldError> {
        let rt = self.runtime()?;
        let mut entity = self.imitate(id).await?;
        if entity.destroyed {
            return Err(WorldError::ObjectDestroyed(id.extended()));
        }
        validate_name(id.etype(), new_name)?;
        if entity.is(EntityType::Player) {
            if let Some(existing) = rt.storage.find_player_by_name(new_name).await? {
                if existing != *id {
                    return Err(WorldError::PlayerNameAlreadyExists(new_name.to_string()));
                }
            }
        }

        rt.storage.rename_object(&entity, new_name).await?;
        entity.name = new_name.to_string();
        rt.cache.replace(entity.clone());
        rt.cache.broadcast_invalidation(id);

        info!(id = %id, name = %new_name, "Entity renamed");
        Ok(entity)
    }

    /// Move to a new container. The entity's pointer and both membership
    /// sets change in one batch. Moving to an absent target is a no-op
    /// returning `None`.
    pub async fn move_entity(
        &self,
        id: &EntityId,
        new_location: Option<&EntityId>,
    ) -> Result<Option<Entity>, WorldError> {
        let rt = self.runtime()?;
        let Some(dest) = new_location else {
            return Ok(None);
        };

        let mut entity = self.imitate(id).await?;
        if entity.destroyed {
            return Err(WorldError::ObjectDestroyed(id.extended()));
        }
        let container = self.imitate(dest).await?;
        if container.destroyed {
            return Err(WorldError::ObjectDestroyed(dest.extended()));
        }
        if !location_allowed(id.etype(), dest.etype()) {
            return Err(WorldError::InvalidLocation(format!(
                "a {} cannot be located in a {}",
                id.etype(),
                dest.etype()
            )));
        }

        let old = entity.location.clone();
        rt.storage.move_object(id, old.as_ref(), Some(dest)).await?;
        entity.location = Some(dest.clone());
        rt.cache.replace(entity.clone());
        rt.cache.broadcast_invalidation(id);

        let _ = self.move_tx.send(MoveEvent {
            id: id.clone(),
            kind: MoveKind::Move,
            old,
            new: Some(dest.clone()),
        });

        debug!(id = %id, dest = %dest, "Entity moved");
        Ok(Some(entity))
    }

    /// Rewrite the lineage pointer. Reparenting to an absent target is a
    /// no-op returning `None`.
    pub async fn reparent(
        &self,
        id: &EntityId,
        new_parent: Option<&EntityId>,
    ) -> Result<Option<Entity>, WorldError> {
        let rt = self.runtime()?;
        let Some(dest) = new_parent else {
            return Ok(None);
        };

        let mut entity = self.imitate(id).await?;
        if entity.destroyed {
            return Err(WorldError::ObjectDestroyed(id.extended()));
        }
        let parent = self.imitate(dest).await?;
        if parent.destroyed {
            return Err(WorldError::ObjectDestroyed(dest.extended()));
        }
        if !parent_allowed(id.etype(), dest.etype()) {
            return Err(WorldError::InvalidParent(format!(
                "a {} cannot have a {} parent",
                id.etype(),
                dest.etype()
            )));
        }

        let old = entity.parent.clone();
        rt.storage.reparent_object(id, dest).await?;
        entity.parent = Some(dest.clone());
        rt.cache.replace(entity.clone());
        rt.cache.broadcast_invalidation(id);

        let _ = self.move_tx.send(MoveEvent {
            id: id.clone(),
            kind: MoveKind::Reparent,
            old,
            new: Some(dest.clone()),
        });

        debug!(id = %id, parent = %dest, "Entity reparented");
        Ok(Some(entity))
    }

    /// Destroy an entity: spill its contents to its own location, delete
    /// its records, evict it everywhere. Idempotent; destroying an
    /// already-gone entity reports success.
    pub async fn destroy(&self, id: &EntityId) -> Result<bool, WorldError> {
        let rt = self.runtime()?;
        let entity = match self.imitate(id).await {
            Ok(entity) => entity,
            Err(WorldError::ObjectDoesNotExist(_)) => return Ok(true),
            Err(e) => return Err(e),
        };
        if entity.destroyed {
            return Ok(true);
        }

        // Children first: if the relocation batch fails, the container
        // stays live and its children stay in place.
        self.spill_contents(id).await?;

        rt.storage.destroy_object(&entity).await?;

        let mut entity = entity;
        entity.destroyed = true;
        rt.cache.on_destroy(&entity);

        let _ = self.destroy_tx.send(DestroyEvent { id: id.clone() });

        info!(id = %id, name = %entity.name, "Entity destroyed");
        Ok(true)
    }

    // ── Containment ───────────────────────────────────────────────────────

    /// Materialize a container's contents, optionally restricted to one
    /// type. Ids that fail to resolve are stale references and are dropped
    /// silently.
    pub async fn contents(
        &self,
        container: &EntityId,
        filter: Option<EntityType>,
    ) -> Result<Vec<Entity>, WorldError> {
        let rt = self.runtime()?;
        let raw = rt.storage.contents_ids(container).await?;
        let mut out = Vec::with_capacity(raw.len());
        for entry in raw {
            let id = match EntityId::parse(&entry) {
                Ok(id) => id,
                Err(_) => {
                    debug!(entry = %entry, "Dropping malformed contents reference");
                    continue;
                }
            };
            match self.imitate(&id).await {
                Ok(entity) => {
                    if filter.map_or(true, |t| entity.is(t)) {
                        out.push(entity);
                    }
                }
                Err(WorldError::ObjectDoesNotExist(_)) | Err(WorldError::InvalidId(_)) => {
                    debug!(id = %id, "Dropping stale contents reference");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }

    /// First entity in a container whose name or alias matches the term,
    /// case-insensitively; `None` when nothing matches.
    pub async fn find_in(
        &self,
        container: &EntityId,
        term: &str,
        filter: Option<EntityType>,
    ) -> Result<Option<Entity>, WorldError> {
        let contents = self.contents(container, filter).await?;
        Ok(contents.into_iter().find(|e| e.name_matches(term)))
    }

    /// Relocate every entity contained in `container` to the container's
    /// own current location, as one batch. Trivial success for an empty
    /// container; on batch failure nothing has moved.
    pub async fn spill_contents(&self, container: &EntityId) -> Result<(), WorldError> {
        let rt = self.runtime()?;
        let entity = self.imitate(container).await?;

        let raw = rt.storage.contents_ids(container).await?;
        if raw.is_empty() {
            return Ok(());
        }
        let mut children = Vec::with_capacity(raw.len());
        for entry in &raw {
            match EntityId::parse(entry) {
                Ok(id) => children.push(id),
                Err(_) => debug!(entry = %entry, "Dropping malformed contents reference"),
            }
        }

        let dest = entity.location.clone();
        rt.storage
            .move_objects(&children, container, dest.as_ref())
            .await?;

        for child in children {
            rt.cache.invalidate(&child);
            let _ = self.move_tx.send(MoveEvent {
                id: child,
                kind: MoveKind::Move,
                old: Some(container.clone()),
                new: dest.clone(),
            });
        }

        debug!(container = %container, count = raw.len(), "Spilled contents");
        Ok(())
    }

    // ── Cache control ─────────────────────────────────────────────────────

    /// Evict this process's cached instance only
    pub fn invalidate_local(&self, id: &EntityId) -> Result<(), WorldError> {
        self.runtime()?.cache.invalidate_local(id);
        Ok(())
    }

    /// Evict locally and broadcast the eviction to every other process
    pub fn invalidate(&self, id: &EntityId) -> Result<(), WorldError> {
        self.runtime()?.cache.invalidate(id);
        Ok(())
    }

    /// Evict every cached instance of one type in this process
    pub fn invalidate_all(&self, etype: EntityType) -> Result<(), WorldError> {
        self.runtime()?.cache.invalidate_all(etype);
        Ok(())
    }

    // ── Properties ────────────────────────────────────────────────────────

    pub async fn get_prop(
        &self,
        id: &EntityId,
        key: &str,
    ) -> Result<Option<PropValue>, WorldError> {
        self.runtime()?.storage.get_prop(id, key).await
    }

    /// Write one property; `None` deletes the field.
    pub async fn set_prop(
        &self,
        id: &EntityId,
        key: &str,
        value: Option<&PropValue>,
    ) -> Result<(), WorldError> {
        let rt = self.runtime()?;
        let entity = self.imitate(id).await?;
        if entity.destroyed {
            return Err(WorldError::ObjectDestroyed(id.extended()));
        }
        rt.storage.set_prop(id, key, value).await
    }

    pub async fn get_props(
        &self,
        id: &EntityId,
    ) -> Result<std::collections::HashMap<String, PropValue>, WorldError> {
        self.runtime()?.storage.get_props(id).await
    }

    pub async fn set_props(
        &self,
        id: &EntityId,
        values: &std::collections::HashMap<String, PropValue>,
    ) -> Result<(), WorldError> {
        let rt = self.runtime()?;
        let entity = self.imitate(id).await?;
        if entity.destroyed {
            return Err(WorldError::ObjectDestroyed(id.extended()));
        }
        rt.storage.set_props(id, values).await
    }

    // ── Scripts ───────────────────────────────────────────────────────────

    /// Script source text, fetched lazily and memoized on the cached
    /// instance.
    pub async fn script_source(&self, id: &EntityId) -> Result<Option<String>, WorldError> {
        let rt = self.runtime()?;
        let mut entity = self.imitate_typed(id, EntityType::Script).await?;
        if entity.source.is_some() {
            return Ok(entity.source);
        }
        let source = rt.storage.script_source(id).await?;
        if source.is_some() {
            entity.source = source.clone();
            rt.cache.replace(entity);
        }
        Ok(source)
    }

    /// Rewrite a script's source and flush compiled-script caches in every
    /// process.
    pub async fn set_script_source(
        &self,
        id: &EntityId,
        source: &str,
    ) -> Result<(), WorldError> {
        let rt = self.runtime()?;
        let mut entity = self.imitate_typed(id, EntityType::Script).await?;
        if entity.destroyed {
            return Err(WorldError::ObjectDestroyed(id.extended()));
        }
        rt.storage.set_script_source(id, source).await?;
        entity.source = Some(source.to_string());
        rt.cache.replace(entity);
        rt.cache.broadcast_script_invalidation();
        info!(id = %id, "Script source updated");
        Ok(())
    }

    // ── Players ───────────────────────────────────────────────────────────

    /// Opaque credential string for the session layer's external check
    pub async fn player_credential(
        &self,
        id: &EntityId,
    ) -> Result<Option<String>, WorldError> {
        let rt = self.runtime()?;
        self.imitate_typed(id, EntityType::Player).await?;
        rt.storage.player_credential(id).await
    }

    pub async fn set_player_credential(
        &self,
        id: &EntityId,
        credential: &str,
    ) -> Result<(), WorldError> {
        let rt = self.runtime()?;
        let entity = self.imitate_typed(id, EntityType::Player).await?;
        if entity.destroyed {
            return Err(WorldError::ObjectDestroyed(id.extended()));
        }
        rt.storage.set_player_credential(id, credential).await
    }

    // ── Roots ─────────────────────────────────────────────────────────────

    pub async fn root(&self, root: RootRef) -> Result<Option<EntityId>, WorldError> {
        self.runtime()?.storage.get_root(root).await
    }

    pub async fn set_root(&self, root: RootRef, id: &EntityId) -> Result<(), WorldError> {
        let rt = self.runtime()?;
        let expected = match root {
            RootRef::God => EntityType::Player,
            _ => EntityType::Room,
        };
        if id.etype() != expected {
            return Err(WorldError::InvalidId(format!(
                "root pointer '{}' must be a {}",
                root.field(),
                expected
            )));
        }
        rt.storage.set_root(root, id).await
    }

    pub async fn roots(&self) -> Result<RootPointers, WorldError> {
        self.runtime()?.storage.load_roots().await
    }

    // ── Messaging ─────────────────────────────────────────────────────────

    /// Publish a message on an entity's channel, for the session layer
    pub async fn publish_message(
        &self,
        to: &EntityId,
        payload: &serde_json::Value,
    ) -> Result<(), WorldError> {
        let rt = self.runtime()?;
        rt.storage
            .publish(&keys::channel(to), &serde_json::to_string(payload)?)
            .await
    }

    /// Publish a message on the world-wide channel
    pub async fn publish_world_message(
        &self,
        payload: &serde_json::Value,
    ) -> Result<(), WorldError> {
        let rt = self.runtime()?;
        rt.storage
            .publish(keys::WORLD_CHANNEL, &serde_json::to_string(payload)?)
            .await
    }

    // ── Administration ────────────────────────────────────────────────────

    /// Number of processes currently attached to the coordination channel,
    /// ourselves included
    pub async fn peer_count(&self) -> Result<i64, WorldError> {
        let rt = self.runtime()?;
        rt.storage.subscriber_count(rt.isc.channel()).await
    }

    /// Seed an empty store with the fixed root entities and record their
    /// ids under `i:root`. Fails on a store that is already bootstrapped.
    pub async fn bootstrap(&self) -> Result<BootstrapIds> {
        let rt = self.runtime()?;

        let existing = rt.storage.load_roots().await?;
        if existing.root_room.is_some() {
            bail!("storage is already bootstrapped");
        }

        let root_room = self.create_room("root", None, None, None).await?;
        let god = self
            .create_player("god", None, Some(&root_room.id), Some(&root_room.id))
            .await?;
        let start_room = self
            .create_room("start", Some(&god.id), Some(&root_room.id), None)
            .await?;
        let player_root = self
            .create_room("players", Some(&god.id), Some(&root_room.id), None)
            .await?;

        rt.storage.set_root(RootRef::RootRoom, &root_room.id).await?;
        rt.storage.set_root(RootRef::God, &god.id).await?;
        rt.storage.set_root(RootRef::StartRoom, &start_room.id).await?;
        rt.storage
            .set_root(RootRef::PlayerRoot, &player_root.id)
            .await?;

        info!(root_room = %root_room.id, god = %god.id, "Storage bootstrapped");
        Ok(BootstrapIds {
            root_room: root_room.id,
            god: god.id,
            start_room: start_room.id,
            player_root: player_root.id,
        })
    }

    /// Delete every object and index key. Refused while any other process
    /// is attached to the coordination channel.
    pub async fn wipe_storage(&self) -> Result<u64, WorldError> {
        let rt = self.runtime()?;
        let peers = rt.storage.subscriber_count(rt.isc.channel()).await?;
        if peers > 1 {
            return Err(WorldError::StorageBusy(peers - 1));
        }
        let deleted = rt.storage.wipe().await?;
        warn!(deleted = deleted, "Storage wiped");
        Ok(deleted)
    }
}

/// Periodic cache reconciliation: evict entries older than the configured
/// max age so a missed invalidation broadcast cannot leave a process stale
/// forever.
async fn run_sweep(cache: Arc<ObjectCache>, config: CacheConfig) {
    if !config.sweep_enabled {
        info!("Cache sweep disabled");
        return;
    }
    info!(
        interval_seconds = config.sweep_interval_seconds,
        max_entry_age_seconds = config.max_entry_age_seconds,
        "Starting cache sweep"
    );
    let max_age = Duration::from_secs(config.max_entry_age_seconds);
    let mut timer = interval(Duration::from_secs(config.sweep_interval_seconds.max(1)));
    loop {
        timer.tick().await;
        let evicted = cache.evict_older_than(max_age);
        if evicted > 0 {
            debug!(evicted = evicted, "Cache sweep evicted stale entries");
        }
    }
}
