use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::entity::Entity;
use crate::error::WorldError;
use crate::id::{EntityId, EntityType};
use crate::isc::{IscEvent, UpdateOp};

#[cfg(test)]
mod tests;

struct CachedObject {
    entity: Entity,
    cached_at: Instant,
}

/// Per-process cache of live entity instances, keyed by extended id.
///
/// Exclusively owned and mutated by this process; other processes affect it
/// only through ISC-delivered invalidation and destroy events. Outbound
/// coherence traffic goes through the `isc_tx` channel, drained by the ISC
/// writer task.
pub struct ObjectCache {
    objects: DashMap<String, CachedObject>,
    isc_tx: mpsc::UnboundedSender<IscEvent>,
}

impl ObjectCache {
    pub fn new(isc_tx: mpsc::UnboundedSender<IscEvent>) -> Self {
        Self {
            objects: DashMap::new(),
            isc_tx,
        }
    }

    /// Cached instance for an id, or `None`. Never triggers a load.
    ///
    /// When `expected` is given, a cached id whose type tag differs is an
    /// error rather than a miss.
    pub fn get_object(
        &self,
        id: &EntityId,
        expected: Option<EntityType>,
    ) -> Result<Option<Entity>, WorldError> {
        if let Some(expected) = expected {
            if id.etype() != expected {
                return Err(WorldError::InvalidId(format!(
                    "'{}' is a {}, expected a {}",
                    id,
                    id.etype(),
                    expected
                )));
            }
        }
        Ok(self.objects.get(&id.extended()).map(|c| c.entity.clone()))
    }

    /// Register a freshly created entity, guarding against id collision.
    ///
    /// The check-and-insert is a single map operation, so of two concurrent
    /// creates for the same id exactly one wins; the loser observes
    /// `ObjectIdExists`. The persistence write happens after registration;
    /// on a failed write the caller rolls back with [`unregister`](Self::unregister).
    pub fn register_created(&self, entity: Entity) -> Result<(), WorldError> {
        match self.objects.entry(entity.id.extended()) {
            Entry::Occupied(_) => Err(WorldError::ObjectIdExists(entity.id.extended())),
            Entry::Vacant(slot) => {
                slot.insert(CachedObject {
                    entity,
                    cached_at: Instant::now(),
                });
                Ok(())
            }
        }
    }

    /// Register an entity materialized from storage. First materialization
    /// wins: if another task registered the id concurrently, the existing
    /// instance is returned and the argument discarded.
    pub fn register_imitated(&self, entity: Entity) -> Entity {
        match self.objects.entry(entity.id.extended()) {
            Entry::Occupied(existing) => existing.get().entity.clone(),
            Entry::Vacant(slot) => {
                let out = entity.clone();
                slot.insert(CachedObject {
                    entity,
                    cached_at: Instant::now(),
                });
                out
            }
        }
    }

    /// Replace the cached instance after a successful local mutation, so
    /// same-process callers observe their own writes immediately.
    pub fn replace(&self, entity: Entity) {
        self.objects.insert(
            entity.id.extended(),
            CachedObject {
                entity,
                cached_at: Instant::now(),
            },
        );
    }

    /// Drop a registration that never reached storage (failed create)
    pub fn unregister(&self, id: &EntityId) {
        self.objects.remove(&id.extended());
    }

    /// Evict this process's cached instance only
    pub fn invalidate_local(&self, id: &EntityId) {
        self.objects.remove(&id.extended());
    }

    /// Evict locally and broadcast the eviction to every other process
    pub fn invalidate(&self, id: &EntityId) {
        self.invalidate_local(id);
        self.send(IscEvent::UpdateObject {
            id: id.extended(),
            op: UpdateOp::Invalidate,
        });
    }

    /// Evict every cached instance of one type. Used to force scripts to
    /// reload after a source update.
    pub fn invalidate_all(&self, etype: EntityType) {
        let prefix = format!("{}:", etype.prefix());
        self.objects.retain(|key, _| !key.starts_with(&prefix));
        debug!(etype = %etype, "Evicted all cached instances of type");
    }

    /// Remove a destroyed entity and broadcast the destruction.
    /// The entity must already carry the destroyed marker.
    pub fn on_destroy(&self, entity: &Entity) {
        debug_assert!(entity.destroyed, "on_destroy called on a live entity");
        self.objects.remove(&entity.id.extended());
        self.send(IscEvent::UpdateObject {
            id: entity.id.extended(),
            op: UpdateOp::Destroyed,
        });
    }

    /// Receiving-side destroy handler: unconditionally drop any cached
    /// instance for the id. Used locally and for remote destroy broadcasts.
    pub fn post_destroy(&self, id: &EntityId) {
        self.objects.remove(&id.extended());
    }

    /// Broadcast a script-cache flush to every other process
    pub fn broadcast_script_invalidation(&self) {
        self.send(IscEvent::InvalidateScript);
    }

    /// Ask other processes to drop their instance of an id without touching
    /// our own (used after a local write already refreshed our copy).
    pub fn broadcast_invalidation(&self, id: &EntityId) {
        self.send(IscEvent::UpdateObject {
            id: id.extended(),
            op: UpdateOp::Invalidate,
        });
    }

    /// Evict entries older than `max_age`; returns the eviction count.
    /// This is the reconciliation sweep bounding staleness when an
    /// invalidation broadcast was missed.
    pub fn evict_older_than(&self, max_age: Duration) -> usize {
        let before = self.objects.len();
        self.objects.retain(|_, c| c.cached_at.elapsed() < max_age);
        before - self.objects.len()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn send(&self, event: IscEvent) {
        if self.isc_tx.send(event).is_err() {
            warn!("ISC channel closed, coherence event dropped");
        }
    }
}
