use super::*;
use crate::isc::{IscEvent, UpdateOp};
use std::time::Duration;

fn cache_with_rx() -> (ObjectCache, mpsc::UnboundedReceiver<IscEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ObjectCache::new(tx), rx)
}

fn item(name: &str) -> Entity {
    Entity::new(EntityType::Item, name, None, None, None)
}

#[test]
fn get_object_never_loads() {
    let (cache, _rx) = cache_with_rx();
    let id = EntityId::generate(EntityType::Item);
    assert!(cache.get_object(&id, None).unwrap().is_none());
}

#[test]
fn get_object_type_mismatch_is_error() {
    let (cache, _rx) = cache_with_rx();
    let id = EntityId::generate(EntityType::Item);
    assert!(cache.get_object(&id, Some(EntityType::Room)).is_err());
    assert!(cache.get_object(&id, Some(EntityType::Item)).is_ok());
}

#[test]
fn register_created_guards_collisions() {
    let (cache, _rx) = cache_with_rx();
    let first = item("rock");
    let mut second = item("pebble");
    second.id = first.id.clone();

    cache.register_created(first).unwrap();
    let err = cache.register_created(second).unwrap_err();
    assert!(matches!(err, WorldError::ObjectIdExists(_)));
}

#[test]
fn register_imitated_first_materialization_wins() {
    let (cache, _rx) = cache_with_rx();
    let first = item("rock");
    let mut second = item("imposter");
    second.id = first.id.clone();

    cache.register_imitated(first.clone());
    let winner = cache.register_imitated(second);
    assert_eq!(winner.name, "rock");
    assert_eq!(
        cache.get_object(&first.id, None).unwrap().unwrap().name,
        "rock"
    );
}

#[test]
fn replace_updates_cached_instance() {
    let (cache, _rx) = cache_with_rx();
    let mut ent = item("rock");
    let id = ent.id.clone();
    cache.register_created(ent.clone()).unwrap();

    ent.name = "boulder".to_string();
    cache.replace(ent);
    assert_eq!(
        cache.get_object(&id, None).unwrap().unwrap().name,
        "boulder"
    );
}

#[test]
fn invalidate_local_does_not_broadcast() {
    let (cache, mut rx) = cache_with_rx();
    let ent = item("rock");
    let id = ent.id.clone();
    cache.register_created(ent).unwrap();
    rx.try_recv().ok(); // drain nothing; register does not broadcast

    cache.invalidate_local(&id);
    assert!(cache.is_empty());
    assert!(rx.try_recv().is_err());
}

#[test]
fn invalidate_evicts_and_broadcasts() {
    let (cache, mut rx) = cache_with_rx();
    let ent = item("rock");
    let id = ent.id.clone();
    cache.register_created(ent).unwrap();

    cache.invalidate(&id);
    assert!(cache.is_empty());
    assert_eq!(
        rx.try_recv().unwrap(),
        IscEvent::UpdateObject {
            id: id.extended(),
            op: UpdateOp::Invalidate,
        }
    );
}

#[test]
fn on_destroy_removes_and_broadcasts_destroyed() {
    let (cache, mut rx) = cache_with_rx();
    let mut ent = item("rock");
    let id = ent.id.clone();
    cache.register_created(ent.clone()).unwrap();

    ent.destroyed = true;
    cache.on_destroy(&ent);
    assert!(cache.is_empty());
    assert_eq!(
        rx.try_recv().unwrap(),
        IscEvent::UpdateObject {
            id: id.extended(),
            op: UpdateOp::Destroyed,
        }
    );
}

#[test]
fn post_destroy_is_unconditional_and_silent() {
    let (cache, mut rx) = cache_with_rx();
    let ent = item("rock");
    let id = ent.id.clone();
    cache.register_created(ent).unwrap();

    cache.post_destroy(&id);
    assert!(cache.is_empty());
    assert!(rx.try_recv().is_err());

    // Absent id: still fine
    cache.post_destroy(&id);
}

#[test]
fn invalidate_all_is_type_scoped() {
    let (cache, _rx) = cache_with_rx();
    let script = Entity::new(EntityType::Script, "greeter", None, None, None);
    let rock = item("rock");
    let rock_id = rock.id.clone();
    cache.register_created(script).unwrap();
    cache.register_created(rock).unwrap();

    cache.invalidate_all(EntityType::Script);
    assert_eq!(cache.len(), 1);
    assert!(cache.get_object(&rock_id, None).unwrap().is_some());
}

#[test]
fn sweep_evicts_only_stale_entries() {
    let (cache, _rx) = cache_with_rx();
    cache.register_created(item("rock")).unwrap();

    // Entries were cached just now: a generous max age keeps them
    assert_eq!(cache.evict_older_than(Duration::from_secs(60)), 0);
    assert_eq!(cache.len(), 1);

    // Zero max age evicts everything
    assert_eq!(cache.evict_older_than(Duration::ZERO), 1);
    assert!(cache.is_empty());
}
