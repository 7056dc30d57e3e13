use super::*;
use crate::entity::Entity;
use serde_json::json;

fn cache_with_rx() -> (Arc<ObjectCache>, mpsc::UnboundedReceiver<IscEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(ObjectCache::new(tx)), rx)
}

#[test]
fn wire_format_joined() {
    let msg = IscMessage {
        instance: "proc-1".to_string(),
        event: IscEvent::Joined,
    };
    let encoded = serde_json::to_value(&msg).unwrap();
    assert_eq!(encoded, json!({"instance": "proc-1", "kind": "joined"}));
}

#[test]
fn wire_format_update_object() {
    let msg = IscMessage {
        instance: "proc-1".to_string(),
        event: IscEvent::UpdateObject {
            id: "i:abc".to_string(),
            op: UpdateOp::Invalidate,
        },
    };
    let encoded = serde_json::to_value(&msg).unwrap();
    assert_eq!(
        encoded,
        json!({
            "instance": "proc-1",
            "kind": "update_object",
            "id": "i:abc",
            "op": "invalidate"
        })
    );
}

#[test]
fn wire_format_round_trip() {
    for event in [
        IscEvent::Joined,
        IscEvent::InvalidateScript,
        IscEvent::UpdateObject {
            id: "p:xyz".to_string(),
            op: UpdateOp::Destroyed,
        },
    ] {
        let msg = IscMessage {
            instance: "proc-2".to_string(),
            event: event.clone(),
        };
        let decoded: IscMessage =
            serde_json::from_str(&serde_json::to_string(&msg).unwrap()).unwrap();
        assert_eq!(decoded.instance, "proc-2");
        assert_eq!(decoded.event, event);
    }
}

#[test]
fn apply_invalidate_evicts_cached_instance() {
    let (cache, _rx) = cache_with_rx();
    let item = Entity::new(EntityType::Item, "rock", None, None, None);
    let id = item.id.clone();
    cache.register_created(item).unwrap();
    assert_eq!(cache.len(), 1);

    apply(
        &IscMessage {
            instance: "remote".to_string(),
            event: IscEvent::UpdateObject {
                id: id.extended(),
                op: UpdateOp::Invalidate,
            },
        },
        &cache,
    );
    assert!(cache.is_empty());
}

#[test]
fn apply_destroyed_removes_cached_instance() {
    let (cache, _rx) = cache_with_rx();
    let item = Entity::new(EntityType::Item, "rock", None, None, None);
    let id = item.id.clone();
    cache.register_created(item).unwrap();

    apply(
        &IscMessage {
            instance: "remote".to_string(),
            event: IscEvent::UpdateObject {
                id: id.extended(),
                op: UpdateOp::Destroyed,
            },
        },
        &cache,
    );
    assert!(cache.is_empty());
}

#[test]
fn apply_invalidate_script_evicts_scripts_only() {
    let (cache, _rx) = cache_with_rx();
    let script = Entity::new(EntityType::Script, "greeter", None, None, None);
    let item = Entity::new(EntityType::Item, "rock", None, None, None);
    let item_id = item.id.clone();
    cache.register_created(script).unwrap();
    cache.register_created(item).unwrap();

    apply(
        &IscMessage {
            instance: "remote".to_string(),
            event: IscEvent::InvalidateScript,
        },
        &cache,
    );

    assert_eq!(cache.len(), 1);
    assert!(cache.get_object(&item_id, None).unwrap().is_some());
}

#[test]
fn apply_tolerates_malformed_ids() {
    let (cache, _rx) = cache_with_rx();
    apply(
        &IscMessage {
            instance: "remote".to_string(),
            event: IscEvent::UpdateObject {
                id: "_:nope".to_string(),
                op: UpdateOp::Invalidate,
            },
        },
        &cache,
    );
    assert!(cache.is_empty());
}
