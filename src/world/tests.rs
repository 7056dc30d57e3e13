use super::*;
use crate::config::MudConfig;
use crate::id::{EntityId, EntityType};

// Lifecycle guards are checked before any storage round trip, so these
// tests need no backing store. Full end-to-end coverage lives in
// tests/live_world.rs against a real redis.

#[tokio::test]
async fn uninitialized_world_rejects_operations() {
    let world = World::new(MudConfig::default());
    let id = EntityId::generate(EntityType::Item);

    let err = world.imitate(&id).await.unwrap_err();
    assert!(matches!(err, WorldError::WorldNotInitialized));

    let err = world.rename(&id, "rock").await.unwrap_err();
    assert!(matches!(err, WorldError::WorldNotInitialized));

    let err = world.destroy(&id).await.unwrap_err();
    assert!(matches!(err, WorldError::WorldNotInitialized));

    let err = world.create_room("lobby", None, None, None).await.unwrap_err();
    assert!(matches!(err, WorldError::WorldNotInitialized));
}

#[tokio::test]
async fn shutdown_world_rejects_operations() {
    let world = World::new(MudConfig::default());
    world.shutdown().await;

    let id = EntityId::generate(EntityType::Item);
    let err = world.imitate(&id).await.unwrap_err();
    assert!(matches!(err, WorldError::WorldShutdown));

    let err = world.move_entity(&id, None).await.unwrap_err();
    assert!(matches!(err, WorldError::WorldShutdown));
}

#[tokio::test]
async fn shutdown_is_idempotent() {
    let world = World::new(MudConfig::default());
    world.shutdown().await;
    world.shutdown().await;
    world.shutdown().await;
}

#[tokio::test]
async fn observer_channels_work_without_init() {
    let world = World::new(MudConfig::default());
    let mut moves = world.subscribe_moves();
    let mut destroys = world.subscribe_destroys();
    assert!(moves.try_recv().is_err());
    assert!(destroys.try_recv().is_err());
}
