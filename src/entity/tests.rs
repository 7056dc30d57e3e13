use super::*;
use crate::id::{EntityId, EntityType};

fn sample_room() -> Entity {
    Entity::new(EntityType::Room, "lobby", None, None, None)
}

#[test]
fn meta_round_trip_with_pointers() {
    let room = sample_room();
    let mut player = Entity::new(
        EntityType::Player,
        "alice",
        Some(room.id.clone()),
        Some(room.id.clone()),
        Some(room.id.clone()),
    );
    player.target = None;

    let meta: std::collections::HashMap<String, String> = player
        .meta_fields()
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

    let loaded = Entity::from_meta(player.id.clone(), &meta).unwrap();
    assert_eq!(loaded.name, "alice");
    assert_eq!(loaded.creator, Some(room.id.clone()));
    assert_eq!(loaded.parent, Some(room.id.clone()));
    assert_eq!(loaded.location, Some(room.id));
    assert!(!loaded.destroyed);
}

#[test]
fn meta_omits_absent_pointers() {
    let room = sample_room();
    let fields = room.meta_fields();
    let keys: Vec<&str> = fields.iter().map(|(k, _)| *k).collect();
    assert!(keys.contains(&"name"));
    assert!(!keys.contains(&"parent"));
    assert!(!keys.contains(&"location"));
    assert!(!keys.contains(&"target"));
}

#[test]
fn from_meta_without_name_fails() {
    let meta = std::collections::HashMap::new();
    let id = EntityId::generate(EntityType::Item);
    assert!(Entity::from_meta(id, &meta).is_err());
}

#[test]
fn parent_table_matches_rules() {
    use EntityType::*;
    // Rooms and players parent to rooms only
    assert!(parent_allowed(Room, Room));
    assert!(!parent_allowed(Room, Player));
    assert!(parent_allowed(Player, Room));
    assert!(!parent_allowed(Player, Item));
    // Items parent to rooms, players, items
    assert!(parent_allowed(Item, Room));
    assert!(parent_allowed(Item, Player));
    assert!(parent_allowed(Item, Item));
    assert!(!parent_allowed(Item, Script));
    // Scripts and actions parent to players only
    assert!(parent_allowed(Script, Player));
    assert!(!parent_allowed(Script, Room));
    assert!(parent_allowed(Action, Player));
    assert!(!parent_allowed(Action, Action));
}

#[test]
fn location_table_matches_rules() {
    use EntityType::*;
    assert!(location_allowed(Room, Room));
    assert!(!location_allowed(Room, Item));
    assert!(location_allowed(Player, Room));
    assert!(location_allowed(Player, Item));
    assert!(!location_allowed(Player, Player));
    assert!(location_allowed(Item, Player));
    assert!(location_allowed(Script, Item));
    assert!(!location_allowed(Script, Script));
    assert!(location_allowed(Action, Script));
    assert!(!location_allowed(Action, Action));
}

#[test]
fn action_target_rules() {
    assert!(target_allowed(EntityType::Room));
    assert!(target_allowed(EntityType::Script));
    assert!(!target_allowed(EntityType::Player));
    assert!(!target_allowed(EntityType::Item));
}

#[test]
fn empty_names_rejected() {
    assert!(validate_name(EntityType::Room, "").is_err());
    assert!(validate_name(EntityType::Room, "   ").is_err());
    assert!(validate_name(EntityType::Room, "lobby").is_ok());
}

#[test]
fn action_name_rejects_command_prefix() {
    assert!(validate_name(EntityType::Action, "look").is_ok());
    assert!(validate_name(EntityType::Action, "@look").is_err());
    assert!(validate_name(EntityType::Action, "go;@walk").is_err());
    // Other types may use the character freely
    assert!(validate_name(EntityType::Item, "@sign").is_ok());
}

#[test]
fn name_matching_is_case_insensitive_exact() {
    assert!(name_matches("Rusty Sword", "rusty sword"));
    assert!(!name_matches("Rusty Sword", "rusty"));
    assert!(!name_matches("Rusty Sword", "sword"));
}

#[test]
fn name_matching_covers_alias_tokens() {
    assert!(name_matches("go north;north;n", "N"));
    assert!(name_matches("go north;north;n", "NORTH"));
    assert!(name_matches("go north; north ;n", "north"));
    assert!(!name_matches("go north;north;n", "south"));
}
