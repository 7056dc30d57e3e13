use super::*;

#[test]
fn prefix_round_trip() {
    for etype in [
        EntityType::Room,
        EntityType::Player,
        EntityType::Item,
        EntityType::Script,
        EntityType::Action,
    ] {
        assert_eq!(EntityType::from_prefix(etype.prefix()), Some(etype));
    }
}

#[test]
fn unknown_prefix_is_none() {
    assert_eq!(EntityType::from_prefix("_"), None);
    assert_eq!(EntityType::from_prefix("x"), None);
    assert_eq!(EntityType::from_prefix(""), None);
}

#[test]
fn split_with_type_tag() {
    let (etype, short) = split_extended_id("r:abc123").unwrap();
    assert_eq!(etype, Some(EntityType::Room));
    assert_eq!(short, "abc123");
}

#[test]
fn split_bare_shortid() {
    // No colon: the whole string is a shortid, type comes from context
    let (etype, short) = split_extended_id("asdf").unwrap();
    assert_eq!(etype, None);
    assert_eq!(short, "asdf");
}

#[test]
fn split_tag_without_id_fails() {
    assert!(split_extended_id("r:").is_err());
}

#[test]
fn split_unknown_tag_fails() {
    assert!(split_extended_id("_:asdf").is_err());
}

#[test]
fn split_empty_fails() {
    assert!(split_extended_id("").is_err());
}

#[test]
fn parse_requires_type_tag() {
    assert!(EntityId::parse("p:xyz").is_ok());
    assert!(EntityId::parse("xyz").is_err());
}

#[test]
fn parse_in_context_accepts_bare_and_matching() {
    let id = EntityId::parse_in_context("xyz", EntityType::Item).unwrap();
    assert_eq!(id.etype(), EntityType::Item);
    assert_eq!(id.short(), "xyz");

    let id = EntityId::parse_in_context("i:xyz", EntityType::Item).unwrap();
    assert_eq!(id.extended(), "i:xyz");
}

#[test]
fn parse_in_context_rejects_mismatched_tag() {
    assert!(EntityId::parse_in_context("r:xyz", EntityType::Item).is_err());
}

#[test]
fn generated_ids_are_unique_and_extended_form_parses() {
    let a = EntityId::generate(EntityType::Room);
    let b = EntityId::generate(EntityType::Room);
    assert_ne!(a, b);

    let reparsed = EntityId::parse(&a.extended()).unwrap();
    assert_eq!(reparsed, a);
}
