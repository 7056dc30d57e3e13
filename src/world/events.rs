use crate::id::EntityId;

/// Whether a pointer change was a containment move or a lineage reparent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    Move,
    Reparent,
}

/// Broadcast to local observers when an entity's pointer changes.
///
/// Carries both the old and new owner so dependent subsystems (a live
/// session's subscription list, containment views) can re-home themselves.
#[derive(Debug, Clone)]
pub struct MoveEvent {
    pub id: EntityId,
    pub kind: MoveKind,
    pub old: Option<EntityId>,
    pub new: Option<EntityId>,
}

/// Broadcast to local observers when an entity is destroyed through this
/// process.
#[derive(Debug, Clone)]
pub struct DestroyEvent {
    pub id: EntityId,
}
