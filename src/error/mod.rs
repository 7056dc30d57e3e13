use std::fmt;

/// Errors surfaced by world, storage and cache operations.
///
/// Validation and lookup failures are returned synchronously to the caller
/// and are expected to be handled per-call. Storage batch failures are not
/// retried automatically; the attempted operation is fatal and may be
/// re-issued by the caller.
#[derive(Debug)]
pub enum WorldError {
    /// Create collision: an object with this id is already registered
    ObjectIdExists(String),
    /// Lookup miss: no metadata record for this id
    ObjectDoesNotExist(String),
    /// Operation against an entity that has been destroyed
    ObjectDestroyed(String),
    /// Name rejected at create/rename time
    InvalidName(String),
    /// Parent pointer rejected by the type-compatibility rules
    InvalidParent(String),
    /// Location pointer rejected by the type-compatibility rules
    InvalidLocation(String),
    /// Malformed or mistyped entity identifier
    InvalidId(String),
    /// Property value rejected (non-homogeneous list, unsupported number)
    InvalidProperty(String),
    /// Player name index collision
    PlayerNameAlreadyExists(String),
    /// World entry point called before `init`
    WorldNotInitialized,
    /// World entry point called after `shutdown`
    WorldShutdown,
    /// Destructive storage operation refused: other processes are attached
    StorageBusy(i64),
    /// Backing store round trip failed
    Storage(redis::RedisError),
    /// JSON encoding/decoding of a stored value failed
    Encoding(serde_json::Error),
}

impl fmt::Display for WorldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorldError::ObjectIdExists(id) => write!(f, "object id '{}' already exists", id),
            WorldError::ObjectDoesNotExist(id) => write!(f, "object '{}' does not exist", id),
            WorldError::ObjectDestroyed(id) => write!(f, "object '{}' has been destroyed", id),
            WorldError::InvalidName(reason) => write!(f, "invalid name: {}", reason),
            WorldError::InvalidParent(reason) => write!(f, "invalid parent: {}", reason),
            WorldError::InvalidLocation(reason) => write!(f, "invalid location: {}", reason),
            WorldError::InvalidId(reason) => write!(f, "invalid id: {}", reason),
            WorldError::InvalidProperty(reason) => write!(f, "invalid property value: {}", reason),
            WorldError::PlayerNameAlreadyExists(name) => {
                write!(f, "player name '{}' is already taken", name)
            }
            WorldError::WorldNotInitialized => write!(f, "world has not been initialized"),
            WorldError::WorldShutdown => write!(f, "world has been shut down"),
            WorldError::StorageBusy(peers) => {
                write!(f, "storage is in use by {} other process(es)", peers)
            }
            WorldError::Storage(e) => write!(f, "storage error: {}", e),
            WorldError::Encoding(e) => write!(f, "encoding error: {}", e),
        }
    }
}

impl std::error::Error for WorldError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WorldError::Storage(e) => Some(e),
            WorldError::Encoding(e) => Some(e),
            _ => None,
        }
    }
}

impl From<redis::RedisError> for WorldError {
    fn from(e: redis::RedisError) -> Self {
        WorldError::Storage(e)
    }
}

impl From<serde_json::Error> for WorldError {
    fn from(e: serde_json::Error) -> Self {
        WorldError::Encoding(e)
    }
}
