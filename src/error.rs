use crate::entities::object::ObjectId;
use crate::entities::owner::OwnerId;
use crate::world::position::Position;

pub type CoreResult<T> = Result<T, CoreError>;

/// Recoverable failures raised by map, action and combat operations.
///
/// None of these abort a tick; the caller decides what the player sees.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoreError {
    #[error("position ({}, {}, {}) is out of bounds", .0.y, .0.x, .0.z)]
    OutOfBounds(Position),

    #[error("target is missing")]
    NilTarget,

    #[error("object {0} is already in the inventory")]
    AlreadyInInventory(ObjectId),

    #[error("object {0} is not in the inventory")]
    MissingInInventory(ObjectId),

    #[error("object {id} needs {needed} volume, only {remaining} left")]
    TooLarge {
        id: ObjectId,
        needed: u64,
        remaining: u64,
    },

    #[error("object {0} cannot be equipped")]
    CannotEquip(ObjectId),

    #[error("object {0} is not equipped")]
    NotEquipped(ObjectId),

    #[error("missing skill \"{0}\"")]
    MissingSkill(String),

    #[error("missing competency \"{0}\"")]
    MissingCompetency(String),

    #[error("objects are not in the same container")]
    ContainerMismatch,

    #[error("target is out of range")]
    OutOfRange,

    #[error("object {0} is not a character")]
    ObjectNotCharacter(ObjectId),

    #[error("movement blocked at ({}, {}, {})", .0.y, .0.x, .0.z)]
    Blocked(Position),

    #[error("object {0} cannot be picked up")]
    NotPortable(ObjectId),

    #[error("unknown archetype \"{0}\"")]
    UnknownArchetype(String),

    #[error("unknown map \"{0}\"")]
    UnknownMap(String),

    #[error("unknown owner {0:?}")]
    UnknownOwner(OwnerId),

    #[error("object ids exhausted")]
    IdsExhausted,

    #[error("template error: {0}")]
    Template(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("{0} lock poisoned")]
    LockPoisoned(&'static str),
}
