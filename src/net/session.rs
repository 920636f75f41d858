use crate::entities::owner::OwnerId;
use crate::status::StatusKind;

/// Network-side collaborator a player owner relays to.
///
/// Implementations must not call back into the world; the world invokes
/// these only after releasing its map locks.
pub trait Session: Send + Sync {
    fn send_message(&self, message: &str);
    fn send_status(&self, status: StatusKind, active: bool);
    fn set_owner(&self, owner: Option<OwnerId>);
    fn owner(&self) -> Option<OwnerId>;
}
