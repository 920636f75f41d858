use crate::entities::archetype::Archetype;
use crate::entities::object::ObjectId;
use crate::entities::owner::OwnerId;
use crate::world::position::Position;

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectEvent {
    Birth,
    Death,
    Destroy,
    Fall,
    Fell { distance: u32 },
    Exit { map: String, position: Position },
    Advance { skill: String, level: u32 },
    Attack { target: ObjectId },
    Attacked { attacker: ObjectId },
}

impl ObjectEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ObjectEvent::Birth => "birth",
            ObjectEvent::Death => "death",
            ObjectEvent::Destroy => "destroy",
            ObjectEvent::Fall => "fall",
            ObjectEvent::Fell { .. } => "fell",
            ObjectEvent::Exit { .. } => "exit",
            ObjectEvent::Advance { .. } => "advance",
            ObjectEvent::Attack { .. } => "attack",
            ObjectEvent::Attacked { .. } => "attacked",
        }
    }
}

/// Script callbacks. Every method defaults to a no-op.
///
/// Hooks run on the tick thread after map locks are released and must not
/// block or re-enter the world.
pub trait ScriptHooks: Send + Sync {
    fn resolve_event(&self, _object: ObjectId, _archetype: &Archetype, _event: &ObjectEvent) {}

    fn on_owner_join(&self, _map: &str, _owner: OwnerId) {}

    fn on_owner_leave(&self, _map: &str, _owner: OwnerId) {}

    fn on_sleep(&self, _map: &str) {}

    fn on_wake(&self, _map: &str) {}

    fn on_update(&self, _map: &str) {}

    fn on_cycle(&self, _map: &str, _cycle: u64) {}

    fn on_season(&self, _map: &str, _season: u64) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoScripts;

impl ScriptHooks for NoScripts {}
