pub mod attack;
pub mod items;
pub mod movement;
pub mod spawn;

use crate::entities::character::Stance;
use crate::entities::object::{Object, ObjectId};
use crate::entities::owner::OwnerId;
use crate::error::CoreResult;
use crate::status::StatusKind;
use crate::world::idmap::IdMap;
use crate::world::map::Map;
use crate::world::position::{Direction, Position};
use crate::world::template::TemplateSource;
use rand::rngs::StdRng;
use std::time::Duration;

pub use spawn::{SpawnReport, SpawnRequest};

pub const DEFAULT_MOVE_COST: Duration = Duration::from_millis(400);
pub const DEFAULT_ATTACK_COST: Duration = Duration::from_millis(1_000);
pub const ITEM_HANDLING_COST: Duration = Duration::from_millis(500);
pub const INSPECT_COST: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackTarget {
    Object(ObjectId),
    Position(Position),
    Direction(Direction),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionKind {
    Move(Direction),
    Attack(AttackTarget),
    Grab(ObjectId),
    Drop {
        object: ObjectId,
        position: Option<Position>,
    },
    Equip(ObjectId),
    Unequip(ObjectId),
    Inspect(ObjectId),
    Spawn(SpawnRequest),
    StatusChange {
        kind: StatusKind,
        active: bool,
    },
}

impl ActionKind {
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::Move(_) => "move",
            ActionKind::Attack(_) => "attack",
            ActionKind::Grab(_) => "grab",
            ActionKind::Drop { .. } => "drop",
            ActionKind::Equip(_) => "equip",
            ActionKind::Unequip(_) => "unequip",
            ActionKind::Inspect(_) => "inspect",
            ActionKind::Spawn(_) => "spawn",
            ActionKind::StatusChange { .. } => "status",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionPhase {
    Channeling,
    Ready,
}

/// A time-gated operation: `windup` must elapse before it resolves, then
/// `recovery` blocks the owner's next action.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    kind: ActionKind,
    windup: Duration,
    recovery: Duration,
    elapsed: Duration,
}

impl Action {
    pub fn new(kind: ActionKind, cost: Duration) -> Self {
        let windup = cost / 4;
        Self {
            kind,
            windup,
            recovery: cost - windup,
            elapsed: Duration::ZERO,
        }
    }

    /// Builds an action with its cost derived from the acting object.
    pub fn for_actor(kind: ActionKind, actor: &Object) -> Self {
        let cost = cost_of(&kind, actor);
        Self::new(kind, cost)
    }

    pub fn kind(&self) -> &ActionKind {
        &self.kind
    }

    pub fn windup(&self) -> Duration {
        self.windup
    }

    pub fn recovery(&self) -> Duration {
        self.recovery
    }

    pub fn phase(&self) -> ActionPhase {
        if self.elapsed >= self.windup {
            ActionPhase::Ready
        } else {
            ActionPhase::Channeling
        }
    }

    pub fn is_ready(&self) -> bool {
        self.phase() == ActionPhase::Ready
    }

    pub fn advance(&mut self, delta: Duration) -> bool {
        self.elapsed = self.elapsed.saturating_add(delta).min(self.windup);
        self.is_ready()
    }

    /// Object the action is aimed at, if any.
    pub fn subject(&self) -> Option<ObjectId> {
        match &self.kind {
            ActionKind::Attack(AttackTarget::Object(id))
            | ActionKind::Grab(id)
            | ActionKind::Drop { object: id, .. }
            | ActionKind::Equip(id)
            | ActionKind::Unequip(id)
            | ActionKind::Inspect(id) => Some(*id),
            _ => None,
        }
    }
}

pub fn cost_of(kind: &ActionKind, actor: &Object) -> Duration {
    match kind {
        ActionKind::Move(_) => movement::move_cost(actor),
        ActionKind::Attack(_) => actor
            .archetype()
            .attack_cost_ms
            .map_or(DEFAULT_ATTACK_COST, Duration::from_millis),
        ActionKind::Grab(_)
        | ActionKind::Drop { .. }
        | ActionKind::Equip(_)
        | ActionKind::Unequip(_) => ITEM_HANDLING_COST,
        ActionKind::Inspect(_) => INSPECT_COST,
        ActionKind::Spawn(_) | ActionKind::StatusChange { .. } => Duration::ZERO,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Moved { to: Position },
    Hit {
        target: ObjectId,
        damage: u32,
        killed: bool,
    },
    Grabbed(ObjectId),
    Dropped { object: ObjectId, at: Position },
    Equipped(ObjectId),
    Unequipped(ObjectId),
    Inspected(String),
    Spawned(SpawnReport),
    StatusChanged { kind: StatusKind, changed: bool },
}

/// Everything a handler may touch while the owner's map is locked.
pub struct ActionContext<'a> {
    pub map: &'a mut Map,
    pub owner: OwnerId,
    pub actor: ObjectId,
    pub templates: &'a dyn TemplateSource,
    pub ids: &'a mut IdMap,
    pub rng: &'a mut StdRng,
}

impl ActionContext<'_> {
    fn actor(&self) -> CoreResult<&Object> {
        self.map
            .object(self.actor)
            .ok_or(crate::error::CoreError::NilTarget)
    }

    fn tell(&mut self, message: String) {
        self.map.message_owner(self.owner, message);
    }
}

pub fn resolve(action: &Action, ctx: &mut ActionContext<'_>) -> CoreResult<ActionOutcome> {
    match action.kind() {
        ActionKind::Move(direction) => movement::step(ctx, *direction),
        ActionKind::Attack(target) => attack::attack(ctx, *target),
        ActionKind::Grab(object) => items::grab(ctx, *object),
        ActionKind::Drop { object, position } => items::drop(ctx, *object, *position),
        ActionKind::Equip(object) => items::equip(ctx, *object),
        ActionKind::Unequip(object) => items::unequip(ctx, *object),
        ActionKind::Inspect(object) => items::inspect(ctx, *object),
        ActionKind::Spawn(request) => spawn::spawn_from_templates(ctx, request),
        ActionKind::StatusChange { kind, active } => change_status(ctx, *kind, *active),
    }
}

fn change_status(
    ctx: &mut ActionContext<'_>,
    kind: StatusKind,
    active: bool,
) -> CoreResult<ActionOutcome> {
    ctx.actor()?;
    if !kind.is_voluntary() {
        return Ok(ActionOutcome::StatusChanged {
            kind,
            changed: false,
        });
    }
    let changed = if active {
        ctx.map.attach_status(ctx.actor, crate::status::Status::from_kind(kind))
    } else {
        ctx.map.detach_status(ctx.actor, kind)
    };
    if changed && kind == StatusKind::Crouching {
        if let Some(character) = ctx
            .map
            .object_mut(ctx.actor)
            .and_then(Object::character_mut)
        {
            if character.stance != Stance::Squeezed {
                character.stance = if active {
                    Stance::Crouching
                } else {
                    Stance::Standing
                };
            }
        }
    }
    Ok(ActionOutcome::StatusChanged { kind, changed })
}
