use crate::actions::{ActionContext, ActionOutcome, DEFAULT_MOVE_COST};
use crate::entities::character::Stance;
use crate::entities::matter::Matter;
use crate::entities::object::{Object, ObjectId};
use crate::error::{CoreError, CoreResult};
use crate::scripting::events::ObjectEvent;
use crate::status::{Status, StatusKind};
use crate::world::map::{Map, Support};
use crate::world::position::Direction;
use std::time::Duration;

pub fn move_cost(actor: &Object) -> Duration {
    let base = actor
        .archetype()
        .move_cost_ms
        .map_or(DEFAULT_MOVE_COST, Duration::from_millis);
    let squeezed = actor
        .character()
        .is_some_and(|character| character.stance == Stance::Squeezed);
    if squeezed {
        base * 4
    } else if actor.has_status(StatusKind::Crouching) {
        base * 2
    } else if actor.has_status(StatusKind::Running) {
        base / 2
    } else {
        base
    }
}

pub(crate) fn step(ctx: &mut ActionContext<'_>, direction: Direction) -> CoreResult<ActionOutcome> {
    let actor = ctx.actor()?;
    let footprint = actor.footprint().ok_or(CoreError::NilTarget)?;
    let matter = actor.matter();
    let wizard = actor.has_status(StatusKind::Wizard);

    let target = footprint.shifted(direction.delta());
    ctx.map.fits(&target)?;
    if !wizard {
        if let Some(cell) = ctx.map.footprint_blocked(&target, matter, Some(ctx.actor)) {
            return Err(CoreError::Blocked(cell));
        }
    }
    ctx.map.move_object(ctx.actor, direction.delta())?;
    let to = ctx
        .map
        .object(ctx.actor)
        .and_then(Object::tile)
        .ok_or(CoreError::NilTarget)?;
    settle(ctx.map, ctx.actor);
    Ok(ActionOutcome::Moved { to })
}

/// Applies what the new position implies: swimming, falling, exits.
pub(crate) fn settle(map: &mut Map, id: ObjectId) {
    apply_support(map, id);
    follow_exit(map, id);
}

/// Starts swimming in liquid, or falling when nothing below holds the object.
pub(crate) fn apply_support(map: &mut Map, id: ObjectId) {
    let Some(object) = map.object(id) else {
        return;
    };
    let airborne = object
        .statuses()
        .iter()
        .any(|status| status.kind().is_airborne());

    if map.footprint_has_matter(id, Matter::LIQUID) {
        map.attach_status(id, Status::Swimming);
    } else if !airborne && map.support_below(id) == Support::Open {
        if map.attach_status(id, Status::falling()) {
            map.emit(id, ObjectEvent::Fall);
        }
    }
}

fn follow_exit(map: &mut Map, id: ObjectId) {
    let exit = map
        .object(id)
        .and_then(Object::footprint)
        .and_then(|footprint| {
            footprint.cells().flatten().find_map(|cell| {
                map.objects_at(cell)
                    .filter(|other| other.id() != id)
                    .find_map(|other| other.exit_target().cloned())
            })
        });
    if let Some(target) = exit {
        map.emit(
            id,
            ObjectEvent::Exit {
                map: target.map.clone(),
                position: target.position,
            },
        );
        map.queue_transfer(id, target);
    }
}
