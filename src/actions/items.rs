use crate::actions::{ActionContext, ActionOutcome};
use crate::entities::object::{Object, ObjectId};
use crate::error::{CoreError, CoreResult};
use crate::world::area::Footprint;
use crate::world::position::Position;

/// Reach for handling loose objects.
pub const HANDLING_REACH: u32 = 1;

/// Facts about a loose object that must be checked before touching anything.
struct Loose {
    volume: u64,
    portable: bool,
    placed: bool,
    in_reach: bool,
}

fn inspect_loose(ctx: &ActionContext<'_>, object: ObjectId) -> CoreResult<Loose> {
    let actor = ctx.actor()?;
    let item = ctx.map.object(object).ok_or(CoreError::NilTarget)?;
    let in_reach = match (actor.footprint(), item.footprint()) {
        (Some(from), Some(to)) => from.distance(&to) <= HANDLING_REACH,
        _ => false,
    };
    Ok(Loose {
        volume: item.volume(),
        portable: item.archetype().is_portable(),
        placed: item.tile().is_some(),
        in_reach,
    })
}

fn carries(ctx: &ActionContext<'_>, object: ObjectId) -> bool {
    ctx.actor()
        .ok()
        .and_then(Object::inventory)
        .is_some_and(|container| container.contains(object))
}

pub(crate) fn grab(ctx: &mut ActionContext<'_>, object: ObjectId) -> CoreResult<ActionOutcome> {
    if object == ctx.actor {
        return Err(CoreError::NotPortable(object));
    }
    let loose = inspect_loose(ctx, object)?;
    if !loose.placed {
        return Err(CoreError::ContainerMismatch);
    }
    if !loose.in_reach {
        return Err(CoreError::OutOfRange);
    }
    if !loose.portable {
        return Err(CoreError::NotPortable(object));
    }
    let actor = ctx.actor;
    let container = ctx
        .map
        .object_mut(actor)
        .and_then(Object::inventory_mut)
        .ok_or(CoreError::TooLarge {
            id: object,
            needed: loose.volume,
            remaining: 0,
        })?;
    container.add(object, loose.volume)?;
    ctx.map.unplace_object(object)?;
    if let Some(item) = ctx.map.object_mut(object) {
        item.set_parent(Some(actor));
    }
    Ok(ActionOutcome::Grabbed(object))
}

pub(crate) fn drop(
    ctx: &mut ActionContext<'_>,
    object: ObjectId,
    position: Option<Position>,
) -> CoreResult<ActionOutcome> {
    if !carries(ctx, object) {
        return Err(CoreError::MissingInInventory(object));
    }
    let actor = ctx.actor()?;
    let item = ctx.map.object(object).ok_or(CoreError::NilTarget)?;
    let volume = item.volume();
    let at = match position {
        Some(position) => {
            let target = Footprint::new(position, item.dimensions());
            ctx.map.fits(&target)?;
            let from = actor.footprint().ok_or(CoreError::NilTarget)?;
            if from.distance(&target) > HANDLING_REACH {
                return Err(CoreError::OutOfRange);
            }
            let matter = item.matter();
            let blocked = target.cells().flatten().find(|cell| {
                ctx.map.objects_at(*cell).any(|other| {
                    other.id() != ctx.actor
                        && other.id() != object
                        && other.blocking().intersects(matter)
                })
            });
            if let Some(cell) = blocked {
                return Err(CoreError::Blocked(cell));
            }
            position
        }
        None => actor.tile().ok_or(CoreError::NilTarget)?,
    };

    ctx.map.place_object(object, at)?;
    let actor = ctx.actor;
    if let Some(container) = ctx.map.object_mut(actor).and_then(Object::inventory_mut) {
        container.remove(object, volume)?;
    }
    Ok(ActionOutcome::Dropped { object, at })
}

pub(crate) fn equip(ctx: &mut ActionContext<'_>, object: ObjectId) -> CoreResult<ActionOutcome> {
    let from_inventory = carries(ctx, object);
    let loose = inspect_loose(ctx, object)?;
    if !from_inventory {
        if !loose.placed {
            return Err(CoreError::MissingInInventory(object));
        }
        if !loose.in_reach {
            return Err(CoreError::OutOfRange);
        }
        if !loose.portable {
            return Err(CoreError::NotPortable(object));
        }
    }
    let item = ctx.map.object(object).ok_or(CoreError::NilTarget)?;
    if !item.object_type().is_equipable() {
        return Err(CoreError::CannotEquip(object));
    }
    let requirements = item.archetype().requirements.clone();

    let actor = ctx.actor;
    let character = ctx
        .map
        .object_mut(actor)
        .and_then(Object::character_mut)
        .ok_or(CoreError::ObjectNotCharacter(actor))?;
    character.equipment.equip(object, &requirements)?;

    if from_inventory {
        if let Some(container) = ctx.map.object_mut(actor).and_then(Object::inventory_mut) {
            container.remove(object, loose.volume)?;
        }
    } else {
        ctx.map.unplace_object(object)?;
    }
    if let Some(item) = ctx.map.object_mut(object) {
        item.set_parent(Some(actor));
    }
    Ok(ActionOutcome::Equipped(object))
}

pub(crate) fn unequip(ctx: &mut ActionContext<'_>, object: ObjectId) -> CoreResult<ActionOutcome> {
    let actor_object = ctx.actor()?;
    let actor = ctx.actor;
    let character = actor_object
        .character()
        .ok_or(CoreError::ObjectNotCharacter(actor))?;
    if !character.equipment.is_equipped(object) {
        return Err(CoreError::NotEquipped(object));
    }
    let item = ctx.map.object(object).ok_or(CoreError::NilTarget)?;
    let volume = item.volume();
    let requirements = item.archetype().requirements.clone();
    match actor_object.inventory() {
        Some(container) => container.can_add(object, volume)?,
        None => {
            return Err(CoreError::TooLarge {
                id: object,
                needed: volume,
                remaining: 0,
            })
        }
    }

    let Some(wearer) = ctx.map.object_mut(actor) else {
        return Err(CoreError::NilTarget);
    };
    if let Some(character) = wearer.character_mut() {
        character.equipment.unequip(object, &requirements)?;
    }
    if let Some(container) = wearer.inventory_mut() {
        container.add(object, volume)?;
    }
    Ok(ActionOutcome::Unequipped(object))
}

pub(crate) fn inspect(ctx: &mut ActionContext<'_>, object: ObjectId) -> CoreResult<ActionOutcome> {
    let item = ctx.map.object(object).ok_or(CoreError::NilTarget)?;
    let archetype = item.archetype();
    let mut text = if archetype.description.is_empty() {
        format!("You see {}.", archetype.name)
    } else {
        archetype.description.clone()
    };
    if let Some(character) = item.character() {
        text.push_str(&format!(
            " Health {}/{}.",
            character.health, character.max_health
        ));
    }
    ctx.tell(text.clone());
    Ok(ActionOutcome::Inspected(text))
}
