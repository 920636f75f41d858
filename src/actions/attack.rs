use crate::actions::{ActionContext, ActionOutcome, AttackTarget};
use crate::combat::damage::{
    armor_value, resolve_hit, weapon_damage, AttackCategory, CombatProfile,
};
use crate::entities::object::{Object, ObjectId};
use crate::error::{CoreError, CoreResult};
use crate::scripting::events::ObjectEvent;
use crate::world::area::{line_positions, Footprint};
use crate::world::map::Map;
use crate::world::position::Position;

/// Experience granted to each weapon skill per landed attack.
pub const SKILL_GAIN_PER_HIT: f64 = 0.1;

pub(crate) fn attack(ctx: &mut ActionContext<'_>, target: AttackTarget) -> CoreResult<ActionOutcome> {
    let actor = ctx.actor()?;
    let attacker = actor
        .character()
        .ok_or(CoreError::ObjectNotCharacter(ctx.actor))?;
    let actor_footprint = actor.footprint().ok_or(CoreError::ContainerMismatch)?;
    let attacker_name = actor.name().to_string();

    let weapon: Option<CombatProfile> = attacker
        .equipment
        .equipped()
        .iter()
        .find_map(|id| ctx.map.object(*id).and_then(|item| item.archetype().damage.clone()));
    let reach = weapon.as_ref().map_or(1, |profile| profile.reach.max(1));

    let target_id = find_target(ctx.map, ctx.actor, &actor_footprint, target, reach)?;
    let victim = ctx.map.object(target_id).ok_or(CoreError::NilTarget)?;
    let victim_footprint = victim.footprint().ok_or(CoreError::ContainerMismatch)?;
    if actor_footprint.distance(&victim_footprint) > reach {
        return Err(CoreError::OutOfRange);
    }
    let defender = victim
        .character()
        .ok_or(CoreError::ObjectNotCharacter(target_id))?;
    let victim_name = victim.name().to_string();

    let (damage, category) = match &weapon {
        Some(profile) => (
            weapon_damage(&attacker.skills, &attacker.attributes, profile)?,
            profile.category,
        ),
        None => (actor.archetype().unarmed.clone(), AttackCategory::Physical),
    };
    let worn: Vec<CombatProfile> = defender
        .equipment
        .equipped()
        .iter()
        .filter_map(|id| ctx.map.object(*id).and_then(|item| item.archetype().armor.clone()))
        .collect();
    let pieces: Vec<&CombatProfile> = worn.iter().collect();
    let armor = armor_value(&defender.skills, &defender.attributes, &pieces, category)?;
    let amount = resolve_hit(&damage, &armor);

    let (dealt, killed) = match ctx.map.object_mut(target_id).and_then(Object::character_mut) {
        Some(defender) => {
            let dealt = defender.apply_damage(amount);
            (dealt, !defender.is_alive())
        }
        None => (0, false),
    };
    ctx.map.emit(ctx.actor, ObjectEvent::Attack { target: target_id });
    ctx.map.emit(
        target_id,
        ObjectEvent::Attacked {
            attacker: ctx.actor,
        },
    );

    let trained = weapon.map(|profile| profile.skills).unwrap_or_default();
    let advances: Vec<(String, u32)> = match ctx
        .map
        .object_mut(ctx.actor)
        .and_then(Object::character_mut)
    {
        Some(character) => trained
            .iter()
            .filter_map(|skill| {
                character
                    .skills
                    .gain(skill, SKILL_GAIN_PER_HIT)
                    .map(|advance| (skill.clone(), advance.level))
            })
            .collect(),
        None => Vec::new(),
    };
    for (skill, level) in advances {
        ctx.tell(format!("Your {} skill advanced to {}.", skill, level));
        ctx.map
            .emit(ctx.actor, ObjectEvent::Advance { skill, level });
    }

    ctx.tell(format!("You hit {} for {}.", victim_name, dealt));
    ctx.map.message_object_owner(
        target_id,
        format!("{} hits you for {}.", attacker_name, dealt),
    );
    if killed {
        ctx.map.emit(target_id, ObjectEvent::Death);
        ctx.map.remove_object(target_id)?;
        ctx.tell(format!("You killed {}.", victim_name));
    }
    Ok(ActionOutcome::Hit {
        target: target_id,
        damage: dealt,
        killed,
    })
}

fn find_target(
    map: &Map,
    actor: ObjectId,
    footprint: &Footprint,
    target: AttackTarget,
    reach: u32,
) -> CoreResult<ObjectId> {
    let first_character = |position: Position| {
        map.objects_at(position)
            .find(|object| object.id() != actor && object.character().is_some())
            .map(Object::id)
    };
    match target {
        AttackTarget::Object(id) => {
            if id == actor {
                return Err(CoreError::NilTarget);
            }
            let object = map.object(id).ok_or(CoreError::NilTarget)?;
            if object.tile().is_none() {
                return Err(CoreError::ContainerMismatch);
            }
            Ok(id)
        }
        AttackTarget::Position(position) => {
            if !map.contains(position) {
                return Err(CoreError::OutOfBounds(position));
            }
            first_character(position).ok_or(CoreError::NilTarget)
        }
        AttackTarget::Direction(direction) => {
            let origin = footprint.anchor().ok_or(CoreError::NilTarget)?;
            line_positions(origin, direction, reach)
                .into_iter()
                .take_while(|position| map.contains(*position))
                .find_map(first_character)
                .ok_or(CoreError::NilTarget)
        }
    }
}
