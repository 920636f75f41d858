use crate::entities::archetype::{Archetype, ExitTarget, ObjectType};
use crate::entities::character::Character;
use crate::entities::inventory::Container;
use crate::entities::matter::Matter;
use crate::entities::owner::OwnerId;
use crate::status::{Status, StatusKind};
use crate::world::area::{Dimensions, Footprint};
use crate::world::position::Position;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

impl ObjectId {
    pub fn is_assigned(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EquipKind {
    Weapon,
    Shield,
    Armor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Food {
    pub nutrition: u32,
    pub fresh_for: Option<Duration>,
    pub spoiled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Audio {
    pub loop_length: Duration,
    pub position: Duration,
    pub loops: u32,
}

/// Variant payload layered on top of the shared object record.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKind {
    Character(Box<Character>),
    Block,
    Item,
    Equipable(EquipKind),
    Exit(ExitTarget),
    Food(Food),
    Flora,
    Audio(Audio),
    Skill(Option<String>),
    Generic,
    Special,
}

impl ObjectKind {
    fn from_archetype(archetype: &Archetype) -> Self {
        match archetype.kind {
            ObjectType::Character => {
                ObjectKind::Character(Box::new(Character::from_archetype(archetype)))
            }
            ObjectType::Block => ObjectKind::Block,
            ObjectType::Item => ObjectKind::Item,
            ObjectType::Weapon => ObjectKind::Equipable(EquipKind::Weapon),
            ObjectType::Shield => ObjectKind::Equipable(EquipKind::Shield),
            ObjectType::Armor => ObjectKind::Equipable(EquipKind::Armor),
            ObjectType::Exit => match &archetype.exit {
                Some(target) => ObjectKind::Exit(target.clone()),
                None => ObjectKind::Generic,
            },
            ObjectType::Food => {
                let profile = archetype.food.unwrap_or(crate::entities::archetype::FoodProfile {
                    nutrition: 0,
                    shelf_life_ms: 0,
                });
                ObjectKind::Food(Food {
                    nutrition: profile.nutrition,
                    fresh_for: (profile.shelf_life_ms > 0)
                        .then(|| Duration::from_millis(profile.shelf_life_ms)),
                    spoiled: false,
                })
            }
            ObjectType::Flora => ObjectKind::Flora,
            ObjectType::Audio => ObjectKind::Audio(Audio {
                loop_length: Duration::from_millis(
                    archetype.audio.map_or(0, |audio| audio.loop_ms),
                ),
                position: Duration::ZERO,
                loops: 0,
            }),
            ObjectType::Skill => ObjectKind::Skill(archetype.teaches.clone()),
            ObjectType::Generic => ObjectKind::Generic,
            ObjectType::Special => ObjectKind::Special,
        }
    }
}

/// An entity instance: the shared record plus its variant payload.
///
/// `tile` and `owner` are lookup handles only; the map owns placement and
/// the world owns owners.
#[derive(Debug, Clone)]
pub struct Object {
    id: ObjectId,
    archetype: Arc<Archetype>,
    tile: Option<Position>,
    owner: Option<OwnerId>,
    parent: Option<ObjectId>,
    statuses: Vec<Status>,
    blocking: Matter,
    inventory: Option<Container>,
    pub kind: ObjectKind,
}

impl Object {
    pub fn from_archetype(id: ObjectId, archetype: Arc<Archetype>) -> Self {
        let kind = ObjectKind::from_archetype(&archetype);
        let inventory = archetype.capacity.map(Container::new);
        Self {
            id,
            blocking: archetype.blocking,
            archetype,
            tile: None,
            owner: None,
            parent: None,
            statuses: Vec::new(),
            inventory,
            kind,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn set_id(&mut self, id: ObjectId) {
        self.id = id;
    }

    pub fn owner(&self) -> Option<OwnerId> {
        self.owner
    }

    pub fn set_owner(&mut self, owner: Option<OwnerId>) {
        self.owner = owner;
    }

    pub fn tile(&self) -> Option<Position> {
        self.tile
    }

    pub fn set_tile(&mut self, tile: Option<Position>) {
        self.tile = tile;
    }

    /// Container or wearer holding this object while it is out of the world.
    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    pub fn set_parent(&mut self, parent: Option<ObjectId>) {
        self.parent = parent;
    }

    pub fn archetype(&self) -> &Arc<Archetype> {
        &self.archetype
    }

    pub fn object_type(&self) -> ObjectType {
        self.archetype.kind
    }

    pub fn name(&self) -> &str {
        &self.archetype.name
    }

    pub fn dimensions(&self) -> Dimensions {
        self.archetype.dimensions.normalized()
    }

    pub fn volume(&self) -> u64 {
        self.archetype.volume()
    }

    pub fn footprint(&self) -> Option<Footprint> {
        self.tile
            .map(|anchor| Footprint::new(anchor, self.dimensions()))
    }

    pub fn matter(&self) -> Matter {
        self.archetype.matter
    }

    pub fn blocking(&self) -> Matter {
        self.blocking
    }

    pub fn set_blocking(&mut self, blocking: Matter) {
        self.blocking = blocking;
    }

    pub fn inventory(&self) -> Option<&Container> {
        self.inventory.as_ref()
    }

    pub fn inventory_mut(&mut self) -> Option<&mut Container> {
        self.inventory.as_mut()
    }

    pub fn character(&self) -> Option<&Character> {
        match &self.kind {
            ObjectKind::Character(character) => Some(character),
            _ => None,
        }
    }

    pub fn character_mut(&mut self) -> Option<&mut Character> {
        match &mut self.kind {
            ObjectKind::Character(character) => Some(character),
            _ => None,
        }
    }

    pub fn exit_target(&self) -> Option<&ExitTarget> {
        match &self.kind {
            ObjectKind::Exit(target) => Some(target),
            _ => None,
        }
    }

    pub fn statuses(&self) -> &[Status] {
        &self.statuses
    }

    pub fn has_status(&self, kind: StatusKind) -> bool {
        self.statuses.iter().any(|status| status.kind() == kind)
    }

    /// At most one status of each kind; returns `false` if already present.
    pub fn add_status(&mut self, status: Status) -> bool {
        if self.has_status(status.kind()) {
            return false;
        }
        self.statuses.push(status);
        true
    }

    pub fn remove_status(&mut self, kind: StatusKind) -> bool {
        let before = self.statuses.len();
        self.statuses.retain(|status| status.kind() != kind);
        self.statuses.len() != before
    }

    pub(crate) fn take_statuses(&mut self) -> Vec<Status> {
        std::mem::take(&mut self.statuses)
    }

    /// Puts updated statuses back in front of any added while they were out.
    pub(crate) fn restore_statuses(&mut self, mut kept: Vec<Status>) {
        let added = std::mem::take(&mut self.statuses);
        for status in added {
            if !kept.iter().any(|entry| entry.kind() == status.kind()) {
                kept.push(status);
            }
        }
        self.statuses = kept;
    }

    /// Per-tick hook for variant-specific timers.
    pub fn update(&mut self, delta: Duration) {
        match &mut self.kind {
            ObjectKind::Food(food) => {
                if let Some(remaining) = food.fresh_for {
                    let remaining = remaining.saturating_sub(delta);
                    food.fresh_for = Some(remaining);
                    if remaining.is_zero() {
                        food.spoiled = true;
                    }
                }
            }
            ObjectKind::Audio(audio) => {
                if audio.loop_length.is_zero() {
                    return;
                }
                let mut position = audio.position + delta;
                while position >= audio.loop_length {
                    position -= audio.loop_length;
                    audio.loops = audio.loops.saturating_add(1);
                }
                audio.position = position;
            }
            _ => {}
        }
    }

    pub fn needs_update(&self) -> bool {
        !self.statuses.is_empty()
            || matches!(
                self.kind,
                ObjectKind::Food(Food {
                    fresh_for: Some(_),
                    spoiled: false,
                    ..
                }) | ObjectKind::Audio(_)
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::archetype::{AudioProfile, FoodProfile};

    fn object_of(archetype: Archetype) -> Object {
        Object::from_archetype(ObjectId(7), Arc::new(archetype))
    }

    #[test]
    fn variant_follows_archetype_type() {
        let mut archetype = Archetype::new("hero", ObjectType::Character);
        archetype.capacity = Some(12);
        let object = object_of(archetype);
        assert!(object.character().is_some());
        assert_eq!(object.inventory().map(Container::volume), Some(12));
        assert_eq!(object.object_type(), ObjectType::Character);

        let shield = object_of(Archetype::new("buckler", ObjectType::Shield));
        assert_eq!(shield.kind, ObjectKind::Equipable(EquipKind::Shield));
        assert!(shield.inventory().is_none());
    }

    #[test]
    fn food_spoils_after_shelf_life() {
        let mut archetype = Archetype::new("bread", ObjectType::Food);
        archetype.food = Some(FoodProfile {
            nutrition: 5,
            shelf_life_ms: 1_000,
        });
        let mut bread = object_of(archetype);
        assert!(bread.needs_update());
        bread.update(Duration::from_millis(600));
        bread.update(Duration::from_millis(600));
        match &bread.kind {
            ObjectKind::Food(food) => assert!(food.spoiled),
            other => panic!("unexpected kind {:?}", other),
        }
        assert!(!bread.needs_update());
    }

    #[test]
    fn audio_counts_loops() {
        let mut archetype = Archetype::new("chime", ObjectType::Audio);
        archetype.audio = Some(AudioProfile {
            loop_ms: 300,
            volume: 4,
        });
        let mut chime = object_of(archetype);
        chime.update(Duration::from_millis(700));
        match chime.kind {
            ObjectKind::Audio(audio) => {
                assert_eq!(audio.loops, 2);
                assert_eq!(audio.position, Duration::from_millis(100));
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn statuses_are_unique_per_kind() {
        let mut object = object_of(Archetype::new("hero", ObjectType::Character));
        assert!(object.add_status(Status::running()));
        assert!(!object.add_status(Status::running()));
        assert!(object.has_status(StatusKind::Running));
        assert!(object.remove_status(StatusKind::Running));
        assert!(!object.remove_status(StatusKind::Running));
    }
}
