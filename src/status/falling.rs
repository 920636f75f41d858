use crate::entities::matter::Matter;
use crate::entities::object::ObjectId;
use crate::scripting::events::ObjectEvent;
use crate::status::{Status, StatusKind, StatusStep};
use crate::world::map::{Map, Support};
use crate::world::position::PositionDelta;
use std::time::Duration;

/// Time to fall one tile.
pub const FALL_UNIT: Duration = Duration::from_millis(250);

const DOWN: PositionDelta = PositionDelta::new(-1, 0, 0);

/// Falls one tile per `FALL_UNIT` until something below blocks the object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Falling {
    elapsed: Duration,
    distance: u32,
}

impl Falling {
    pub fn distance(&self) -> u32 {
        self.distance
    }

    pub(crate) fn update(
        &mut self,
        object: ObjectId,
        siblings: &[StatusKind],
        map: &mut Map,
        delta: Duration,
    ) -> StatusStep {
        if siblings.iter().any(|kind| kind.is_airborne()) {
            return StatusStep::Remove;
        }
        self.elapsed += delta;
        while self.elapsed >= FALL_UNIT {
            self.elapsed -= FALL_UNIT;
            match map.support_below(object) {
                Support::Supported => {
                    self.land(object, map);
                    return StatusStep::Remove;
                }
                Support::Open => {
                    if let Err(err) = map.move_object(object, DOWN) {
                        tracing::debug!(object = object.0, "fall stopped: {}", err);
                        return StatusStep::Remove;
                    }
                    self.distance += 1;
                    if map.footprint_has_matter(object, Matter::LIQUID) {
                        self.land(object, map);
                        map.attach_status(object, Status::Swimming);
                        return StatusStep::Remove;
                    }
                }
                Support::Edge | Support::Detached => return StatusStep::Remove,
            }
        }
        StatusStep::Keep
    }

    fn land(&self, object: ObjectId, map: &mut Map) {
        map.emit(object, ObjectEvent::Fell {
            distance: self.distance,
        });
        if self.distance > 0 {
            map.message_object_owner(object, format!("You fell {} tiles.", self.distance));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::archetype::{Archetype, ObjectType};
    use crate::entities::object::Object;
    use crate::world::map::MapNotice;
    use crate::world::position::Position;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn tower() -> Map {
        let mut map = Map::new("tower", 10, 1, 1);
        let mut floor = Archetype::new("floor", ObjectType::Block);
        floor.matter = Matter::SOLID;
        floor.blocking = Matter::SOLID;
        let mut hero = Archetype::new("hero", ObjectType::Character);
        hero.matter = Matter::SOLID;
        hero.blocking = Matter::SOLID;
        map.add_object(Object::from_archetype(ObjectId(1), Arc::new(floor)));
        map.add_object(Object::from_archetype(ObjectId(2), Arc::new(hero)));
        map.place_object(ObjectId(1), Position::new(0, 0, 0))
            .expect("floor");
        map.place_object(ObjectId(2), Position::new(8, 0, 0))
            .expect("hero");
        map.attach_status(ObjectId(2), Status::falling());
        map.drain_notices();
        map
    }

    fn fell_distance(map: &mut Map) -> Option<u32> {
        map.drain_notices()
            .into_iter()
            .find_map(|notice| match notice {
                MapNotice::Event {
                    event: ObjectEvent::Fell { distance },
                    ..
                } => Some(distance),
                _ => None,
            })
    }

    #[test]
    fn lands_on_the_floor() {
        let mut map = tower();
        map.update(Duration::from_secs(3));
        let hero = map.object(ObjectId(2)).expect("hero");
        assert_eq!(hero.tile(), Some(Position::new(1, 0, 0)));
        assert!(!hero.has_status(StatusKind::Falling));
        assert_eq!(fell_distance(&mut map), Some(7));
    }

    #[test]
    fn nothing_moves_before_one_unit() {
        let mut map = tower();
        map.update(FALL_UNIT - Duration::from_millis(1));
        let hero = map.object(ObjectId(2)).expect("hero");
        assert_eq!(hero.tile(), Some(Position::new(8, 0, 0)));
        assert!(hero.has_status(StatusKind::Falling));
    }

    #[test]
    fn flying_stops_a_fall() {
        let mut map = tower();
        map.attach_status(ObjectId(2), Status::Flying);
        map.update(Duration::from_secs(1));
        let hero = map.object(ObjectId(2)).expect("hero");
        assert_eq!(hero.tile(), Some(Position::new(8, 0, 0)));
        assert!(!hero.has_status(StatusKind::Falling));
    }

    proptest! {
        #[test]
        fn tick_granularity_does_not_change_the_fall(
            chunks in proptest::collection::vec(1u64..400, 1..40)
        ) {
            let total: u64 = chunks.iter().sum();

            let mut chunked = tower();
            for chunk in &chunks {
                chunked.update(Duration::from_millis(*chunk));
            }
            let mut single = tower();
            single.update(Duration::from_millis(total));

            let chunked_tile = chunked.object(ObjectId(2)).and_then(|o| o.tile());
            let single_tile = single.object(ObjectId(2)).and_then(|o| o.tile());
            prop_assert_eq!(chunked_tile, single_tile);
            prop_assert_eq!(fell_distance(&mut chunked), fell_distance(&mut single));
        }
    }
}
