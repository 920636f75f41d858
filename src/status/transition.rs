use crate::entities::character::Stance;
use crate::entities::object::{Object, ObjectId};
use crate::status::StatusStep;
use crate::world::map::Map;
use std::time::Duration;

pub const SQUEEZE_DURATION: Duration = Duration::from_secs(1);

/// Countdown that flips the squeezed stance when it completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    remaining: Duration,
}

impl Transition {
    pub fn new(duration: Duration) -> Self {
        Self {
            remaining: duration,
        }
    }

    pub fn squeeze() -> Self {
        Self::new(SQUEEZE_DURATION)
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    pub(crate) fn update(
        &mut self,
        object: ObjectId,
        map: &mut Map,
        delta: Duration,
        squeezing: bool,
    ) -> StatusStep {
        self.remaining = self.remaining.saturating_sub(delta);
        if !self.remaining.is_zero() {
            return StatusStep::Keep;
        }
        if let Some(character) = map.object_mut(object).and_then(Object::character_mut) {
            character.stance = if squeezing {
                Stance::Squeezed
            } else {
                Stance::Standing
            };
        }
        StatusStep::Remove
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::archetype::{Archetype, ObjectType};
    use crate::status::{Status, StatusKind};
    use crate::world::position::Position;
    use std::sync::Arc;

    #[test]
    fn squeeze_completes_after_one_second() {
        let mut map = Map::new("cave", 1, 2, 1);
        let hero = Object::from_archetype(
            ObjectId(1),
            Arc::new(Archetype::new("hero", ObjectType::Character)),
        );
        map.add_object(hero);
        map.place_object(ObjectId(1), Position::new(0, 0, 0))
            .expect("place");
        assert!(map.attach_status(ObjectId(1), Status::from_kind(StatusKind::Squeezing)));

        map.update(Duration::from_millis(600));
        assert!(map.object(ObjectId(1)).expect("hero").has_status(StatusKind::Squeezing));
        map.update(Duration::from_millis(400));

        let hero = map.object(ObjectId(1)).expect("hero");
        assert!(!hero.has_status(StatusKind::Squeezing));
        assert_eq!(hero.character().map(|c| c.stance), Some(Stance::Squeezed));
    }
}
