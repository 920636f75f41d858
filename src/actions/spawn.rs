use crate::actions::{movement, ActionContext, ActionOutcome};
use crate::entities::archetype::Archetype;
use crate::entities::matter::Matter;
use crate::entities::object::{Object, ObjectId};
use crate::error::{CoreError, CoreResult};
use crate::scripting::events::ObjectEvent;
use crate::world::area::Footprint;
use crate::world::idmap::IdMap;
use crate::world::map::Map;
use crate::world::position::{Position, PositionDelta};
use rand::Rng;
use serde::Deserialize;
use std::sync::Arc;

/// Inclusive offset range along one axis, relative to the spawn origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct SpawnRange {
    pub min: i32,
    pub max: i32,
}

impl SpawnRange {
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    fn sample<R: Rng + ?Sized>(self, rng: &mut R) -> i32 {
        let (low, high) = (self.min.min(self.max), self.min.max(self.max));
        rng.gen_range(low..=high)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SpawnCount {
    pub min: u32,
    pub max: u32,
}

impl Default for SpawnCount {
    fn default() -> Self {
        Self { min: 1, max: 1 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpawnRequest {
    pub archetype: String,
    #[serde(default)]
    pub count: SpawnCount,
    #[serde(default)]
    pub retry: u32,
    /// Defaults to the acting object's tile.
    #[serde(default)]
    pub origin: Option<Position>,
    #[serde(default)]
    pub y: SpawnRange,
    #[serde(default)]
    pub x: SpawnRange,
    #[serde(default)]
    pub z: SpawnRange,
    /// Matter something directly below the footprint must block.
    #[serde(default)]
    pub surface: Matter,
    /// Matter nothing inside the footprint may block.
    #[serde(default)]
    pub air: Matter,
    #[serde(default)]
    pub no_overlap: bool,
    #[serde(default)]
    pub force: bool,
}

impl SpawnRequest {
    pub fn new(archetype: impl Into<String>) -> Self {
        Self {
            archetype: archetype.into(),
            count: SpawnCount::default(),
            retry: 0,
            origin: None,
            y: SpawnRange::default(),
            x: SpawnRange::default(),
            z: SpawnRange::default(),
            surface: Matter::NONE,
            air: Matter::NONE,
            no_overlap: false,
            force: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpawnReport {
    pub attempts: u32,
    pub spawned: Vec<ObjectId>,
    pub abandoned: u32,
}

/// Decides whether a candidate footprint is acceptable.
pub trait PlacementCheck {
    fn allows(&self, map: &Map, footprint: &Footprint) -> bool;
}

/// The placement rules carried by a [`SpawnRequest`].
#[derive(Debug, Clone, Copy)]
pub struct Constraints {
    pub surface: Matter,
    pub air: Matter,
    pub no_overlap: bool,
}

impl From<&SpawnRequest> for Constraints {
    fn from(request: &SpawnRequest) -> Self {
        Self {
            surface: request.surface,
            air: request.air,
            no_overlap: request.no_overlap,
        }
    }
}

impl PlacementCheck for Constraints {
    fn allows(&self, map: &Map, footprint: &Footprint) -> bool {
        if map.fits(footprint).is_err() {
            return false;
        }
        if !self.surface.is_empty() {
            let supported = footprint
                .cells_below()
                .into_iter()
                .flatten()
                .filter(|cell| map.contains(*cell))
                .any(|cell| map.tile_blocks(cell, self.surface, None));
            if !supported {
                return false;
            }
        }
        if !self.air.is_empty() && map.footprint_blocked(footprint, self.air, None).is_some() {
            return false;
        }
        if self.no_overlap {
            let occupied = footprint
                .cells()
                .flatten()
                .any(|cell| map.objects_at(cell).next().is_some());
            if occupied {
                return false;
            }
        }
        true
    }
}

/// Places up to `count` copies of `archetype` around `origin`. Ids are only
/// taken for successful placements, so a fully failed spawn leaves both the
/// map and the id pool untouched.
pub fn spawn<R: Rng + ?Sized>(
    request: &SpawnRequest,
    origin: Position,
    archetype: &Arc<Archetype>,
    map: &mut Map,
    rng: &mut R,
    check: &dyn PlacementCheck,
    ids: &mut IdMap,
) -> CoreResult<SpawnReport> {
    let dims = archetype.dimensions;
    let mut report = SpawnReport::default();
    let wanted = SpawnRange::new(
        i32::try_from(request.count.min).unwrap_or(i32::MAX),
        i32::try_from(request.count.max).unwrap_or(i32::MAX),
    )
    .sample(rng);

    if request.force {
        map.fits(&Footprint::new(origin, dims))?;
    }

    for _ in 0..wanted {
        let mut found = None;
        if request.force {
            report.attempts += 1;
            found = Some(origin);
        } else {
            for _ in 0..=request.retry {
                report.attempts += 1;
                let offset = PositionDelta::new(
                    request.y.sample(rng),
                    request.x.sample(rng),
                    request.z.sample(rng),
                );
                let footprint = Footprint::new(origin, dims).shifted(offset);
                if check.allows(map, &footprint) {
                    found = footprint.anchor();
                    break;
                }
            }
        }
        let Some(position) = found else {
            report.abandoned += 1;
            continue;
        };

        let id = ids.acquire()?;
        map.add_object(Object::from_archetype(id, Arc::clone(archetype)));
        if let Err(err) = map.place_object(id, position) {
            map.discard_object(id);
            ids.free(id);
            tracing::debug!(archetype = %archetype.name, "spawn placement failed: {}", err);
            report.abandoned += 1;
            continue;
        }
        movement::apply_support(map, id);
        map.emit(id, ObjectEvent::Birth);
        report.spawned.push(id);
    }
    Ok(report)
}

pub(crate) fn spawn_from_templates(
    ctx: &mut ActionContext<'_>,
    request: &SpawnRequest,
) -> CoreResult<ActionOutcome> {
    let origin = match request.origin {
        Some(origin) => origin,
        None => ctx.actor()?.tile().ok_or(CoreError::NilTarget)?,
    };
    let archetype = ctx.templates.archetype(&request.archetype)?;
    let constraints = Constraints::from(request);
    let report = spawn(
        request,
        origin,
        &archetype,
        ctx.map,
        ctx.rng,
        &constraints,
        ctx.ids,
    )?;
    if !report.spawned.is_empty() {
        ctx.tell(format!(
            "Spawned {} {}.",
            report.spawned.len(),
            archetype.name
        ));
    }
    Ok(ActionOutcome::Spawned(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{resolve, Action, ActionKind};
    use crate::entities::archetype::ObjectType;
    use crate::entities::owner::OwnerId;
    use crate::status::StatusKind;
    use crate::world::map::MapNotice;
    use crate::world::template::TemplateIndex;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::cell::Cell;
    use std::time::Duration;

    struct Never {
        calls: Cell<u32>,
    }

    impl PlacementCheck for Never {
        fn allows(&self, _map: &Map, _footprint: &Footprint) -> bool {
            self.calls.set(self.calls.get() + 1);
            false
        }
    }

    fn rat() -> Arc<Archetype> {
        Arc::new(Archetype::new("rat", ObjectType::Character))
    }

    /// 3x3x3 cave with a stone floor at y = 0.
    fn cave() -> Map {
        let mut map = Map::new("cave", 3, 3, 3);
        let mut stone = Archetype::new("stone", ObjectType::Block);
        stone.matter = Matter::SOLID;
        stone.blocking = Matter::SOLID;
        let stone = Arc::new(stone);
        let mut next = 100;
        for x in 0..3u16 {
            for z in 0..3u16 {
                let id = map.add_object(Object::from_archetype(ObjectId(next), Arc::clone(&stone)));
                map.place_object(id, Position::new(0, x, z)).expect("floor");
                next += 1;
            }
        }
        map
    }

    #[test]
    fn exhausted_retries_leave_the_map_alone() {
        let mut map = cave();
        let stamp = map.update_time();
        let objects = map.object_count();
        let mut ids = IdMap::new();
        let mut rng = StdRng::seed_from_u64(11);
        let mut request = SpawnRequest::new("rat");
        request.retry = 4;
        let never = Never {
            calls: Cell::new(0),
        };

        let report = spawn(
            &request,
            Position::new(1, 1, 1),
            &rat(),
            &mut map,
            &mut rng,
            &never,
            &mut ids,
        )
        .expect("spawn");
        assert_eq!(never.calls.get(), 5);
        assert_eq!(report.attempts, 5);
        assert_eq!(report.abandoned, 1);
        assert!(report.spawned.is_empty());
        assert_eq!(map.update_time(), stamp);
        assert_eq!(map.object_count(), objects);
        assert_eq!(ids.live_count(), 0);
        assert!(map.drain_notices().is_empty());
    }

    #[test]
    fn one_abandoned_spawn_does_not_stop_the_rest() {
        let mut map = cave();
        let mut ids = IdMap::new();
        let mut rng = StdRng::seed_from_u64(5);
        let mut request = SpawnRequest::new("rat");
        request.count = SpawnCount { min: 2, max: 2 };
        request.no_overlap = true;
        request.surface = Matter::SOLID;

        // Only (1, 1, 1) is open and sits on the floor; the second rat finds
        // it taken.
        let report = spawn(
            &request,
            Position::new(1, 1, 1),
            &rat(),
            &mut map,
            &mut rng,
            &Constraints::from(&request),
            &mut ids,
        )
        .expect("spawn");
        assert_eq!(report.spawned.len(), 1);
        assert_eq!(report.abandoned, 1);
        assert_eq!(report.attempts, 2);
        let births = map
            .drain_notices()
            .into_iter()
            .filter(|notice| {
                matches!(
                    notice,
                    MapNotice::Event {
                        event: ObjectEvent::Birth,
                        ..
                    }
                )
            })
            .count();
        assert_eq!(births, 1);
    }

    #[test]
    fn constraints_check_surface_and_air() {
        let map = cave();
        let on_floor = Constraints {
            surface: Matter::SOLID,
            air: Matter::SOLID,
            no_overlap: false,
        };
        let cell = |y, x, z| Footprint::new(Position::new(y, x, z), Default::default());
        assert!(on_floor.allows(&map, &cell(1, 0, 0)));
        assert!(!on_floor.allows(&map, &cell(2, 0, 0)));
        assert!(!on_floor.allows(&map, &cell(0, 0, 0)));
        assert!(!on_floor.allows(&map, &cell(1, 0, 0).shifted(PositionDelta::new(0, 3, 0))));
    }

    #[test]
    fn forced_spawn_ignores_constraints_but_not_bounds() {
        let mut map = cave();
        let mut ids = IdMap::new();
        let mut rng = StdRng::seed_from_u64(2);
        let mut request = SpawnRequest::new("rat");
        request.force = true;
        request.no_overlap = true;

        let report = spawn(
            &request,
            Position::new(0, 0, 0),
            &rat(),
            &mut map,
            &mut rng,
            &Constraints::from(&request),
            &mut ids,
        )
        .expect("forced");
        assert_eq!(report.spawned.len(), 1);
        assert_eq!(map.objects_at(Position::new(0, 0, 0)).count(), 2);

        assert!(matches!(
            spawn(
                &request,
                Position::new(3, 0, 0),
                &rat(),
                &mut map,
                &mut rng,
                &Constraints::from(&request),
                &mut ids,
            ),
            Err(CoreError::OutOfBounds(_))
        ));
        assert_eq!(ids.live_count(), 1);
    }

    #[test]
    fn spawn_in_mid_air_starts_falling() {
        let mut map = cave();
        let mut ids = IdMap::new();
        let mut rng = StdRng::seed_from_u64(4);
        let mut request = SpawnRequest::new("rat");
        request.force = true;

        let report = spawn(
            &request,
            Position::new(2, 1, 1),
            &rat(),
            &mut map,
            &mut rng,
            &Constraints::from(&request),
            &mut ids,
        )
        .expect("spawn");
        let rat = map.object(report.spawned[0]).expect("rat");
        assert!(rat.has_status(StatusKind::Falling));
        let fell = map.drain_notices().into_iter().any(|notice| {
            matches!(
                notice,
                MapNotice::Event {
                    event: ObjectEvent::Fall,
                    ..
                }
            )
        });
        assert!(fell);
    }

    #[test]
    fn spawn_action_uses_the_template_index() {
        let mut map = cave();
        let mut templates = TemplateIndex::new();
        templates.insert_archetype(Archetype::new("rat", ObjectType::Character));
        let mut hero = Archetype::new("hero", ObjectType::Character);
        hero.blocking = Matter::NONE;
        map.add_object(Object::from_archetype(ObjectId(50), Arc::new(hero)));
        map.place_object(ObjectId(50), Position::new(1, 0, 0))
            .expect("hero");

        let mut ids = IdMap::new();
        let mut rng = StdRng::seed_from_u64(9);
        let mut ctx = ActionContext {
            map: &mut map,
            owner: OwnerId(1),
            actor: ObjectId(50),
            templates: &templates,
            ids: &mut ids,
            rng: &mut rng,
        };
        let action = Action::new(
            ActionKind::Spawn(SpawnRequest::new("rat")),
            Duration::ZERO,
        );
        let outcome = resolve(&action, &mut ctx).expect("spawn");
        let report = match outcome {
            ActionOutcome::Spawned(report) => report,
            other => panic!("unexpected outcome {:?}", other),
        };
        assert_eq!(report.spawned.len(), 1);
        assert_eq!(
            map.object(report.spawned[0]).and_then(Object::tile),
            Some(Position::new(1, 0, 0))
        );

        let mut ctx = ActionContext {
            map: &mut map,
            owner: OwnerId(1),
            actor: ObjectId(50),
            templates: &templates,
            ids: &mut ids,
            rng: &mut rng,
        };
        let missing = Action::new(
            ActionKind::Spawn(SpawnRequest::new("dragon")),
            Duration::ZERO,
        );
        assert_eq!(
            resolve(&missing, &mut ctx),
            Err(CoreError::UnknownArchetype("dragon".to_string()))
        );
    }
}
