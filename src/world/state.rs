use crate::actions::{movement, resolve, Action, ActionContext, ActionKind};
use crate::entities::archetype::Archetype;
use crate::entities::object::{Object, ObjectId};
use crate::entities::owner::{Owner, OwnerId, Roster, DEFAULT_ATTITUDE_CACHE};
use crate::error::{CoreError, CoreResult};
use crate::net::session::Session;
use crate::scripting::events::{ObjectEvent, ScriptHooks};
use crate::status::StatusKind;
use crate::telemetry::logging;
use crate::world::area::Footprint;
use crate::world::idmap::IdMap;
use crate::world::map::{Map, MapNotice, MapTransfer};
use crate::world::position::Position;
use crate::world::template::{instantiate, TemplateSource};
use crate::world::time::{CycleClock, CycleTick, GameClock, GameTick};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{BTreeMap, HashMap};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Work queued from outside the tick thread. At most one request is drained
/// per tick.
pub enum WorldRequest {
    AddPlayer {
        session: Arc<dyn Session>,
        map: Option<String>,
        archetype: String,
    },
    RemovePlayer {
        owner: OwnerId,
    },
}

#[derive(Debug, Clone)]
pub struct WorldSettings {
    pub tick_length: Duration,
    pub default_map: String,
    pub attitude_cache_size: usize,
    pub cycle_length: Duration,
    pub cycles_per_season: u64,
    pub rng_seed: Option<u64>,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            tick_length: Duration::from_millis(50),
            default_map: "start".to_string(),
            attitude_cache_size: DEFAULT_ATTITUDE_CACHE,
            cycle_length: Duration::ZERO,
            cycles_per_season: 0,
            rng_seed: None,
        }
    }
}

impl From<&crate::config::AppConfig> for WorldSettings {
    fn from(config: &crate::config::AppConfig) -> Self {
        Self {
            tick_length: config.tick_length,
            default_map: config.default_map.clone(),
            attitude_cache_size: config.attitude_cache_size,
            cycle_length: config.cycle_length,
            cycles_per_season: config.cycles_per_season,
            rng_seed: config.rng_seed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    pub tick: GameTick,
    pub resolved: usize,
    pub failed: usize,
    pub transfers: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SweepReport {
    pub slept: Vec<String>,
    pub expired: Vec<String>,
    pub freed_ids: usize,
}

enum Delivery {
    Message(Arc<dyn Session>, String),
    Status(Arc<dyn Session>, StatusKind, bool),
}

/// Everything gathered under the locks that must be acted on after they are
/// released.
#[derive(Default)]
struct Outbox {
    deliveries: Vec<Delivery>,
    events: Vec<(ObjectId, Arc<Archetype>, ObjectEvent)>,
    transfers: Vec<(String, MapTransfer)>,
    updated: Vec<String>,
    joins: Vec<(String, OwnerId)>,
    leaves: Vec<(String, OwnerId)>,
}

/// The live simulation: active and inactive maps, the owner roster, the id
/// pool and the request queue.
///
/// Locks are always taken in the order inactive maps, active maps, roster,
/// ids, rng, clocks. Sessions and script hooks are only called with no map
/// lock held.
pub struct World {
    inactive: Mutex<HashMap<String, Map>>,
    active: Mutex<BTreeMap<String, Map>>,
    roster: Mutex<Roster>,
    ids: Mutex<IdMap>,
    rng: Mutex<StdRng>,
    clock: Mutex<GameClock>,
    cycles: Mutex<CycleClock>,
    requests: Mutex<Receiver<WorldRequest>>,
    sender: Sender<WorldRequest>,
    templates: Arc<dyn TemplateSource>,
    hooks: Arc<dyn ScriptHooks>,
    default_map: String,
}

fn lock<'a, T>(mutex: &'a Mutex<T>, name: &'static str) -> CoreResult<MutexGuard<'a, T>> {
    mutex.lock().map_err(|_| CoreError::LockPoisoned(name))
}

impl World {
    pub fn new(
        templates: Arc<dyn TemplateSource>,
        hooks: Arc<dyn ScriptHooks>,
        settings: WorldSettings,
    ) -> Self {
        let (sender, receiver) = mpsc::channel();
        let rng = match settings.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            inactive: Mutex::new(HashMap::new()),
            active: Mutex::new(BTreeMap::new()),
            roster: Mutex::new(Roster::new(settings.attitude_cache_size)),
            ids: Mutex::new(IdMap::new()),
            rng: Mutex::new(rng),
            clock: Mutex::new(GameClock::new(settings.tick_length)),
            cycles: Mutex::new(CycleClock::new(
                settings.cycle_length,
                settings.cycles_per_season,
            )),
            requests: Mutex::new(receiver),
            sender,
            templates,
            hooks,
            default_map: settings.default_map,
        }
    }

    /// Handle for queueing requests from other threads.
    pub fn sender(&self) -> Sender<WorldRequest> {
        self.sender.clone()
    }

    pub fn submit(&self, request: WorldRequest) {
        // The receiver lives as long as `self`, so sending cannot fail here.
        let _ = self.sender.send(request);
    }

    pub fn default_map(&self) -> &str {
        &self.default_map
    }

    pub fn active_maps(&self) -> CoreResult<Vec<String>> {
        Ok(lock(&self.active, "active maps")?.keys().cloned().collect())
    }

    pub fn inactive_maps(&self) -> CoreResult<Vec<String>> {
        let mut names: Vec<String> = lock(&self.inactive, "inactive maps")?
            .keys()
            .cloned()
            .collect();
        names.sort();
        Ok(names)
    }

    pub fn is_active(&self, name: &str) -> CoreResult<bool> {
        Ok(lock(&self.active, "active maps")?.contains_key(name))
    }

    pub fn owner_count(&self) -> CoreResult<usize> {
        Ok(lock(&self.roster, "roster")?.len())
    }

    pub fn live_ids(&self) -> CoreResult<usize> {
        Ok(lock(&self.ids, "ids")?.live_count())
    }

    pub fn now(&self) -> CoreResult<GameTick> {
        Ok(lock(&self.clock, "clock")?.now())
    }

    /// Runs `f` against an active map.
    pub fn with_map<R>(&self, name: &str, f: impl FnOnce(&Map) -> R) -> CoreResult<R> {
        let active = lock(&self.active, "active maps")?;
        let map = active
            .get(name)
            .ok_or_else(|| CoreError::UnknownMap(name.to_string()))?;
        Ok(f(map))
    }

    /// Runs `f` against an owner.
    pub fn with_owner<R>(&self, owner: OwnerId, f: impl FnOnce(&mut Owner) -> R) -> CoreResult<R> {
        let mut roster = lock(&self.roster, "roster")?;
        let owner = roster
            .get_mut(owner)
            .ok_or(CoreError::UnknownOwner(owner))?;
        Ok(f(owner))
    }

    /// Makes a map active: wakes a sleeping one, keeps a live one, or builds
    /// it from its template.
    pub fn load_map(&self, name: &str) -> CoreResult<()> {
        let woke = {
            let mut inactive = lock(&self.inactive, "inactive maps")?;
            let mut active = lock(&self.active, "active maps")?;
            if active.contains_key(name) {
                return Ok(());
            }
            match inactive.remove(name) {
                Some(map) => {
                    active.insert(name.to_string(), map);
                    true
                }
                None => {
                    let template = self.templates.map_template(name)?;
                    let mut ids = lock(&self.ids, "ids")?;
                    let map = instantiate(&template, self.templates.as_ref(), &mut ids)?;
                    logging::log_game(&format!(
                        "map {} loaded ({} objects)",
                        name,
                        map.object_count()
                    ));
                    active.insert(name.to_string(), map);
                    false
                }
            }
        };
        if woke {
            logging::log_game(&format!("map {} woke", name));
            self.hooks.on_wake(name);
        }
        Ok(())
    }

    /// Connects a player: a new owner controlling a fresh object of
    /// `archetype` placed at the map's spawn point.
    pub fn add_player(
        &self,
        session: Arc<dyn Session>,
        map: Option<&str>,
        archetype: &str,
    ) -> CoreResult<OwnerId> {
        let map = map.unwrap_or(&self.default_map).to_string();
        self.load_map(&map)?;
        let owner = lock(&self.roster, "roster")?.add_player(session);
        match self.embody(owner, &map, archetype, None) {
            Ok(()) => {
                logging::log_session(&format!("owner {} joined {}", owner.0, map));
                self.hooks.on_owner_join(&map, owner);
                Ok(owner)
            }
            Err(err) => {
                lock(&self.roster, "roster")?.remove(owner);
                Err(err)
            }
        }
    }

    /// Attaches an AI owner to a fresh object on `map`.
    pub fn attach_ai(
        &self,
        map: &str,
        archetype: &str,
        position: Option<Position>,
    ) -> CoreResult<OwnerId> {
        self.load_map(map)?;
        let owner = lock(&self.roster, "roster")?.add_ai();
        match self.embody(owner, map, archetype, position) {
            Ok(()) => {
                self.hooks.on_owner_join(map, owner);
                Ok(owner)
            }
            Err(err) => {
                lock(&self.roster, "roster")?.detach(owner);
                Err(err)
            }
        }
    }

    fn embody(
        &self,
        owner: OwnerId,
        map_name: &str,
        archetype: &str,
        position: Option<Position>,
    ) -> CoreResult<()> {
        let mut active = lock(&self.active, "active maps")?;
        let mut roster = lock(&self.roster, "roster")?;
        let mut ids = lock(&self.ids, "ids")?;
        let map = active
            .get_mut(map_name)
            .ok_or_else(|| CoreError::UnknownMap(map_name.to_string()))?;
        let entry = roster
            .get_mut(owner)
            .ok_or(CoreError::UnknownOwner(owner))?;

        let id = ids.acquire()?;
        let mut object = match self.templates.create_object(id, archetype) {
            Ok(object) => object,
            Err(err) => {
                ids.free(id);
                return Err(err);
            }
        };
        object.set_owner(Some(owner));
        map.add_object(object);
        let at = position.unwrap_or_else(|| map.spawn());
        if let Err(err) = map.place_object(id, at) {
            map.discard_object(id);
            map.drain_released();
            ids.free(id);
            return Err(err);
        }
        entry.set_target(Some(id));
        entry.set_map(Some(map_name.to_string()));
        map.add_owner(owner, entry.is_player());
        movement::apply_support(map, id);
        map.emit(id, ObjectEvent::Birth);
        Ok(())
    }

    /// Disconnects an owner and destroys the object it controlled, whether
    /// its map is awake or asleep.
    pub fn remove_owner(&self, owner: OwnerId) -> CoreResult<()> {
        let mut outbox = Outbox::default();
        let removed = {
            let mut inactive = lock(&self.inactive, "inactive maps")?;
            let mut active = lock(&self.active, "active maps")?;
            let mut roster = lock(&self.roster, "roster")?;
            let mut ids = lock(&self.ids, "ids")?;
            let entry = roster
                .detach(owner)
                .ok_or(CoreError::UnknownOwner(owner))?;
            if let Some(name) = entry.map() {
                let map = match active.get_mut(name) {
                    Some(map) => Some(map),
                    None => inactive.get_mut(name),
                };
                if let Some(map) = map {
                    map.remove_owner(owner, entry.is_player());
                    if let Some(target) = entry.target() {
                        if let Err(err) = map.remove_object(target) {
                            tracing::debug!(owner = owner.0, "owner object already gone: {}", err);
                        }
                    }
                    collect(name, map, &mut roster, &mut ids, &mut outbox);
                }
                outbox.leaves.push((name.to_string(), owner));
            }
            entry
        };
        if let Some(session) = removed.session() {
            session.set_owner(None);
        }
        logging::log_session(&format!("owner {} left", owner.0));
        self.deliver(outbox);
        Ok(())
    }

    /// Queues an action for the owner's object, costed from that object.
    pub fn issue_action(&self, owner: OwnerId, kind: ActionKind) -> CoreResult<()> {
        let active = lock(&self.active, "active maps")?;
        let mut roster = lock(&self.roster, "roster")?;
        let entry = roster
            .get_mut(owner)
            .ok_or(CoreError::UnknownOwner(owner))?;
        let name = entry.map().ok_or(CoreError::NilTarget)?;
        let map = active
            .get(name)
            .ok_or_else(|| CoreError::UnknownMap(name.to_string()))?;
        let object = entry
            .target()
            .and_then(|target| map.object(target))
            .ok_or(CoreError::NilTarget)?;
        let action = Action::for_actor(kind, object);
        entry.queue_action(action);
        Ok(())
    }

    /// One simulation step of `delta`.
    pub fn tick(&self, delta: Duration) -> CoreResult<TickReport> {
        if let Some(request) = self.next_request()? {
            self.handle_request(request);
        }

        let mut report = TickReport::default();
        let mut outbox = Outbox::default();
        {
            let mut active = lock(&self.active, "active maps")?;
            let mut roster = lock(&self.roster, "roster")?;
            let mut ids = lock(&self.ids, "ids")?;
            let mut rng = lock(&self.rng, "rng")?;

            for owner_id in roster.ids() {
                let Some(owner) = roster.get_mut(owner_id) else {
                    continue;
                };
                let Some(map) = owner.map().and_then(|name| active.get_mut(name)) else {
                    continue;
                };
                let Some(actor) = owner.target() else {
                    owner.clear_actions();
                    continue;
                };
                let Some(action) = owner.advance(delta) else {
                    continue;
                };
                let mut ctx = ActionContext {
                    map,
                    owner: owner_id,
                    actor,
                    templates: self.templates.as_ref(),
                    ids: &mut ids,
                    rng: &mut rng,
                };
                match resolve(&action, &mut ctx) {
                    Ok(outcome) => {
                        report.resolved += 1;
                        tracing::debug!(owner = owner_id.0, ?outcome, "{} resolved", action.kind().name());
                    }
                    Err(err) => {
                        report.failed += 1;
                        logging::log_game(&format!(
                            "owner {} {} failed: {}",
                            owner_id.0,
                            action.kind().name(),
                            err
                        ));
                        ctx.map.message_owner(owner_id, err.to_string());
                    }
                }
            }

            for (name, map) in active.iter_mut() {
                let update_time = map.update_time();
                for owner_id in map.owners() {
                    if let Some(owner) = roster.get_mut(*owner_id) {
                        owner.on_map_update(delta, update_time);
                    }
                }
                map.update(delta);
                collect(name, map, &mut roster, &mut ids, &mut outbox);
                outbox.updated.push(name.clone());
            }
        }
        report.transfers = outbox.transfers.len();

        let fired = lock(&self.cycles, "cycles")?.advance(delta);
        report.tick = lock(&self.clock, "clock")?.advance();
        self.deliver(outbox);
        if !fired.is_empty() {
            let names = self.active_maps()?;
            for tick in fired {
                for name in &names {
                    match tick {
                        CycleTick::Cycle(cycle) => self.hooks.on_cycle(name, cycle),
                        CycleTick::Season(season) => self.hooks.on_season(name, season),
                    }
                }
            }
        }
        Ok(report)
    }

    fn next_request(&self) -> CoreResult<Option<WorldRequest>> {
        let requests = lock(&self.requests, "requests")?;
        match requests.try_recv() {
            Ok(request) => Ok(Some(request)),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => Ok(None),
        }
    }

    fn handle_request(&self, request: WorldRequest) {
        match request {
            WorldRequest::AddPlayer {
                session,
                map,
                archetype,
            } => {
                if let Err(err) = self.add_player(Arc::clone(&session), map.as_deref(), &archetype) {
                    logging::log_error(&format!("add player failed: {}", err));
                    session.send_message(&format!("Could not join: {}", err));
                }
            }
            WorldRequest::RemovePlayer { owner } => {
                if let Err(err) = self.remove_owner(owner) {
                    logging::log_error(&format!("remove owner {} failed: {}", owner.0, err));
                }
            }
        }
    }

    fn deliver(&self, outbox: Outbox) {
        for delivery in outbox.deliveries {
            match delivery {
                Delivery::Message(session, text) => session.send_message(&text),
                Delivery::Status(session, kind, active) => session.send_status(kind, active),
            }
        }
        for (map, owner) in outbox.leaves {
            self.hooks.on_owner_leave(&map, owner);
        }
        for (map, owner) in outbox.joins {
            self.hooks.on_owner_join(&map, owner);
        }
        for name in &outbox.updated {
            self.hooks.on_update(name);
        }
        for (object, archetype, event) in &outbox.events {
            self.hooks.resolve_event(*object, archetype, event);
        }
        for (source, transfer) in outbox.transfers {
            let object = transfer.object;
            if let Err(err) = self.transfer(&source, transfer) {
                logging::log_error(&format!(
                    "transfer of {} from {} failed: {}",
                    object, source, err
                ));
            }
        }
    }

    /// Moves an object and everything it carries through an exit. On a
    /// target that cannot hold it the object stays where it was.
    fn transfer(&self, source: &str, transfer: MapTransfer) -> CoreResult<()> {
        let MapTransfer { object, target } = transfer;
        self.load_map(&target.map)?;
        let mut outbox = Outbox::default();
        {
            let mut active = lock(&self.active, "active maps")?;
            let mut roster = lock(&self.roster, "roster")?;
            let mut ids = lock(&self.ids, "ids")?;

            let (tree, origin) = {
                let map = active
                    .get_mut(source)
                    .ok_or_else(|| CoreError::UnknownMap(source.to_string()))?;
                let Some(origin) = map.object(object).and_then(Object::tile) else {
                    return Ok(());
                };
                (map.take_object_tree(object)?, origin)
            };
            let owner = tree.first().and_then(Object::owner);
            let dims = tree.first().map(Object::dimensions).unwrap_or_default();

            let fits = active
                .get(&target.map)
                .ok_or_else(|| CoreError::UnknownMap(target.map.clone()))
                .and_then(|map| map.fits(&Footprint::new(target.position, dims)));
            if let Err(err) = fits {
                if let Some(map) = active.get_mut(source) {
                    map.insert_object_tree(tree, origin)?;
                }
                return Err(err);
            }
            let departed: Vec<ObjectId> = tree.iter().map(Object::id).collect();
            if let Some(map) = active.get_mut(&target.map) {
                map.insert_object_tree(tree, target.position)?;
            }

            if let Some(owner) = owner {
                let is_player = roster.get(owner).is_some_and(Owner::is_player);
                if let Some(entry) = roster.get_mut(owner) {
                    entry.set_map(Some(target.map.clone()));
                }
                if let Some(map) = active.get_mut(source) {
                    map.remove_owner(owner, is_player);
                }
                outbox.leaves.push((source.to_string(), owner));
                outbox.joins.push((target.map.clone(), owner));
            }
            if let Some(map) = active.get_mut(source) {
                for id in departed {
                    map.mark_departed(id);
                }
                collect(source, map, &mut roster, &mut ids, &mut outbox);
            }
            if let Some(map) = active.get_mut(&target.map) {
                if let Some(owner) = owner {
                    let is_player = roster.get(owner).is_some_and(Owner::is_player);
                    map.add_owner(owner, is_player);
                    map.message_owner(owner, format!("You enter {}.", target.map));
                }
                movement::apply_support(map, object);
                collect(&target.map, map, &mut roster, &mut ids, &mut outbox);
            }
        }
        logging::log_game(&format!(
            "{} moved from {} to {}",
            object, source, target.map
        ));
        self.deliver(outbox);
        Ok(())
    }

    /// Puts empty sleepable maps to sleep and tears down expirable maps that
    /// were already asleep.
    pub fn maintenance_sweep(&self) -> CoreResult<SweepReport> {
        let mut report = SweepReport::default();
        {
            let mut inactive = lock(&self.inactive, "inactive maps")?;
            let mut active = lock(&self.active, "active maps")?;
            let mut roster = lock(&self.roster, "roster")?;
            let mut ids = lock(&self.ids, "ids")?;

            let expiring: Vec<String> = inactive
                .iter()
                .filter(|(_, map)| map.should_expire)
                .map(|(name, _)| name.clone())
                .collect();
            for name in expiring {
                let Some(mut map) = inactive.remove(&name) else {
                    continue;
                };
                for owner in map.owners() {
                    roster.detach(*owner);
                }
                let mut released = map.object_ids();
                released.extend(map.drain_released());
                report.freed_ids += ids.free_all(released);
                report.expired.push(name);
            }

            let sleeping: Vec<String> = active
                .iter()
                .filter(|(_, map)| map.should_sleep && map.player_count() == 0)
                .map(|(name, _)| name.clone())
                .collect();
            for name in sleeping {
                if let Some(mut map) = active.remove(&name) {
                    ids.free_all(map.drain_released());
                    inactive.insert(name.clone(), map);
                    report.slept.push(name);
                }
            }
        }
        report.expired.sort();
        for name in &report.slept {
            self.hooks.on_sleep(name);
        }
        if !report.slept.is_empty() || !report.expired.is_empty() {
            logging::log_game(&format!(
                "maintenance: slept [{}], expired [{}], freed {} ids",
                report.slept.join(", "),
                report.expired.join(", "),
                report.freed_ids
            ));
        }
        Ok(report)
    }

    /// Sets an AI owner's attitude toward an object.
    pub fn set_attitude(
        &self,
        owner: OwnerId,
        toward: ObjectId,
        attitude: crate::entities::owner::Attitude,
    ) -> CoreResult<bool> {
        self.with_owner(owner, |entry| entry.set_attitude(toward, attitude))
    }

    /// AI attitude lookup against the owner's current map.
    pub fn attitude(
        &self,
        owner: OwnerId,
        toward: ObjectId,
    ) -> CoreResult<crate::entities::owner::Attitude> {
        let active = lock(&self.active, "active maps")?;
        let mut roster = lock(&self.roster, "roster")?;
        let name = roster
            .get(owner)
            .ok_or(CoreError::UnknownOwner(owner))?
            .map()
            .map(str::to_string)
            .ok_or(CoreError::NilTarget)?;
        let map = active
            .get(&name)
            .ok_or(CoreError::UnknownMap(name.clone()))?;
        Ok(roster.attitude(owner, toward, map))
    }
}

/// Drains a map's queues: deletions reach the owners on the map at once,
/// released ids go back to the pool, and everything that calls out is
/// stashed in `outbox`.
fn collect(name: &str, map: &mut Map, roster: &mut Roster, ids: &mut IdMap, outbox: &mut Outbox) {
    for notice in map.drain_notices() {
        match notice {
            MapNotice::ObjectDeleted(id) => {
                for owner in map.owners() {
                    if let Some(owner) = roster.get_mut(*owner) {
                        owner.on_object_delete(id);
                    }
                }
            }
            MapNotice::Message { owner, text } => match roster.get(owner) {
                Some(entry) => match entry.session() {
                    Some(session) => outbox
                        .deliveries
                        .push(Delivery::Message(Arc::clone(session), text)),
                    None => entry.send_message(&text),
                },
                None => tracing::trace!(owner = owner.0, "message for unknown owner dropped"),
            },
            MapNotice::Status {
                owner,
                kind,
                active,
            } => {
                if let Some(session) = roster.get(owner).and_then(Owner::session) {
                    outbox
                        .deliveries
                        .push(Delivery::Status(Arc::clone(session), kind, active));
                }
            }
            MapNotice::Event {
                object,
                archetype,
                event,
            } => outbox.events.push((object, archetype, event)),
        }
    }
    ids.free_all(map.drain_released());
    outbox.transfers.extend(
        map.drain_transfers()
            .into_iter()
            .map(|transfer| (name.to_string(), transfer)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::AttackTarget;
    use crate::combat::damage::{DamageStyle, DamageTable};
    use crate::entities::archetype::{ExitTarget, ObjectType};
    use crate::entities::matter::Matter;
    use crate::entities::owner::Attitude;
    use crate::net::session::testing::RecordingSession;
    use crate::scripting::events::testing::RecordingHooks;
    use crate::world::position::Direction;
    use crate::world::template::{MapTemplate, TemplateIndex, TilePlacement};

    const TICK: Duration = Duration::from_millis(100);

    fn stone() -> Archetype {
        let mut stone = Archetype::new("stone", ObjectType::Block);
        stone.matter = Matter::SOLID;
        stone.blocking = Matter::SOLID;
        stone
    }

    fn templates() -> TemplateIndex {
        let mut index = TemplateIndex::new();
        index.insert_archetype(stone());
        let mut hero = Archetype::new("hero", ObjectType::Character);
        hero.matter = Matter::SOLID;
        hero.health = 10;
        hero.unarmed = DamageTable::new().with(DamageStyle::Blunt, 5.0);
        index.insert_archetype(hero);
        let mut portal = Archetype::new("portal", ObjectType::Exit);
        portal.exit = Some(ExitTarget {
            map: "cellar".to_string(),
            position: Position::new(0, 1, 0),
        });
        index.insert_archetype(portal);

        let ground = |x| TilePlacement {
            position: Position::new(0, x, 0),
            archetypes: vec!["stone".to_string()],
            brightness: None,
        };
        index.insert_map(MapTemplate {
            name: "meadow".to_string(),
            height: 2,
            width: 3,
            depth: 1,
            spawn: Position::new(1, 0, 0),
            should_sleep: false,
            should_expire: false,
            tiles: vec![
                ground(0),
                ground(1),
                ground(2),
                TilePlacement {
                    position: Position::new(1, 2, 0),
                    archetypes: vec!["portal".to_string()],
                    brightness: None,
                },
            ],
        });
        index.insert_map(MapTemplate {
            name: "cellar".to_string(),
            height: 1,
            width: 2,
            depth: 1,
            spawn: Position::new(0, 0, 0),
            should_sleep: true,
            should_expire: true,
            tiles: Vec::new(),
        });
        index
    }

    fn world(hooks: Arc<RecordingHooks>) -> World {
        let settings = WorldSettings {
            tick_length: TICK,
            default_map: "meadow".to_string(),
            rng_seed: Some(1),
            ..WorldSettings::default()
        };
        World::new(Arc::new(templates()), hooks, settings)
    }

    fn hero_position(world: &World, map: &str, owner: OwnerId) -> Option<Position> {
        let target = world.with_owner(owner, |entry| entry.target()).ok()??;
        world
            .with_map(map, |map| map.object(target).and_then(Object::tile))
            .ok()?
    }

    #[test]
    fn requests_are_drained_one_per_tick() {
        let hooks = Arc::new(RecordingHooks::default());
        let world = world(Arc::clone(&hooks));
        let first = Arc::new(RecordingSession::default());
        let second = Arc::new(RecordingSession::default());
        for session in [&first, &second] {
            world.submit(WorldRequest::AddPlayer {
                session: Arc::clone(session) as Arc<dyn Session>,
                map: None,
                archetype: "hero".to_string(),
            });
        }

        world.tick(TICK).expect("tick");
        assert_eq!(world.owner_count().expect("count"), 1);
        assert_eq!(first.owner(), Some(OwnerId(1)));
        assert_eq!(second.owner(), None);

        world.tick(TICK).expect("tick");
        assert_eq!(world.owner_count().expect("count"), 2);
        assert_eq!(second.owner(), Some(OwnerId(2)));
        assert!(hooks.calls().contains(&"join meadow 1".to_string()));
        assert_eq!(
            hero_position(&world, "meadow", OwnerId(1)),
            Some(Position::new(1, 0, 0))
        );
    }

    #[test]
    fn unknown_archetype_is_reported_to_the_session() {
        let world = world(Arc::new(RecordingHooks::default()));
        let session = Arc::new(RecordingSession::default());
        world.submit(WorldRequest::AddPlayer {
            session: Arc::clone(&session) as Arc<dyn Session>,
            map: None,
            archetype: "dragon".to_string(),
        });
        world.tick(TICK).expect("tick");
        assert_eq!(world.owner_count().expect("count"), 0);
        assert_eq!(session.owner(), None);
        assert_eq!(
            session.messages(),
            vec!["Could not join: unknown archetype \"dragon\"".to_string()]
        );
    }

    #[test]
    fn actions_resolve_after_windup_and_failures_are_messaged() {
        let world = world(Arc::new(RecordingHooks::default()));
        let session = Arc::new(RecordingSession::default());
        let owner = world
            .add_player(Arc::clone(&session) as Arc<dyn Session>, None, "hero")
            .expect("join");

        world
            .issue_action(owner, ActionKind::Move(Direction::East))
            .expect("issue");
        world
            .issue_action(owner, ActionKind::Move(Direction::West))
            .expect("issue");
        world
            .issue_action(owner, ActionKind::Move(Direction::West))
            .expect("issue");

        // 400 ms move: 100 ms windup, 300 ms recovery.
        let report = world.tick(TICK).expect("tick");
        assert_eq!(report.resolved, 1);
        assert_eq!(
            hero_position(&world, "meadow", owner),
            Some(Position::new(1, 1, 0))
        );
        assert!(world
            .with_owner(owner, |entry| entry.view_dirty())
            .expect("owner"));

        for _ in 0..3 {
            assert_eq!(world.tick(TICK).expect("tick").resolved, 0);
        }
        assert_eq!(world.tick(TICK).expect("tick").resolved, 1);
        for _ in 0..3 {
            world.tick(TICK).expect("tick");
        }
        let report = world.tick(TICK).expect("tick");
        assert_eq!(report.failed, 1);
        assert_eq!(
            hero_position(&world, "meadow", owner),
            Some(Position::new(1, 0, 0))
        );
        assert_eq!(
            session.messages(),
            vec!["position (1, 0, 0) is out of bounds".to_string()]
        );
    }

    #[test]
    fn exits_move_the_owner_between_maps() {
        let hooks = Arc::new(RecordingHooks::default());
        let world = world(Arc::clone(&hooks));
        let session = Arc::new(RecordingSession::default());
        let owner = world
            .add_player(Arc::clone(&session) as Arc<dyn Session>, None, "hero")
            .expect("join");

        world
            .issue_action(owner, ActionKind::Move(Direction::East))
            .expect("issue");
        world.tick(TICK).expect("tick");
        for _ in 0..3 {
            world.tick(TICK).expect("recover");
        }
        world
            .issue_action(owner, ActionKind::Move(Direction::East))
            .expect("issue");
        let report = world.tick(TICK).expect("tick");
        assert_eq!(report.transfers, 1);

        assert!(world.is_active("cellar").expect("active"));
        assert_eq!(
            world.with_owner(owner, |entry| entry.map().map(str::to_string)).expect("owner"),
            Some("cellar".to_string())
        );
        assert_eq!(
            hero_position(&world, "cellar", owner),
            Some(Position::new(0, 1, 0))
        );
        assert_eq!(world.with_map("meadow", Map::player_count).expect("meadow"), 0);
        assert_eq!(world.with_map("cellar", Map::player_count).expect("cellar"), 1);
        let calls = hooks.calls();
        assert!(calls.contains(&"leave meadow 1".to_string()));
        assert!(calls.contains(&"join cellar 1".to_string()));
        assert!(calls.iter().any(|call| call.starts_with("exit hero")));

        world.tick(TICK).expect("deliver");
        assert!(session.messages().contains(&"You enter cellar.".to_string()));
    }

    #[test]
    fn leaving_through_an_exit_clears_what_others_knew() {
        let world = world(Arc::new(RecordingHooks::default()));
        let owner = world
            .add_player(Arc::new(RecordingSession::default()), None, "hero")
            .expect("join");
        let hero = world
            .with_owner(owner, |entry| entry.target())
            .expect("owner")
            .expect("hero");

        world
            .issue_action(owner, ActionKind::Move(Direction::East))
            .expect("issue");
        for _ in 0..4 {
            world.tick(TICK).expect("tick");
        }
        let watcher = world
            .attach_ai("meadow", "hero", Some(Position::new(1, 0, 0)))
            .expect("ai");
        assert!(world.set_attitude(watcher, hero, Attitude::Hostile).expect("set"));

        world
            .issue_action(owner, ActionKind::Move(Direction::East))
            .expect("issue");
        assert_eq!(world.tick(TICK).expect("tick").transfers, 1);
        assert_eq!(hero_position(&world, "cellar", owner), Some(Position::new(0, 1, 0)));
        assert_eq!(world.with_owner(owner, |entry| entry.target()).expect("owner"), Some(hero));
        assert_eq!(
            world
                .with_owner(watcher, |entry| entry.cached_attitude(hero))
                .expect("watcher"),
            None
        );
    }

    #[test]
    fn owners_on_sleeping_maps_can_be_removed() {
        let hooks = Arc::new(RecordingHooks::default());
        let world = world(Arc::clone(&hooks));
        let ghost = world.attach_ai("cellar", "hero", None).expect("ai");
        let live = world.live_ids().expect("ids");

        let report = world.maintenance_sweep().expect("sweep");
        assert_eq!(report.slept, vec!["cellar".to_string()]);

        world.remove_owner(ghost).expect("remove");
        assert_eq!(world.owner_count().expect("count"), 0);
        assert_eq!(world.live_ids().expect("ids"), live - 1);
        assert!(hooks.calls().contains(&format!("leave cellar {}", ghost.0)));
    }

    #[test]
    fn empty_maps_sleep_then_expire() {
        let hooks = Arc::new(RecordingHooks::default());
        let world = world(Arc::clone(&hooks));
        world.load_map("meadow").expect("meadow");
        world.load_map("cellar").expect("cellar");
        let session = Arc::new(RecordingSession::default());
        let owner = world
            .add_player(Arc::clone(&session) as Arc<dyn Session>, Some("cellar"), "hero")
            .expect("join");
        let live = world.live_ids().expect("ids");

        let report = world.maintenance_sweep().expect("sweep");
        assert!(report.slept.is_empty());

        world.remove_owner(owner).expect("leave");
        assert_eq!(session.owner(), None);
        assert_eq!(world.live_ids().expect("ids"), live - 1);

        let report = world.maintenance_sweep().expect("sweep");
        assert_eq!(report.slept, vec!["cellar".to_string()]);
        assert!(report.expired.is_empty());
        assert_eq!(world.inactive_maps().expect("inactive"), vec!["cellar".to_string()]);

        world.load_map("cellar").expect("wake");
        assert!(world.is_active("cellar").expect("active"));
        world.maintenance_sweep().expect("sleep again");

        let report = world.maintenance_sweep().expect("sweep");
        assert_eq!(report.expired, vec!["cellar".to_string()]);
        assert!(world.inactive_maps().expect("inactive").is_empty());
        assert_eq!(world.active_maps().expect("active"), vec!["meadow".to_string()]);

        let calls = hooks.calls();
        assert!(calls.contains(&"sleep cellar".to_string()));
        assert!(calls.contains(&"wake cellar".to_string()));
        assert!(calls.contains(&"leave cellar 1".to_string()));
    }

    #[test]
    fn kills_release_ids_and_reach_the_hooks() {
        let hooks = Arc::new(RecordingHooks::default());
        let world = world(Arc::clone(&hooks));
        let player = world
            .add_player(Arc::new(RecordingSession::default()), None, "hero")
            .expect("join");
        let rat = world
            .attach_ai("meadow", "hero", Some(Position::new(1, 1, 0)))
            .expect("ai");
        let rat_object = world
            .with_owner(rat, |entry| entry.target())
            .expect("owner")
            .expect("target");
        let live = world.live_ids().expect("ids");

        // Two unarmed hits kill; the third attack is dropped with its target.
        for _ in 0..3 {
            world
                .issue_action(player, ActionKind::Attack(AttackTarget::Object(rat_object)))
                .expect("issue");
        }
        for _ in 0..40 {
            world.tick(TICK).expect("tick");
        }
        assert_eq!(world.live_ids().expect("ids"), live - 1);
        assert_eq!(world.with_owner(rat, |entry| entry.target()).expect("rat"), None);
        assert_eq!(
            world.with_owner(player, |entry| entry.pending_actions()).expect("player"),
            0
        );
        let deaths = hooks
            .calls()
            .iter()
            .filter(|call| call.starts_with("death hero"))
            .count();
        assert_eq!(deaths, 1);
    }

    #[test]
    fn cycles_reach_every_active_map() {
        let hooks = Arc::new(RecordingHooks::default());
        let settings = WorldSettings {
            tick_length: TICK,
            default_map: "meadow".to_string(),
            cycle_length: Duration::from_millis(200),
            cycles_per_season: 2,
            rng_seed: Some(3),
            ..WorldSettings::default()
        };
        let world = World::new(Arc::new(templates()), hooks.clone(), settings);
        world.load_map("meadow").expect("meadow");
        for _ in 0..4 {
            world.tick(TICK).expect("tick");
        }
        let calls = hooks.calls();
        assert!(calls.contains(&"cycle meadow 1".to_string()));
        assert!(calls.contains(&"cycle meadow 2".to_string()));
        assert!(calls.contains(&"season meadow 1".to_string()));
        assert_eq!(world.now().expect("now"), GameTick(4));
    }
}
