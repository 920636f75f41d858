use crate::actions::Action;
use crate::entities::object::ObjectId;
use crate::net::session::Session;
use crate::status::StatusKind;
use crate::world::map::Map;
use lru::LruCache;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_ATTITUDE_CACHE: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Attitude {
    #[default]
    None,
    Friendly,
    Neutral,
    Hostile,
}

pub enum Controller {
    Player(Arc<dyn Session>),
    Ai(LruCache<ObjectId, Attitude>),
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Controller::Player(_) => f.write_str("Player"),
            Controller::Ai(cache) => write!(f, "Ai({} cached)", cache.len()),
        }
    }
}

/// Controller of one target object: a connected player or an AI.
#[derive(Debug)]
pub struct Owner {
    id: OwnerId,
    controller: Controller,
    target: Option<ObjectId>,
    map: Option<String>,
    actions: VecDeque<Action>,
    recovery: Duration,
    last_seen_update_time: u64,
    view_dirty: bool,
}

impl Owner {
    pub fn player(id: OwnerId, session: Arc<dyn Session>) -> Self {
        Self::with_controller(id, Controller::Player(session))
    }

    pub fn ai(id: OwnerId, cache_size: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::MIN);
        Self::with_controller(id, Controller::Ai(LruCache::new(capacity)))
    }

    fn with_controller(id: OwnerId, controller: Controller) -> Self {
        Self {
            id,
            controller,
            target: None,
            map: None,
            actions: VecDeque::new(),
            recovery: Duration::ZERO,
            last_seen_update_time: 0,
            view_dirty: true,
        }
    }

    pub fn id(&self) -> OwnerId {
        self.id
    }

    pub fn is_player(&self) -> bool {
        matches!(self.controller, Controller::Player(_))
    }

    pub fn session(&self) -> Option<&Arc<dyn Session>> {
        match &self.controller {
            Controller::Player(session) => Some(session),
            Controller::Ai(_) => None,
        }
    }

    pub fn target(&self) -> Option<ObjectId> {
        self.target
    }

    pub fn set_target(&mut self, target: Option<ObjectId>) {
        self.target = target;
        self.view_dirty = true;
    }

    pub fn map(&self) -> Option<&str> {
        self.map.as_deref()
    }

    pub fn set_map(&mut self, map: Option<String>) {
        self.map = map;
        self.last_seen_update_time = 0;
        self.view_dirty = true;
    }

    pub fn queue_action(&mut self, action: Action) {
        self.actions.push_back(action);
    }

    pub fn pending_actions(&self) -> usize {
        self.actions.len()
    }

    pub fn clear_actions(&mut self) {
        self.actions.clear();
        self.recovery = Duration::ZERO;
    }

    pub fn recovery(&self) -> Duration {
        self.recovery
    }

    /// Advances recovery, then the front action. Returns the front action once
    /// its windup has elapsed; its recovery gates the next one.
    pub fn advance(&mut self, delta: Duration) -> Option<Action> {
        let spent = self.recovery.min(delta);
        self.recovery -= spent;
        if !self.recovery.is_zero() {
            return None;
        }
        let budget = delta - spent;
        let front = self.actions.front_mut()?;
        if !front.advance(budget) {
            return None;
        }
        let action = self.actions.pop_front()?;
        self.recovery = action.recovery();
        Some(action)
    }

    /// Called once per tick with the elapsed time and the map's topology
    /// counter.
    pub fn on_map_update(&mut self, _delta: Duration, update_time: u64) {
        if update_time != self.last_seen_update_time {
            self.last_seen_update_time = update_time;
            self.view_dirty = true;
        }
    }

    pub fn on_object_delete(&mut self, id: ObjectId) {
        if self.target == Some(id) {
            self.target = None;
            self.actions.clear();
        } else {
            self.actions.retain(|action| action.subject() != Some(id));
        }
        if let Controller::Ai(cache) = &mut self.controller {
            cache.pop(&id);
        }
        self.view_dirty = true;
    }

    pub fn view_dirty(&self) -> bool {
        self.view_dirty
    }

    /// Clears and returns the dirty flag.
    pub fn take_view_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.view_dirty, false)
    }

    pub fn send_message(&self, message: &str) {
        match &self.controller {
            Controller::Player(session) => session.send_message(message),
            Controller::Ai(_) => tracing::trace!(owner = self.id.0, "ai message: {}", message),
        }
    }

    pub fn send_status(&self, status: StatusKind, active: bool) {
        if let Controller::Player(session) = &self.controller {
            session.send_status(status, active);
        }
    }

    pub fn set_attitude(&mut self, toward: ObjectId, attitude: Attitude) -> bool {
        match &mut self.controller {
            Controller::Ai(cache) => {
                cache.put(toward, attitude);
                true
            }
            Controller::Player(_) => false,
        }
    }

    pub fn cached_attitude(&self, toward: ObjectId) -> Option<Attitude> {
        match &self.controller {
            Controller::Ai(cache) => cache.peek(&toward).copied(),
            Controller::Player(_) => None,
        }
    }
}

/// Every owner known to the world, keyed by id.
#[derive(Debug)]
pub struct Roster {
    next: u32,
    owners: HashMap<OwnerId, Owner>,
    attitude_cache_size: usize,
}

impl Default for Roster {
    fn default() -> Self {
        Self::new(DEFAULT_ATTITUDE_CACHE)
    }
}

impl Roster {
    pub fn new(attitude_cache_size: usize) -> Self {
        Self {
            next: 1,
            owners: HashMap::new(),
            attitude_cache_size,
        }
    }

    fn next_id(&mut self) -> OwnerId {
        let id = OwnerId(self.next);
        self.next = self.next.wrapping_add(1).max(1);
        id
    }

    pub fn add_player(&mut self, session: Arc<dyn Session>) -> OwnerId {
        let id = self.next_id();
        session.set_owner(Some(id));
        self.owners.insert(id, Owner::player(id, session));
        id
    }

    pub fn add_ai(&mut self) -> OwnerId {
        let id = self.next_id();
        self.owners
            .insert(id, Owner::ai(id, self.attitude_cache_size));
        id
    }

    pub fn remove(&mut self, id: OwnerId) -> Option<Owner> {
        let owner = self.detach(id)?;
        if let Some(session) = owner.session() {
            session.set_owner(None);
        }
        Some(owner)
    }

    /// Removes an owner without telling its session; the caller does that
    /// once its locks are released.
    pub(crate) fn detach(&mut self, id: OwnerId) -> Option<Owner> {
        self.owners.remove(&id)
    }

    pub fn get(&self, id: OwnerId) -> Option<&Owner> {
        self.owners.get(&id)
    }

    pub fn get_mut(&mut self, id: OwnerId) -> Option<&mut Owner> {
        self.owners.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Sorted so per-tick processing order is stable.
    pub fn ids(&self) -> Vec<OwnerId> {
        let mut ids: Vec<OwnerId> = self.owners.keys().copied().collect();
        ids.sort();
        ids
    }

    /// AI attitude toward an object, filled lazily from the reciprocal view
    /// of the object's own owner. Players and unknown targets read as `None`.
    pub fn attitude(&mut self, owner: OwnerId, toward: ObjectId, map: &Map) -> Attitude {
        let (own_target, cached) = match self.owners.get_mut(&owner) {
            Some(entry) => match &mut entry.controller {
                Controller::Ai(cache) => (entry.target, cache.get(&toward).copied()),
                Controller::Player(_) => return Attitude::None,
            },
            None => return Attitude::None,
        };
        if let Some(attitude) = cached {
            return attitude;
        }
        let reciprocal = own_target
            .zip(map.object(toward).and_then(|object| object.owner()))
            .and_then(|(own_target, other)| {
                self.owners
                    .get(&other)
                    .and_then(|other| other.cached_attitude(own_target))
            })
            .unwrap_or_default();
        if let Some(entry) = self.owners.get_mut(&owner) {
            entry.set_attitude(toward, reciprocal);
        }
        reciprocal
    }
}
