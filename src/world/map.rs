use crate::entities::archetype::{Archetype, ExitTarget};
use crate::entities::matter::Matter;
use crate::entities::object::{Object, ObjectId};
use crate::entities::owner::OwnerId;
use crate::error::{CoreError, CoreResult};
use crate::scripting::events::ObjectEvent;
use crate::status::{Status, StatusKind, StatusStep};
use crate::world::area::Footprint;
use crate::world::position::{Position, PositionDelta};
use crate::world::tile::Tile;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Something the world must relay once the map lock is released.
#[derive(Debug, Clone, PartialEq)]
pub enum MapNotice {
    /// Fanned out to every owner on the map.
    ObjectDeleted(ObjectId),
    Message {
        owner: OwnerId,
        text: String,
    },
    Status {
        owner: OwnerId,
        kind: StatusKind,
        active: bool,
    },
    Event {
        object: ObjectId,
        archetype: Arc<Archetype>,
        event: ObjectEvent,
    },
}

/// An object that stepped onto an exit and should move to another map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapTransfer {
    pub object: ObjectId,
    pub target: ExitTarget,
}

/// What lies directly underneath an object's footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Support {
    /// Something below blocks the object's matter.
    Supported,
    /// Nothing below blocks; the object can drop.
    Open,
    /// Part of the footprint rests on the bottom edge of the grid.
    Edge,
    /// The object is missing or not placed.
    Detached,
}

/// A 3D grid of tiles plus the objects and owners living on it.
///
/// Tiles are stored flat, indexed `(y * width + x) * depth + z`.
#[derive(Debug)]
pub struct Map {
    name: String,
    height: u16,
    width: u16,
    depth: u16,
    tiles: Vec<Tile>,
    objects: HashMap<ObjectId, Object>,
    owners: Vec<OwnerId>,
    pub should_sleep: bool,
    pub should_expire: bool,
    player_count: usize,
    update_time: u64,
    spawn: Position,
    notices: Vec<MapNotice>,
    released: Vec<ObjectId>,
    transfers: Vec<MapTransfer>,
}

impl Map {
    pub fn new(name: impl Into<String>, height: u16, width: u16, depth: u16) -> Self {
        Self {
            name: name.into(),
            height,
            width,
            depth,
            tiles: build_tiles(height, width, depth),
            objects: HashMap::new(),
            owners: Vec::new(),
            should_sleep: false,
            should_expire: false,
            player_count: 0,
            update_time: 0,
            spawn: Position::new(0, 0, 0),
            notices: Vec::new(),
            released: Vec::new(),
            transfers: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn depth(&self) -> u16 {
        self.depth
    }

    pub fn update_time(&self) -> u64 {
        self.update_time
    }

    fn touch(&mut self) {
        self.update_time = self.update_time.wrapping_add(1).max(self.update_time);
    }

    pub fn spawn(&self) -> Position {
        self.spawn
    }

    pub fn set_spawn(&mut self, spawn: Position) {
        self.spawn = spawn;
    }

    pub fn contains(&self, position: Position) -> bool {
        position.y < self.height && position.x < self.width && position.z < self.depth
    }

    fn index(&self, position: Position) -> Option<usize> {
        if !self.contains(position) {
            return None;
        }
        let (y, x, z) = (
            usize::from(position.y),
            usize::from(position.x),
            usize::from(position.z),
        );
        Some((y * usize::from(self.width) + x) * usize::from(self.depth) + z)
    }

    pub fn tile(&self, position: Position) -> Option<&Tile> {
        self.index(position).and_then(|index| self.tiles.get(index))
    }

    fn tile_mut(&mut self, position: Position) -> Option<&mut Tile> {
        let index = self.index(position)?;
        self.tiles.get_mut(index)
    }

    pub fn set_brightness(&mut self, position: Position, brightness: u8) -> CoreResult<()> {
        let tile = self
            .tile_mut(position)
            .ok_or(CoreError::OutOfBounds(position))?;
        tile.brightness = brightness;
        Ok(())
    }

    /// Grows or shrinks the grid, keeping every tile that still fits.
    pub fn resize(&mut self, height: u16, width: u16, depth: u16) -> CoreResult<()> {
        let fits = |position: Position| {
            position.y < height && position.x < width && position.z < depth
        };
        for object in self.objects.values() {
            if let Some(footprint) = object.footprint() {
                for cell in footprint.cells() {
                    match cell {
                        Some(position) if fits(position) => {}
                        other => {
                            return Err(CoreError::OutOfBounds(
                                other.unwrap_or_else(|| clamped_anchor(&footprint)),
                            ))
                        }
                    }
                }
            }
        }

        let mut tiles = build_tiles(height, width, depth);
        for tile in self.tiles.drain(..) {
            let position = tile.position;
            if fits(position) {
                let index = (usize::from(position.y) * usize::from(width)
                    + usize::from(position.x))
                    * usize::from(depth)
                    + usize::from(position.z);
                if let Some(slot) = tiles.get_mut(index) {
                    *slot = tile;
                }
            }
        }
        self.tiles = tiles;
        self.height = height;
        self.width = width;
        self.depth = depth;
        self.touch();
        Ok(())
    }

    pub fn object(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(&id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.objects.get_mut(&id)
    }

    pub fn contains_object(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn objects(&self) -> impl Iterator<Item = &Object> {
        self.objects.values()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn object_ids(&self) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = self.objects.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Objects on a tile, front of the stack first.
    pub fn objects_at(&self, position: Position) -> impl Iterator<Item = &Object> + '_ {
        self.tile(position)
            .map(|tile| tile.objects())
            .unwrap_or_default()
            .iter()
            .filter_map(move |id| self.objects.get(id))
    }

    /// Registers an object without placing it on any tile.
    pub fn add_object(&mut self, object: Object) -> ObjectId {
        let id = object.id();
        self.objects.insert(id, object);
        id
    }

    pub fn place_object(&mut self, id: ObjectId, position: Position) -> CoreResult<()> {
        self.place_object_at(id, position, None)
    }

    /// Places an object with its anchor at `position`; `index` positions it in
    /// the anchor tile's stack. Fails without mutating if any covered cell is
    /// outside the grid.
    pub fn place_object_at(
        &mut self,
        id: ObjectId,
        position: Position,
        index: Option<usize>,
    ) -> CoreResult<()> {
        let dims = self
            .objects
            .get(&id)
            .ok_or(CoreError::NilTarget)?
            .dimensions();
        let cells = self.cells_in_bounds(&Footprint::new(position, dims))?;
        self.detach(id);
        for cell in cells {
            let slot = if cell == position { index } else { None };
            if let Some(tile) = self.tile_mut(cell) {
                tile.insert(id, slot);
            }
        }
        if let Some(object) = self.objects.get_mut(&id) {
            object.set_tile(Some(position));
            object.set_parent(None);
        }
        self.touch();
        Ok(())
    }

    /// Shifts a placed object. No blocking check happens here.
    pub fn move_object(&mut self, id: ObjectId, delta: PositionDelta) -> CoreResult<()> {
        let footprint = self
            .objects
            .get(&id)
            .and_then(Object::footprint)
            .ok_or(CoreError::NilTarget)?;
        let target = footprint.shifted(delta);
        let cells = self.cells_in_bounds(&target)?;
        let anchor = target
            .anchor()
            .ok_or_else(|| CoreError::OutOfBounds(clamped_anchor(&target)))?;
        self.detach(id);
        for cell in cells {
            if let Some(tile) = self.tile_mut(cell) {
                tile.insert(id, None);
            }
        }
        if let Some(object) = self.objects.get_mut(&id) {
            object.set_tile(Some(anchor));
        }
        self.touch();
        Ok(())
    }

    /// Takes an object off its tiles but keeps it on the map.
    pub fn unplace_object(&mut self, id: ObjectId) -> CoreResult<()> {
        if !self.objects.contains_key(&id) {
            return Err(CoreError::NilTarget);
        }
        if self.detach(id) {
            if let Some(object) = self.objects.get_mut(&id) {
                object.set_tile(None);
            }
            self.touch();
        }
        Ok(())
    }

    /// Destroys an object and everything it carries. Owners on the map are
    /// told and the ids are queued for release.
    pub fn remove_object(&mut self, id: ObjectId) -> CoreResult<Object> {
        let object = self.take_object(id)?;
        for child in carried(&object) {
            if let Err(err) = self.remove_object(child) {
                tracing::debug!(object = child.0, "carried object already gone: {}", err);
            }
        }
        self.notices.push(MapNotice::ObjectDeleted(id));
        self.released.push(id);
        Ok(object)
    }

    /// Drops an object that never became visible, e.g. a failed spawn.
    pub(crate) fn discard_object(&mut self, id: ObjectId) {
        if self.take_object(id).is_ok() {
            self.released.push(id);
        }
    }

    fn take_object(&mut self, id: ObjectId) -> CoreResult<Object> {
        if self.detach(id) {
            self.touch();
        }
        let mut object = self.objects.remove(&id).ok_or(CoreError::NilTarget)?;
        object.set_tile(None);
        Ok(object)
    }

    /// Detaches an object and everything it carries for a move to another map.
    /// The root comes first.
    pub fn take_object_tree(&mut self, id: ObjectId) -> CoreResult<Vec<Object>> {
        let root = self.take_object(id)?;
        let mut pending = carried(&root);
        let mut tree = vec![root];
        while let Some(child) = pending.pop() {
            if let Ok(object) = self.take_object(child) {
                pending.extend(carried(&object));
                tree.push(object);
            }
        }
        Ok(tree)
    }

    /// Tells the owners still on the map that `id` left for another map. The
    /// id stays live.
    pub(crate) fn mark_departed(&mut self, id: ObjectId) {
        self.notices.push(MapNotice::ObjectDeleted(id));
    }

    /// Inverse of `take_object_tree`: registers every object and places the
    /// root at `position`.
    pub fn insert_object_tree(&mut self, tree: Vec<Object>, position: Position) -> CoreResult<()> {
        let root = tree.first().map(Object::id).ok_or(CoreError::NilTarget)?;
        let dims = tree[0].dimensions();
        self.cells_in_bounds(&Footprint::new(position, dims))?;
        for object in tree {
            self.add_object(object);
        }
        self.place_object(root, position)
    }

    fn detach(&mut self, id: ObjectId) -> bool {
        let Some(footprint) = self.objects.get(&id).and_then(Object::footprint) else {
            return false;
        };
        for cell in footprint.cells().flatten() {
            if let Some(tile) = self.tile_mut(cell) {
                tile.remove(id);
            }
        }
        true
    }

    fn cells_in_bounds(&self, footprint: &Footprint) -> CoreResult<Vec<Position>> {
        footprint
            .cells()
            .map(|cell| match cell {
                Some(position) if self.contains(position) => Ok(position),
                Some(position) => Err(CoreError::OutOfBounds(position)),
                None => Err(CoreError::OutOfBounds(clamped_anchor(footprint))),
            })
            .collect()
    }

    /// Checks that every cell of the footprint lies on the grid.
    pub fn fits(&self, footprint: &Footprint) -> CoreResult<()> {
        self.cells_in_bounds(footprint).map(|_| ())
    }

    /// Whether anything on the tile other than `ignore` blocks `matter`.
    pub fn tile_blocks(&self, position: Position, matter: Matter, ignore: Option<ObjectId>) -> bool {
        self.objects_at(position).any(|object| {
            Some(object.id()) != ignore && object.blocking().intersects(matter)
        })
    }

    /// First in-bounds cell of the footprint that blocks `matter`.
    pub fn footprint_blocked(
        &self,
        footprint: &Footprint,
        matter: Matter,
        ignore: Option<ObjectId>,
    ) -> Option<Position> {
        footprint
            .cells()
            .flatten()
            .filter(|cell| self.contains(*cell))
            .find(|cell| self.tile_blocks(*cell, matter, ignore))
    }

    pub fn support_below(&self, id: ObjectId) -> Support {
        let Some(object) = self.objects.get(&id) else {
            return Support::Detached;
        };
        let Some(footprint) = object.footprint() else {
            return Support::Detached;
        };
        let matter = object.matter();
        let mut edge = false;
        for cell in footprint.cells_below() {
            match cell.filter(|position| self.contains(*position)) {
                Some(position) => {
                    if self.tile_blocks(position, matter, Some(id)) {
                        return Support::Supported;
                    }
                }
                None => edge = true,
            }
        }
        if edge {
            Support::Edge
        } else {
            Support::Open
        }
    }

    /// Whether another object made of `matter` shares the object's footprint.
    pub fn footprint_has_matter(&self, id: ObjectId, matter: Matter) -> bool {
        let Some(footprint) = self.objects.get(&id).and_then(Object::footprint) else {
            return false;
        };
        let shared = footprint.cells().flatten().any(|cell| {
            self.objects_at(cell)
                .any(|other| other.id() != id && other.matter().intersects(matter))
        });
        shared
    }

    pub fn owners(&self) -> &[OwnerId] {
        &self.owners
    }

    pub fn player_count(&self) -> usize {
        self.player_count
    }

    pub fn add_owner(&mut self, owner: OwnerId, is_player: bool) {
        if self.owners.contains(&owner) {
            return;
        }
        self.owners.push(owner);
        if is_player {
            self.player_count += 1;
        }
    }

    pub fn remove_owner(&mut self, owner: OwnerId, is_player: bool) -> bool {
        let before = self.owners.len();
        self.owners.retain(|entry| *entry != owner);
        let removed = self.owners.len() != before;
        if removed && is_player {
            self.player_count = self.player_count.saturating_sub(1);
        }
        removed
    }

    /// Adds a status and tells the object's owner.
    pub fn attach_status(&mut self, id: ObjectId, status: Status) -> bool {
        let kind = status.kind();
        let Some(object) = self.objects.get_mut(&id) else {
            return false;
        };
        if !object.add_status(status) {
            return false;
        }
        if let Some(owner) = object.owner() {
            self.notices.push(MapNotice::Status {
                owner,
                kind,
                active: true,
            });
        }
        true
    }

    pub fn detach_status(&mut self, id: ObjectId, kind: StatusKind) -> bool {
        let Some(object) = self.objects.get_mut(&id) else {
            return false;
        };
        if !object.remove_status(kind) {
            return false;
        }
        if let Some(owner) = object.owner() {
            self.notices.push(MapNotice::Status {
                owner,
                kind,
                active: false,
            });
        }
        true
    }

    pub fn emit(&mut self, id: ObjectId, event: ObjectEvent) {
        if let Some(object) = self.objects.get(&id) {
            self.notices.push(MapNotice::Event {
                object: id,
                archetype: Arc::clone(object.archetype()),
                event,
            });
        }
    }

    pub fn message_owner(&mut self, owner: OwnerId, text: impl Into<String>) {
        self.notices.push(MapNotice::Message {
            owner,
            text: text.into(),
        });
    }

    pub fn message_object_owner(&mut self, id: ObjectId, text: impl Into<String>) {
        if let Some(owner) = self.objects.get(&id).and_then(Object::owner) {
            self.message_owner(owner, text);
        }
    }

    pub(crate) fn queue_transfer(&mut self, object: ObjectId, target: ExitTarget) {
        if !self.transfers.iter().any(|entry| entry.object == object) {
            self.transfers.push(MapTransfer { object, target });
        }
    }

    pub fn drain_notices(&mut self) -> Vec<MapNotice> {
        std::mem::take(&mut self.notices)
    }

    pub fn drain_released(&mut self) -> Vec<ObjectId> {
        std::mem::take(&mut self.released)
    }

    pub fn drain_transfers(&mut self) -> Vec<MapTransfer> {
        std::mem::take(&mut self.transfers)
    }

    /// Advances object timers and statuses by `delta`, in id order.
    pub fn update(&mut self, delta: Duration) {
        let mut due: Vec<ObjectId> = self
            .objects
            .values()
            .filter(|object| object.needs_update())
            .map(Object::id)
            .collect();
        due.sort();

        for id in due {
            let Some(object) = self.objects.get_mut(&id) else {
                continue;
            };
            object.update(delta);
            let statuses = object.take_statuses();
            if statuses.is_empty() {
                continue;
            }
            let siblings: Vec<StatusKind> = statuses.iter().map(Status::kind).collect();
            let mut kept = Vec::with_capacity(statuses.len());
            let mut finished = Vec::new();
            for mut status in statuses {
                match status.update(id, &siblings, self, delta) {
                    StatusStep::Keep => kept.push(status),
                    StatusStep::Remove => finished.push(status.kind()),
                }
            }
            let Some(object) = self.objects.get_mut(&id) else {
                continue;
            };
            object.restore_statuses(kept);
            if let Some(owner) = object.owner() {
                for kind in finished {
                    if !object.has_status(kind) {
                        self.notices.push(MapNotice::Status {
                            owner,
                            kind,
                            active: false,
                        });
                    }
                }
            }
        }
    }
}

fn build_tiles(height: u16, width: u16, depth: u16) -> Vec<Tile> {
    let mut tiles =
        Vec::with_capacity(usize::from(height) * usize::from(width) * usize::from(depth));
    for y in 0..height {
        for x in 0..width {
            for z in 0..depth {
                tiles.push(Tile::new(Position::new(y, x, z)));
            }
        }
    }
    tiles
}

fn clamped_anchor(footprint: &Footprint) -> Position {
    let clamp = |value: i32| value.clamp(0, i32::from(u16::MAX)) as u16;
    Position::new(clamp(footprint.y), clamp(footprint.x), clamp(footprint.z))
}

fn carried(object: &Object) -> Vec<ObjectId> {
    let mut ids: Vec<ObjectId> = object
        .inventory()
        .map(|container| container.contents().to_vec())
        .unwrap_or_default();
    if let Some(character) = object.character() {
        ids.extend(character.equipment.equipped().iter().copied());
    }
    ids
}
