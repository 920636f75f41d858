use crate::entities::object::ObjectId;
use crate::world::position::Position;

/// One grid cell. `objects[0]` is the front of the stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub position: Position,
    objects: Vec<ObjectId>,
    pub brightness: u8,
}

impl Tile {
    pub fn new(position: Position) -> Self {
        Self {
            position,
            objects: Vec::new(),
            brightness: 0,
        }
    }

    pub fn objects(&self) -> &[ObjectId] {
        &self.objects
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains(&id)
    }

    pub fn index_of(&self, id: ObjectId) -> Option<usize> {
        self.objects.iter().position(|entry| *entry == id)
    }

    /// Inserts at `index` (clamped to the stack height), or appends.
    /// An object already on the tile is left where it is.
    pub fn insert(&mut self, id: ObjectId, index: Option<usize>) -> bool {
        if self.contains(id) {
            return false;
        }
        match index {
            Some(index) => {
                let index = index.min(self.objects.len());
                self.objects.insert(index, id);
            }
            None => self.objects.push(id),
        }
        true
    }

    pub fn remove(&mut self, id: ObjectId) -> bool {
        match self.index_of(id) {
            Some(index) => {
                self.objects.remove(index);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_respects_index_and_clamps() {
        let mut tile = Tile::new(Position::new(0, 0, 0));
        assert!(tile.insert(ObjectId(1), None));
        assert!(tile.insert(ObjectId(2), None));
        assert!(tile.insert(ObjectId(3), Some(0)));
        assert!(tile.insert(ObjectId(4), Some(99)));
        assert_eq!(
            tile.objects(),
            &[ObjectId(3), ObjectId(1), ObjectId(2), ObjectId(4)]
        );
    }

    #[test]
    fn duplicate_insert_is_ignored() {
        let mut tile = Tile::new(Position::new(0, 0, 0));
        assert!(tile.insert(ObjectId(1), None));
        assert!(!tile.insert(ObjectId(1), Some(0)));
        assert_eq!(tile.objects().len(), 1);
    }

    #[test]
    fn remove_keeps_order_of_remaining() {
        let mut tile = Tile::new(Position::new(0, 0, 0));
        for id in 1..=3 {
            tile.insert(ObjectId(id), None);
        }
        assert!(tile.remove(ObjectId(2)));
        assert!(!tile.remove(ObjectId(2)));
        assert_eq!(tile.objects(), &[ObjectId(1), ObjectId(3)]);
    }
}
