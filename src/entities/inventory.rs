use crate::entities::object::ObjectId;
use crate::error::{CoreError, CoreResult};

/// Volume-bounded container capability of an object.
///
/// `volume` is the remaining capacity in height×width×depth units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    contents: Vec<ObjectId>,
    volume: u64,
    max_volume: u64,
}

impl Container {
    pub fn new(max_volume: u64) -> Self {
        Self {
            contents: Vec::new(),
            volume: max_volume,
            max_volume,
        }
    }

    pub fn contents(&self) -> &[ObjectId] {
        &self.contents
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.contents.contains(&id)
    }

    pub fn volume(&self) -> u64 {
        self.volume
    }

    pub fn max_volume(&self) -> u64 {
        self.max_volume
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Checks capacity without mutating, so callers can validate a multi-step
    /// transfer before touching anything.
    pub fn can_add(&self, id: ObjectId, object_volume: u64) -> CoreResult<()> {
        if self.contains(id) {
            return Err(CoreError::AlreadyInInventory(id));
        }
        if object_volume > self.volume {
            return Err(CoreError::TooLarge {
                id,
                needed: object_volume,
                remaining: self.volume,
            });
        }
        Ok(())
    }

    pub fn add(&mut self, id: ObjectId, object_volume: u64) -> CoreResult<()> {
        self.can_add(id, object_volume)?;
        self.contents.push(id);
        self.volume -= object_volume;
        Ok(())
    }

    pub fn remove(&mut self, id: ObjectId, object_volume: u64) -> CoreResult<()> {
        let index = self
            .contents
            .iter()
            .position(|entry| *entry == id)
            .ok_or(CoreError::MissingInInventory(id))?;
        self.contents.remove(index);
        self.volume = self.volume.saturating_add(object_volume).min(self.max_volume);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_consumes_volume() {
        let mut container = Container::new(10);
        container.add(ObjectId(1), 4).expect("add");
        container.add(ObjectId(2), 6).expect("add");
        assert_eq!(container.volume(), 0);
        assert_eq!(container.contents(), &[ObjectId(1), ObjectId(2)]);
    }

    #[test]
    fn too_large_leaves_container_unchanged() {
        let mut container = Container::new(5);
        container.add(ObjectId(1), 3).expect("add");
        let before = container.clone();
        let err = container.add(ObjectId(2), 3).expect_err("too large");
        assert_eq!(
            err,
            CoreError::TooLarge {
                id: ObjectId(2),
                needed: 3,
                remaining: 2
            }
        );
        assert_eq!(container, before);
    }

    #[test]
    fn duplicate_add_is_rejected() {
        let mut container = Container::new(5);
        container.add(ObjectId(1), 1).expect("add");
        assert_eq!(
            container.add(ObjectId(1), 1),
            Err(CoreError::AlreadyInInventory(ObjectId(1)))
        );
        assert_eq!(container.volume(), 4);
    }

    #[test]
    fn remove_restores_volume() {
        let mut container = Container::new(5);
        container.add(ObjectId(1), 2).expect("add");
        container.remove(ObjectId(1), 2).expect("remove");
        assert_eq!(container.volume(), 5);
        assert_eq!(
            container.remove(ObjectId(1), 2),
            Err(CoreError::MissingInInventory(ObjectId(1)))
        );
    }
}
