use crate::entities::object::ObjectId;
use crate::error::{CoreError, CoreResult};
use std::collections::HashSet;

/// Hands out object identities, reusing freed ones before minting new ones.
#[derive(Debug)]
pub struct IdMap {
    next: u32,
    free: Vec<ObjectId>,
    free_set: HashSet<ObjectId>,
    live: usize,
}

impl Default for IdMap {
    fn default() -> Self {
        Self::new()
    }
}

impl IdMap {
    pub fn new() -> Self {
        // 0 stays reserved as "unassigned".
        Self {
            next: 1,
            free: Vec::new(),
            free_set: HashSet::new(),
            live: 0,
        }
    }

    /// Fails once every id below `u32::MAX` is live.
    pub fn acquire(&mut self) -> CoreResult<ObjectId> {
        if let Some(id) = self.free.pop() {
            self.free_set.remove(&id);
            self.live += 1;
            return Ok(id);
        }
        let id = ObjectId(self.next);
        self.next = self.next.checked_add(1).ok_or(CoreError::IdsExhausted)?;
        self.live += 1;
        Ok(id)
    }

    /// Returns `false` for ids that were never handed out or are already free.
    pub fn free(&mut self, id: ObjectId) -> bool {
        if !id.is_assigned() || id.0 >= self.next || self.free_set.contains(&id) {
            return false;
        }
        self.free.push(id);
        self.free_set.insert(id);
        self.live = self.live.saturating_sub(1);
        true
    }

    pub fn free_all<I: IntoIterator<Item = ObjectId>>(&mut self, ids: I) -> usize {
        ids.into_iter().filter(|id| self.free(*id)).count()
    }

    pub fn live_count(&self) -> usize {
        self.live
    }

    pub fn is_free(&self, id: ObjectId) -> bool {
        self.free_set.contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_start_at_one_and_increase() {
        let mut ids = IdMap::new();
        assert_eq!(ids.acquire().expect("id"), ObjectId(1));
        assert_eq!(ids.acquire().expect("id"), ObjectId(2));
        assert_eq!(ids.live_count(), 2);
    }

    #[test]
    fn freed_id_is_reused_before_counter_advances() {
        let mut ids = IdMap::new();
        let first = ids.acquire().expect("id");
        let second = ids.acquire().expect("id");
        assert!(ids.free(first));
        assert_eq!(ids.acquire().expect("id"), first);
        assert_eq!(ids.acquire().expect("id"), ObjectId(second.0 + 1));
    }

    #[test]
    fn double_free_and_unknown_ids_are_rejected() {
        let mut ids = IdMap::new();
        let id = ids.acquire().expect("id");
        assert!(ids.free(id));
        assert!(!ids.free(id));
        assert!(!ids.free(ObjectId(0)));
        assert!(!ids.free(ObjectId(42)));
        assert_eq!(ids.live_count(), 0);
    }

    #[test]
    fn most_recently_freed_id_comes_back_first() {
        let mut ids = IdMap::new();
        let a = ids.acquire().expect("id");
        let b = ids.acquire().expect("id");
        assert_eq!(ids.free_all([a, b]), 2);
        assert_eq!(ids.acquire().expect("id"), b);
        assert_eq!(ids.acquire().expect("id"), a);
        assert!(!ids.is_free(a));
    }

    #[test]
    fn exhausted_counter_is_an_error() {
        let mut ids = IdMap {
            next: u32::MAX - 1,
            ..IdMap::new()
        };
        assert_eq!(ids.acquire(), Ok(ObjectId(u32::MAX - 1)));
        assert_eq!(ids.acquire(), Err(CoreError::IdsExhausted));
        assert_eq!(ids.acquire(), Err(CoreError::IdsExhausted));
        assert_eq!(ids.live_count(), 1);

        assert!(ids.free(ObjectId(u32::MAX - 1)));
        assert_eq!(ids.acquire(), Ok(ObjectId(u32::MAX - 1)));
    }
}
