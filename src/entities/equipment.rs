use crate::entities::object::ObjectId;
use crate::error::{CoreError, CoreResult};
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Head,
    Neck,
    Torso,
    Back,
    Arm,
    Hand,
    Finger,
    Waist,
    Leg,
    Foot,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct SlotCounts(BTreeMap<Slot, u32>);

impl SlotCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, slot: Slot, count: u32) -> Self {
        self.0.insert(slot, count);
        self
    }

    pub fn get(&self, slot: Slot) -> u32 {
        self.0.get(&slot).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Slot, u32)> + '_ {
        self.0.iter().map(|(slot, count)| (*slot, *count))
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|count| *count == 0)
    }

    fn subtract(&mut self, other: &SlotCounts) {
        for (slot, count) in other.iter() {
            let entry = self.0.entry(slot).or_insert(0);
            *entry = entry.saturating_sub(count);
        }
    }

    fn restore(&mut self, other: &SlotCounts, limit: &SlotCounts) {
        for (slot, count) in other.iter() {
            let entry = self.0.entry(slot).or_insert(0);
            *entry = entry.saturating_add(count).min(limit.get(slot));
        }
    }
}

/// Bounds on the wearer's *total* slot counts. Slots absent from `max` are
/// unbounded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SlotNeeds {
    #[serde(default)]
    pub min: SlotCounts,
    #[serde(default)]
    pub max: SlotCounts,
}

/// What an equipable object asks of its wearer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SlotRequirements {
    #[serde(default)]
    pub uses: SlotCounts,
    #[serde(default)]
    pub needs: SlotNeeds,
}

/// Slot bookkeeping of a wearer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Equipment {
    total: SlotCounts,
    free: SlotCounts,
    equipped: Vec<ObjectId>,
}

impl Equipment {
    pub fn new(total: SlotCounts) -> Self {
        Self {
            free: total.clone(),
            total,
            equipped: Vec::new(),
        }
    }

    pub fn total(&self) -> &SlotCounts {
        &self.total
    }

    pub fn free(&self) -> &SlotCounts {
        &self.free
    }

    pub fn equipped(&self) -> &[ObjectId] {
        &self.equipped
    }

    pub fn is_equipped(&self, id: ObjectId) -> bool {
        self.equipped.contains(&id)
    }

    pub fn can_equip(&self, id: ObjectId, requirements: &SlotRequirements) -> CoreResult<()> {
        if self.is_equipped(id) {
            return Err(CoreError::CannotEquip(id));
        }
        let uses_fit = requirements
            .uses
            .iter()
            .all(|(slot, count)| self.free.get(slot) >= count);
        let min_met = requirements
            .needs
            .min
            .iter()
            .all(|(slot, count)| self.total.get(slot) >= count);
        let max_met = requirements
            .needs
            .max
            .iter()
            .all(|(slot, count)| self.total.get(slot) <= count);
        if uses_fit && min_met && max_met {
            Ok(())
        } else {
            Err(CoreError::CannotEquip(id))
        }
    }

    pub fn equip(&mut self, id: ObjectId, requirements: &SlotRequirements) -> CoreResult<()> {
        self.can_equip(id, requirements)?;
        self.free.subtract(&requirements.uses);
        self.equipped.push(id);
        Ok(())
    }

    pub fn unequip(&mut self, id: ObjectId, requirements: &SlotRequirements) -> CoreResult<()> {
        let index = self
            .equipped
            .iter()
            .position(|entry| *entry == id)
            .ok_or(CoreError::NotEquipped(id))?;
        self.equipped.remove(index);
        self.free.restore(&requirements.uses, &self.total);
        Ok(())
    }
}
