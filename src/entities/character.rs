use crate::combat::damage::AttributeSet;
use crate::entities::archetype::Archetype;
use crate::entities::equipment::Equipment;
use crate::entities::skills::SkillBook;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stance {
    Standing,
    Crouching,
    Squeezed,
}

/// Actor payload: health, training and slot bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct Character {
    pub health: u32,
    pub max_health: u32,
    pub skills: SkillBook,
    pub attributes: AttributeSet,
    pub equipment: Equipment,
    pub stance: Stance,
}

impl Character {
    pub fn from_archetype(archetype: &Archetype) -> Self {
        let max_health = archetype.health.max(1);
        Self {
            health: max_health,
            max_health,
            skills: archetype.training.clone(),
            attributes: archetype.attributes.clone(),
            equipment: Equipment::new(archetype.slots.clone()),
            stance: Stance::Standing,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Returns the amount actually removed.
    pub fn apply_damage(&mut self, amount: u32) -> u32 {
        let applied = amount.min(self.health);
        self.health -= applied;
        applied
    }

    pub fn heal(&mut self, amount: u32) -> u32 {
        let before = self.health;
        self.health = self.health.saturating_add(amount).min(self.max_health);
        self.health - before
    }
}
