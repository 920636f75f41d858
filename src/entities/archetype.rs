use crate::combat::damage::{AttributeSet, CombatProfile, DamageTable};
use crate::entities::equipment::{SlotCounts, SlotRequirements};
use crate::entities::matter::Matter;
use crate::entities::skills::SkillBook;
use crate::world::area::Dimensions;
use crate::world::position::Position;
use serde::Deserialize;

/// Type discriminant of an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    Character,
    Block,
    Item,
    Weapon,
    Shield,
    Armor,
    Exit,
    Food,
    Flora,
    Audio,
    Skill,
    Generic,
    Special,
}

impl ObjectType {
    pub fn is_equipable(self) -> bool {
        matches!(self, ObjectType::Weapon | ObjectType::Shield | ObjectType::Armor)
    }

    fn portable_by_default(self) -> bool {
        matches!(
            self,
            ObjectType::Item
                | ObjectType::Weapon
                | ObjectType::Shield
                | ObjectType::Armor
                | ObjectType::Food
                | ObjectType::Audio
                | ObjectType::Skill
                | ObjectType::Generic
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExitTarget {
    pub map: String,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct FoodProfile {
    #[serde(default)]
    pub nutrition: u32,
    /// Milliseconds until the food spoils; 0 never spoils.
    #[serde(default)]
    pub shelf_life_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AudioProfile {
    pub loop_ms: u64,
    #[serde(default)]
    pub volume: u8,
}

/// Immutable template an object is instantiated from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Archetype {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ObjectType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub dimensions: Dimensions,
    #[serde(default)]
    pub matter: Matter,
    #[serde(default)]
    pub blocking: Matter,
    #[serde(default)]
    pub portable: Option<bool>,
    /// Container capacity in volume units.
    #[serde(default)]
    pub capacity: Option<u64>,
    /// Total equipment slots of a wearer.
    #[serde(default)]
    pub slots: SlotCounts,
    #[serde(default)]
    pub requirements: SlotRequirements,
    #[serde(default)]
    pub damage: Option<CombatProfile>,
    #[serde(default)]
    pub armor: Option<CombatProfile>,
    #[serde(default)]
    pub unarmed: DamageTable,
    #[serde(default)]
    pub health: u32,
    #[serde(default)]
    pub attributes: AttributeSet,
    #[serde(default)]
    pub training: SkillBook,
    /// Base cost of one movement step, in milliseconds.
    #[serde(default)]
    pub move_cost_ms: Option<u64>,
    #[serde(default)]
    pub attack_cost_ms: Option<u64>,
    #[serde(default)]
    pub exit: Option<ExitTarget>,
    #[serde(default)]
    pub food: Option<FoodProfile>,
    #[serde(default)]
    pub audio: Option<AudioProfile>,
    /// Skill a skill object teaches.
    #[serde(default)]
    pub teaches: Option<String>,
}

impl Archetype {
    pub fn new(name: impl Into<String>, kind: ObjectType) -> Self {
        Self {
            name: name.into(),
            kind,
            description: String::new(),
            dimensions: Dimensions::default(),
            matter: Matter::NONE,
            blocking: Matter::NONE,
            portable: None,
            capacity: None,
            slots: SlotCounts::default(),
            requirements: SlotRequirements::default(),
            damage: None,
            armor: None,
            unarmed: DamageTable::default(),
            health: 0,
            attributes: AttributeSet::default(),
            training: SkillBook::default(),
            move_cost_ms: None,
            attack_cost_ms: None,
            exit: None,
            food: None,
            audio: None,
            teaches: None,
        }
    }

    pub fn is_portable(&self) -> bool {
        self.portable
            .unwrap_or_else(|| self.kind.portable_by_default())
    }

    pub fn volume(&self) -> u64 {
        self.dimensions.volume()
    }

    pub fn reach(&self) -> u32 {
        self.damage.as_ref().map_or(1, |profile| profile.reach.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::damage::DamageStyle;
    use crate::entities::equipment::Slot;

    #[test]
    fn archetype_deserializes_with_defaults() {
        let yaml = r#"
name: short sword
type: weapon
description: A plain short sword.
dimensions: { height: 1, width: 1, depth: 2 }
matter: [solid]
requirements:
  uses: { hand: 1 }
damage:
  category: physical
  values: { slash: 3.0, pierce: 1.0 }
  skills: [sword]
"#;
        let archetype: Archetype = serde_yaml::from_str(yaml).expect("parse");
        assert_eq!(archetype.kind, ObjectType::Weapon);
        assert_eq!(archetype.volume(), 2);
        assert!(archetype.is_portable());
        assert_eq!(archetype.requirements.uses.get(Slot::Hand), 1);
        let damage = archetype.damage.expect("damage");
        assert_eq!(damage.values.get(DamageStyle::Slash), 3.0);
        assert_eq!(damage.reach, 1);
        assert!(archetype.blocking.is_empty());
    }

    #[test]
    fn blocks_are_not_portable_by_default() {
        let archetype = Archetype::new("stone", ObjectType::Block);
        assert!(!archetype.is_portable());
        let mut override_portable = archetype.clone();
        override_portable.portable = Some(true);
        assert!(override_portable.is_portable());
    }
}
