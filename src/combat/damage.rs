use crate::entities::skills::SkillBook;
use crate::error::{CoreError, CoreResult};
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackCategory {
    Physical,
    Arcane,
    Spirit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageStyle {
    Blunt,
    Pierce,
    Slash,
    Fire,
    Cold,
    Lightning,
    Holy,
    Unholy,
}

impl DamageStyle {
    pub const ALL: [DamageStyle; 8] = [
        DamageStyle::Blunt,
        DamageStyle::Pierce,
        DamageStyle::Slash,
        DamageStyle::Fire,
        DamageStyle::Cold,
        DamageStyle::Lightning,
        DamageStyle::Holy,
        DamageStyle::Unholy,
    ];

    pub fn category(self) -> AttackCategory {
        match self {
            DamageStyle::Blunt | DamageStyle::Pierce | DamageStyle::Slash => {
                AttackCategory::Physical
            }
            DamageStyle::Fire | DamageStyle::Cold | DamageStyle::Lightning => {
                AttackCategory::Arcane
            }
            DamageStyle::Holy | DamageStyle::Unholy => AttackCategory::Spirit,
        }
    }
}

/// Per-style amounts, used for both damage and armor.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct DamageTable(BTreeMap<DamageStyle, f64>);

impl DamageTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, style: DamageStyle, amount: f64) -> Self {
        self.set(style, amount);
        self
    }

    pub fn get(&self, style: DamageStyle) -> f64 {
        self.0.get(&style).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, style: DamageStyle, amount: f64) {
        self.0.insert(style, amount);
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|amount| *amount == 0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (DamageStyle, f64)> + '_ {
        self.0.iter().map(|(style, amount)| (*style, *amount))
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self(
            self.0
                .iter()
                .map(|(style, amount)| (*style, amount * factor))
                .collect(),
        )
    }

    pub fn add(&mut self, other: &DamageTable) {
        for (style, amount) in other.iter() {
            *self.0.entry(style).or_insert(0.0) += amount;
        }
    }

    /// Equal-style subtraction, floored at zero per style.
    pub fn mitigated_by(&self, armor: &DamageTable) -> Self {
        Self(
            self.0
                .iter()
                .map(|(style, amount)| (*style, (amount - armor.get(*style)).max(0.0)))
                .collect(),
        )
    }

    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }
}

/// Attribute-derived bonuses for one attack category.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CategoryAttributes {
    #[serde(default)]
    pub damage: DamageTable,
    #[serde(default)]
    pub armor: DamageTable,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct AttributeSet(BTreeMap<AttackCategory, CategoryAttributes>);

impl AttributeSet {
    pub fn category(&self, category: AttackCategory) -> Option<&CategoryAttributes> {
        self.0.get(&category)
    }

    pub fn set(&mut self, category: AttackCategory, attributes: CategoryAttributes) {
        self.0.insert(category, attributes);
    }

    pub fn damage_bonus(&self, category: AttackCategory) -> DamageTable {
        self.category(category)
            .map(|attrs| attrs.damage.clone())
            .unwrap_or_default()
    }

    pub fn armor_bonus(&self, category: AttackCategory) -> DamageTable {
        self.category(category)
            .map(|attrs| attrs.armor.clone())
            .unwrap_or_default()
    }
}

/// Damage or armor definition carried by an archetype.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CombatProfile {
    pub category: AttackCategory,
    #[serde(default)]
    pub values: DamageTable,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub competencies: Vec<String>,
    #[serde(default = "default_reach")]
    pub reach: u32,
}

fn default_reach() -> u32 {
    1
}

/// Average skill level times the competency factor.
///
/// Average skill level is the mean of the floored experience of every
/// required skill; the competency factor is `0.5 + average_efficiency / 2`.
/// Either term is 1 when the profile requires nothing.
pub fn proficiency_scale(book: &SkillBook, profile: &CombatProfile) -> CoreResult<f64> {
    let skill_average = if profile.skills.is_empty() {
        1.0
    } else {
        let mut sum = 0.0;
        for skill in &profile.skills {
            let level = book
                .level(skill)
                .ok_or_else(|| CoreError::MissingSkill(skill.clone()))?;
            sum += f64::from(level);
        }
        sum / profile.skills.len() as f64
    };

    let competency_factor = if profile.competencies.is_empty() {
        1.0
    } else {
        let mut sum = 0.0;
        for competency in &profile.competencies {
            sum += book
                .efficiency(competency)
                .ok_or_else(|| CoreError::MissingCompetency(competency.clone()))?;
        }
        0.5 + (sum / profile.competencies.len() as f64) / 2.0
    };

    Ok(skill_average * competency_factor)
}

pub fn weapon_damage(
    book: &SkillBook,
    attributes: &AttributeSet,
    profile: &CombatProfile,
) -> CoreResult<DamageTable> {
    let scale = proficiency_scale(book, profile)?;
    let mut damage = profile.values.scaled(scale);
    damage.add(&attributes.damage_bonus(profile.category));
    Ok(damage)
}

/// Combined armor of every worn piece against an attack of `category`.
///
/// Each piece is scaled by the wearer's proficiency, so a piece the wearer
/// lacks a skill or competency for fails the whole calculation. The wearer's
/// attribute armor for the attack category is added once.
pub fn armor_value(
    book: &SkillBook,
    attributes: &AttributeSet,
    pieces: &[&CombatProfile],
    category: AttackCategory,
) -> CoreResult<DamageTable> {
    let mut armor = DamageTable::new();
    for piece in pieces {
        let scale = proficiency_scale(book, piece)?;
        armor.add(&piece.values.scaled(scale));
    }
    armor.add(&attributes.armor_bonus(category));
    Ok(armor)
}

/// Whole hit points dealt after armor.
pub fn resolve_hit(damage: &DamageTable, armor: &DamageTable) -> u32 {
    let total = damage.mitigated_by(armor).total();
    if total.is_finite() && total > 0.0 {
        total.floor().min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}
