use serde::Deserialize;
use std::collections::BTreeMap;

/// Skill experience and competency efficiency of one character.
///
/// A skill's level is the floor of its experience. Efficiency is expected in
/// `0.0..=1.0`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SkillBook {
    #[serde(default)]
    skills: BTreeMap<String, f64>,
    #[serde(default)]
    competencies: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkillAdvance {
    pub previous_level: u32,
    pub level: u32,
}

impl SkillBook {
    pub fn experience(&self, skill: &str) -> Option<f64> {
        self.skills.get(skill).copied()
    }

    pub fn level(&self, skill: &str) -> Option<u32> {
        self.experience(skill).map(skill_level)
    }

    pub fn efficiency(&self, competency: &str) -> Option<f64> {
        self.competencies.get(competency).copied()
    }

    pub fn set_experience(&mut self, skill: &str, experience: f64) {
        self.skills.insert(skill.to_string(), experience.max(0.0));
    }

    pub fn set_efficiency(&mut self, competency: &str, efficiency: f64) {
        self.competencies
            .insert(competency.to_string(), efficiency.clamp(0.0, 1.0));
    }

    /// Adds experience to a known skill; reports a level change if one happened.
    pub fn gain(&mut self, skill: &str, amount: f64) -> Option<SkillAdvance> {
        let experience = self.skills.get_mut(skill)?;
        let previous_level = skill_level(*experience);
        *experience = (*experience + amount.max(0.0)).max(0.0);
        let level = skill_level(*experience);
        (level > previous_level).then_some(SkillAdvance {
            previous_level,
            level,
        })
    }

    pub fn skills(&self) -> impl Iterator<Item = (&str, f64)> {
        self.skills.iter().map(|(name, exp)| (name.as_str(), *exp))
    }
}

pub fn skill_level(experience: f64) -> u32 {
    if experience.is_finite() && experience > 0.0 {
        experience.floor().min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_is_floor_of_experience() {
        let mut book = SkillBook::default();
        book.set_experience("sword", 3.99);
        assert_eq!(book.level("sword"), Some(3));
        assert_eq!(book.level("axe"), None);
    }

    #[test]
    fn gain_reports_level_crossing() {
        let mut book = SkillBook::default();
        book.set_experience("sword", 1.8);
        assert_eq!(book.gain("sword", 0.1), None);
        assert_eq!(
            book.gain("sword", 0.2),
            Some(SkillAdvance {
                previous_level: 1,
                level: 2
            })
        );
        assert_eq!(book.gain("axe", 5.0), None);
    }

    #[test]
    fn efficiency_is_clamped() {
        let mut book = SkillBook::default();
        book.set_efficiency("blades", 1.7);
        assert_eq!(book.efficiency("blades"), Some(1.0));
    }
}
