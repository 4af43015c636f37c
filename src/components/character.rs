use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which catalog table an ability comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AbilityVariant {
    Race,
    Skill,
    General,
}

impl fmt::Display for AbilityVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AbilityVariant::Race => "race",
            AbilityVariant::Skill => "skill",
            AbilityVariant::General => "general",
        };
        f.write_str(label)
    }
}

/// Stable identifier of one held ability row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeldAbilityId(pub Uuid);

impl HeldAbilityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for HeldAbilityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HeldAbilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeldAbility {
    pub id: HeldAbilityId,
    pub variant: AbilityVariant,
    pub name: String,
    /// Stack size. Always 1 for non-stackable abilities.
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Row was created by race reconciliation rather than by the player.
    #[serde(default)]
    pub granted: bool,
}

fn default_count() -> u32 {
    1
}

impl HeldAbility {
    pub fn new(variant: AbilityVariant, name: impl Into<String>) -> Self {
        Self {
            id: HeldAbilityId::new(),
            variant,
            name: name.into(),
            count: 1,
            notes: None,
            granted: false,
        }
    }

    pub fn granted(variant: AbilityVariant, name: impl Into<String>) -> Self {
        Self {
            granted: true,
            ..Self::new(variant, name)
        }
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }
}

/// One committed mission. Entries are append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionLogEntry {
    pub id: String,
    pub sequence: u32,
    pub completed_at: DateTime<Utc>,
    #[serde(default)]
    pub successes: Vec<String>,
}

/// Character snapshot the rules engine transitions between.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    #[serde(default)]
    pub race: Option<String>,
    #[serde(default)]
    pub skills: BTreeMap<String, u32>,
    #[serde(default)]
    pub abilities: Vec<HeldAbility>,
    #[serde(default)]
    pub tally_spent: BTreeMap<String, u32>,
    #[serde(default)]
    pub missions: Vec<MissionLogEntry>,
    /// Skills flagged successful on the mission currently being played.
    #[serde(default)]
    pub mission_draft: BTreeSet<String>,
}

impl Character {
    pub fn with_race(race: impl Into<String>) -> Self {
        Self {
            race: Some(race.into()),
            ..Default::default()
        }
    }

    pub fn skill_level(&self, skill: &str) -> u32 {
        self.skills.get(skill).copied().unwrap_or(0)
    }

    pub fn held(&self, id: HeldAbilityId) -> Option<&HeldAbility> {
        self.abilities.iter().find(|held| held.id == id)
    }

    pub fn held_mut(&mut self, id: HeldAbilityId) -> Option<&mut HeldAbility> {
        self.abilities.iter_mut().find(|held| held.id == id)
    }

    pub fn find_held(&self, variant: AbilityVariant, name: &str) -> Option<&HeldAbility> {
        self.abilities
            .iter()
            .find(|held| held.variant == variant && held.name == name)
    }

    pub fn holds(&self, variant: AbilityVariant, name: &str) -> bool {
        self.find_held(variant, name).is_some()
    }

    /// Names of every held ability, across variants.
    pub fn held_names(&self) -> BTreeSet<&str> {
        self.abilities.iter().map(|held| held.name.as_str()).collect()
    }

    /// Successes recorded for `skill` across the whole mission history.
    pub fn tally_earned(&self, skill: &str) -> u32 {
        self.missions
            .iter()
            .map(|entry| entry.successes.iter().filter(|s| s.as_str() == skill).count() as u32)
            .sum()
    }

    pub fn tally_spent(&self, skill: &str) -> u32 {
        self.tally_spent.get(skill).copied().unwrap_or(0)
    }
}
