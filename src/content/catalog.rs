use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use bevy_ecs::prelude::*;
use bevy_utils::tracing::debug;

use crate::components::character::{AbilityVariant, Character, HeldAbility};
use crate::content::caps::{CapRegistry, DerivedCap, GroupCap};
use crate::data::abilities::{
    load_catalog_file, parse_catalog_file, AbilityDefinition, CatalogDataError, CatalogFile,
    DEFAULT_CATALOG_PATH,
};
use crate::rules::prerequisite::{Clause, Prerequisite};

const BUILTIN_CATALOG: &str = include_str!("../../assets/data/abilities.json");

/// Which table an entry belongs to, with the data that keys it there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbilityScope {
    Race(String),
    SkillUnlock { skill: String, level: u32 },
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackPolicy {
    pub max: u32,
}

/// Immutable catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbilityDef {
    pub name: String,
    pub description: String,
    pub prerequisites: Prerequisite,
    pub one_of: Option<String>,
    pub group: Option<String>,
    pub stack: Option<StackPolicy>,
    pub auto: bool,
    pub scope: AbilityScope,
}

impl AbilityDef {
    fn from_definition(def: &AbilityDefinition, scope: AbilityScope) -> Self {
        Self {
            name: def.name.clone(),
            description: def.description.clone(),
            prerequisites: def.prerequisites.clone(),
            one_of: def.one_of.clone(),
            group: def.group.clone(),
            stack: def.stack_max.map(|max| StackPolicy { max }),
            auto: def.auto,
            scope,
        }
    }

    pub fn variant(&self) -> AbilityVariant {
        match self.scope {
            AbilityScope::Race(_) => AbilityVariant::Race,
            AbilityScope::SkillUnlock { .. } => AbilityVariant::Skill,
            AbilityScope::General => AbilityVariant::General,
        }
    }

    pub fn race(&self) -> Option<&str> {
        match &self.scope {
            AbilityScope::Race(race) => Some(race),
            _ => None,
        }
    }

    pub fn is_stackable(&self) -> bool {
        self.stack.is_some()
    }

    /// Highest legal count: the stack max, or 1 for non-stackable entries.
    pub fn stack_max(&self) -> u32 {
        self.stack.map(|policy| policy.max).unwrap_or(1)
    }

    /// Skill gate implied by a skill-unlock entry's place in the table.
    pub fn unlock_gate(&self) -> Option<Clause> {
        match &self.scope {
            AbilityScope::SkillUnlock { skill, level } => Some(Clause::RequiresSkill {
                skill: skill.clone(),
                min_level: *level,
            }),
            _ => None,
        }
    }

    /// Authored clauses plus the unlock gate, in evaluation order.
    pub fn effective_clauses(&self) -> Vec<Clause> {
        self.unlock_gate()
            .into_iter()
            .chain(self.prerequisites.clauses().iter().cloned())
            .collect()
    }

    /// Render the description template for a given stack count.
    pub fn describe(&self, count: u32) -> String {
        self.description.replace("{count}", &count.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillDef {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct RaceTable {
    pub id: String,
    pub label: String,
    pub abilities: Vec<AbilityDef>,
}

/// Read-only ability catalog, loaded once per session.
#[derive(Resource, Debug, Clone, Default)]
pub struct Catalog {
    skills: Vec<SkillDef>,
    races: BTreeMap<String, RaceTable>,
    skill_choices: Vec<AbilityDef>,
    general: Vec<AbilityDef>,
    caps: CapRegistry,
}

impl Catalog {
    /// Catalog shipped with the crate.
    pub fn builtin() -> Result<Self, CatalogDataError> {
        Self::from_json_str(BUILTIN_CATALOG)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, CatalogDataError> {
        let file = parse_catalog_file(raw, "inline catalog")?;
        Ok(Self::from_file(&file))
    }

    /// Build lookup tables from an already validated file.
    pub fn from_file(file: &CatalogFile) -> Self {
        let skills = file
            .skills
            .iter()
            .map(|skill| SkillDef {
                id: skill.id.clone(),
                label: skill.label.clone(),
            })
            .collect();
        let races = file
            .races
            .iter()
            .map(|race| {
                let abilities = race
                    .abilities
                    .iter()
                    .map(|def| AbilityDef::from_definition(def, AbilityScope::Race(race.id.clone())))
                    .collect();
                (
                    race.id.clone(),
                    RaceTable {
                        id: race.id.clone(),
                        label: race.label.clone(),
                        abilities,
                    },
                )
            })
            .collect();
        let skill_choices = file
            .skill_choices
            .iter()
            .map(|choice| {
                AbilityDef::from_definition(
                    &choice.ability,
                    AbilityScope::SkillUnlock {
                        skill: choice.skill.clone(),
                        level: choice.level,
                    },
                )
            })
            .collect();
        let general = file
            .general
            .iter()
            .map(|def| AbilityDef::from_definition(def, AbilityScope::General))
            .collect();

        let mut caps = CapRegistry::default();
        for cap in &file.caps {
            caps.register(cap.race.clone(), Arc::new(GroupCap::from(cap)));
        }

        debug!(
            races = file.races.len(),
            skill_choices = file.skill_choices.len(),
            general = file.general.len(),
            caps = file.caps.len(),
            "ability catalog built"
        );

        Self {
            skills,
            races,
            skill_choices,
            general,
            caps,
        }
    }

    /// Register a derived cap that the authored data cannot express.
    pub fn register_cap(&mut self, race: impl Into<String>, cap: Arc<dyn DerivedCap>) {
        self.caps.register(race, cap);
    }

    pub fn caps(&self) -> &CapRegistry {
        &self.caps
    }

    pub fn skills(&self) -> &[SkillDef] {
        &self.skills
    }

    pub fn skill(&self, id: &str) -> Option<&SkillDef> {
        self.skills.iter().find(|skill| skill.id == id)
    }

    pub fn races(&self) -> impl Iterator<Item = &RaceTable> {
        self.races.values()
    }

    pub fn race(&self, id: &str) -> Option<&RaceTable> {
        self.races.get(id)
    }

    pub fn race_abilities(&self, race: &str) -> &[AbilityDef] {
        self.races
            .get(race)
            .map(|table| table.abilities.as_slice())
            .unwrap_or(&[])
    }

    pub fn race_ability(&self, race: &str, name: &str) -> Option<&AbilityDef> {
        self.race_abilities(race).iter().find(|def| def.name == name)
    }

    /// Races whose table carries an ability called `name`.
    pub fn races_offering(&self, name: &str) -> Vec<&str> {
        self.races
            .values()
            .filter(|table| table.abilities.iter().any(|def| def.name == name))
            .map(|table| table.id.as_str())
            .collect()
    }

    pub fn skill_choice(&self, name: &str) -> Option<&AbilityDef> {
        self.skill_choices.iter().find(|def| def.name == name)
    }

    pub fn skill_choices(&self) -> &[AbilityDef] {
        &self.skill_choices
    }

    /// Choices unlocked at exactly `level` of `skill`.
    pub fn skill_choices_for(&self, skill: &str, level: u32) -> Vec<&AbilityDef> {
        self.skill_choices
            .iter()
            .filter(|def| {
                matches!(&def.scope, AbilityScope::SkillUnlock { skill: s, level: l } if s == skill && *l == level)
            })
            .collect()
    }

    pub fn general(&self, name: &str) -> Option<&AbilityDef> {
        self.general.iter().find(|def| def.name == name)
    }

    pub fn general_abilities(&self) -> &[AbilityDef] {
        &self.general
    }

    /// Look an entry up by variant and name. Race entries resolve against `race`.
    pub fn lookup(
        &self,
        variant: AbilityVariant,
        race: Option<&str>,
        name: &str,
    ) -> Option<&AbilityDef> {
        match variant {
            AbilityVariant::Race => race.and_then(|race| self.race_ability(race, name)),
            AbilityVariant::Skill => self.skill_choice(name),
            AbilityVariant::General => self.general(name),
        }
    }

    /// Every entry of a variant visible to a character of `race`.
    pub fn entries(&self, variant: AbilityVariant, race: Option<&str>) -> &[AbilityDef] {
        match variant {
            AbilityVariant::Race => race.map(|race| self.race_abilities(race)).unwrap_or(&[]),
            AbilityVariant::Skill => &self.skill_choices,
            AbilityVariant::General => &self.general,
        }
    }

    /// Definition backing a held row. Race rows prefer the character's current
    /// race and fall back to whichever race table still names them.
    pub fn definition_for(&self, character: &Character, held: &HeldAbility) -> Option<&AbilityDef> {
        match held.variant {
            AbilityVariant::Race => character
                .race
                .as_deref()
                .and_then(|race| self.race_ability(race, &held.name))
                .or_else(|| {
                    self.races
                        .values()
                        .find_map(|table| table.abilities.iter().find(|def| def.name == held.name))
                }),
            variant => self.lookup(variant, None, &held.name),
        }
    }

    /// Names granted automatically to members of `race`.
    pub fn auto_names(&self, race: Option<&str>) -> BTreeSet<&str> {
        race.map(|race| {
            self.race_abilities(race)
                .iter()
                .filter(|def| def.auto)
                .map(|def| def.name.as_str())
                .collect()
        })
        .unwrap_or_default()
    }
}

pub fn load_default_catalog() -> Result<Catalog, CatalogDataError> {
    load_catalog(DEFAULT_CATALOG_PATH)
}

pub fn load_catalog(path: impl AsRef<Path>) -> Result<Catalog, CatalogDataError> {
    let file = load_catalog_file(path)?;
    Ok(Catalog::from_file(&file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_path_loads_the_shipped_catalog() {
        let loaded = load_default_catalog().unwrap();
        let builtin = Catalog::builtin().unwrap();
        assert_eq!(loaded.skills().len(), builtin.skills().len());
        assert_eq!(loaded.races().count(), builtin.races().count());
        assert_eq!(loaded.auto_names(Some("Altered")), builtin.auto_names(Some("Altered")));
        assert_eq!(
            loaded.caps().for_group("Abomination", "mutation").count(),
            1
        );
    }

    #[test]
    fn missing_catalog_file_is_an_io_error() {
        let err = load_catalog("./assets/data/no_such_catalog.json").unwrap_err();
        assert!(matches!(err, CatalogDataError::Io { .. }));
    }

    #[test]
    fn builtin_catalog_indexes_every_table() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.skills().len(), 6);
        assert!(catalog.race("Abomination").is_some());
        assert!(catalog.race_ability("Altered", "Latent Spark").is_some());
        assert!(catalog.race_ability("Abomination", "Latent Spark").is_none());
        assert_eq!(catalog.races_offering("Latent Spark"), vec!["Altered", "Ascended"]);
        assert!(catalog.general("Toughness").is_some_and(AbilityDef::is_stackable));
    }

    #[test]
    fn skill_choices_are_keyed_by_skill_and_level() {
        let catalog = Catalog::builtin().unwrap();
        let names: Vec<&str> = catalog
            .skill_choices_for("reflex", 2)
            .into_iter()
            .map(|def| def.name.as_str())
            .collect();
        assert_eq!(names, vec!["Quickdraw", "Evasive Roll"]);
        assert!(catalog.skill_choices_for("reflex", 3).is_empty());
    }

    #[test]
    fn skill_choice_carries_its_unlock_gate() {
        let catalog = Catalog::builtin().unwrap();
        let def = catalog.skill_choice("Bullet Time").unwrap();
        let clauses = def.effective_clauses();
        assert_eq!(
            clauses[0],
            Clause::RequiresSkill {
                skill: "reflex".to_string(),
                min_level: 4
            }
        );
        assert_eq!(clauses.len(), 2);
    }

    #[test]
    fn auto_names_follow_the_race_table() {
        let catalog = Catalog::builtin().unwrap();
        let altered = catalog.auto_names(Some("Altered"));
        assert!(altered.contains("Adaptive Physiology"));
        assert!(altered.contains("Latent Spark"));
        assert_eq!(altered.len(), 2);
        assert!(catalog.auto_names(None).is_empty());
        assert!(catalog.auto_names(Some("Dragon")).is_empty());
    }

    #[test]
    fn describe_fills_count_placeholder() {
        let catalog = Catalog::builtin().unwrap();
        let def = catalog.general("Toughness").unwrap();
        assert_eq!(def.describe(2), "Gain 2 extra wound boxes.");
    }
}
