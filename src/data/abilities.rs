use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rules::prerequisite::{Clause, Prerequisite};

pub const DEFAULT_CATALOG_PATH: &str = "./assets/data/abilities.json";

/// Authored catalog as it appears on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogFile {
    pub schema_version: u32,
    pub skills: Vec<SkillDefinition>,
    pub races: Vec<RaceDefinition>,
    #[serde(default)]
    pub skill_choices: Vec<SkillChoiceDefinition>,
    #[serde(default)]
    pub general: Vec<AbilityDefinition>,
    #[serde(default)]
    pub caps: Vec<CapDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillDefinition {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceDefinition {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub abilities: Vec<AbilityDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbilityDefinition {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub prerequisites: Prerequisite,
    #[serde(default)]
    pub one_of: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub stack_max: Option<u32>,
    #[serde(default)]
    pub auto: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillChoiceDefinition {
    pub skill: String,
    pub level: u32,
    #[serde(flatten)]
    pub ability: AbilityDefinition,
}

/// Data form of a per-race derived cap: members of `group` may total at most
/// `base` plus `per_stack` for every stack of `bonus_ability`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapDefinition {
    pub race: String,
    pub group: String,
    pub base: u32,
    #[serde(default)]
    pub bonus_ability: Option<String>,
    #[serde(default = "default_per_stack")]
    pub per_stack: u32,
}

fn default_per_stack() -> u32 {
    1
}

#[derive(Debug, Error)]
pub enum CatalogDataError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}")]
    Validation(String),
}

pub fn load_catalog_file(path: impl AsRef<Path>) -> Result<CatalogFile, CatalogDataError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| CatalogDataError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_catalog_file(&raw, &path.display().to_string())
}

/// Parse and validate catalog JSON. `origin` is only used in error messages.
pub fn parse_catalog_file(raw: &str, origin: &str) -> Result<CatalogFile, CatalogDataError> {
    let catalog: CatalogFile =
        serde_json::from_str(raw).map_err(|source| CatalogDataError::Json {
            path: origin.to_string(),
            source,
        })?;
    catalog.validate()?;
    Ok(catalog)
}

impl CatalogFile {
    pub fn validate(&self) -> Result<(), CatalogDataError> {
        if self.schema_version == 0 {
            return Err(CatalogDataError::Validation(
                "catalog schema_version must be >= 1".to_string(),
            ));
        }

        let mut skill_ids = HashSet::new();
        for skill in &self.skills {
            if skill.id.trim().is_empty() {
                return Err(CatalogDataError::Validation(
                    "skill id cannot be empty".to_string(),
                ));
            }
            if !skill_ids.insert(skill.id.as_str()) {
                return Err(CatalogDataError::Validation(format!(
                    "duplicate skill id {}",
                    skill.id
                )));
            }
        }

        let mut race_ids = HashSet::new();
        let mut known_names: HashSet<&str> = HashSet::new();
        for race in &self.races {
            if !race_ids.insert(race.id.as_str()) {
                return Err(CatalogDataError::Validation(format!(
                    "duplicate race id {}",
                    race.id
                )));
            }
            let mut names = HashSet::new();
            for ability in &race.abilities {
                check_definition(ability, &format!("race {}", race.id))?;
                if !names.insert(ability.name.as_str()) {
                    return Err(CatalogDataError::Validation(format!(
                        "duplicate ability {} in race {}",
                        ability.name, race.id
                    )));
                }
                known_names.insert(ability.name.as_str());
            }
        }

        let mut choice_names = HashSet::new();
        for choice in &self.skill_choices {
            check_definition(&choice.ability, "skill choices")?;
            if !skill_ids.contains(choice.skill.as_str()) {
                return Err(CatalogDataError::Validation(format!(
                    "skill choice {} is gated on unknown skill {}",
                    choice.ability.name, choice.skill
                )));
            }
            if choice.ability.auto {
                return Err(CatalogDataError::Validation(format!(
                    "skill choice {} cannot be auto",
                    choice.ability.name
                )));
            }
            if !choice_names.insert(choice.ability.name.as_str()) {
                return Err(CatalogDataError::Validation(format!(
                    "duplicate skill choice {}",
                    choice.ability.name
                )));
            }
            known_names.insert(choice.ability.name.as_str());
        }

        let mut general_names = HashSet::new();
        for ability in &self.general {
            check_definition(ability, "general abilities")?;
            if ability.auto {
                return Err(CatalogDataError::Validation(format!(
                    "general ability {} cannot be auto",
                    ability.name
                )));
            }
            if !general_names.insert(ability.name.as_str()) {
                return Err(CatalogDataError::Validation(format!(
                    "duplicate general ability {}",
                    ability.name
                )));
            }
            known_names.insert(ability.name.as_str());
        }

        let every_ability = self
            .races
            .iter()
            .flat_map(|race| race.abilities.iter())
            .chain(self.skill_choices.iter().map(|choice| &choice.ability))
            .chain(self.general.iter());
        for ability in every_ability {
            for clause in ability.prerequisites.clauses() {
                check_clause(clause, &ability.name, &known_names, &skill_ids)?;
            }
        }

        for cap in &self.caps {
            let Some(race) = self.races.iter().find(|race| race.id == cap.race) else {
                return Err(CatalogDataError::Validation(format!(
                    "cap on group {} names unknown race {}",
                    cap.group, cap.race
                )));
            };
            if let Some(bonus) = &cap.bonus_ability {
                let source = race.abilities.iter().find(|a| &a.name == bonus);
                match source {
                    Some(ability) if ability.stack_max.is_some() => {}
                    Some(_) => {
                        return Err(CatalogDataError::Validation(format!(
                            "cap bonus ability {} must be stackable",
                            bonus
                        )))
                    }
                    None => {
                        return Err(CatalogDataError::Validation(format!(
                            "cap bonus ability {} is not a {} ability",
                            bonus, race.id
                        )))
                    }
                }
            }
        }

        Ok(())
    }
}

fn check_definition(ability: &AbilityDefinition, table: &str) -> Result<(), CatalogDataError> {
    if ability.name.trim().is_empty() {
        return Err(CatalogDataError::Validation(format!(
            "ability name cannot be empty in {}",
            table
        )));
    }
    if ability.stack_max == Some(0) {
        return Err(CatalogDataError::Validation(format!(
            "ability {} has stack_max 0",
            ability.name
        )));
    }
    Ok(())
}

fn check_clause(
    clause: &Clause,
    owner: &str,
    known_names: &HashSet<&str>,
    skill_ids: &HashSet<&str>,
) -> Result<(), CatalogDataError> {
    let empty_list = match clause {
        Clause::RequiresAny(names) => names.is_empty(),
        Clause::RequiresAnySkill { skills, .. } => skills.is_empty(),
        _ => false,
    };
    if empty_list {
        return Err(CatalogDataError::Validation(format!(
            "ability {} has an empty any-of prerequisite",
            owner
        )));
    }
    for name in clause.ability_names() {
        if !known_names.contains(name.as_str()) {
            return Err(CatalogDataError::Validation(format!(
                "ability {} requires unknown ability {}",
                owner, name
            )));
        }
    }
    for skill in clause.skill_ids() {
        if !skill_ids.contains(skill) {
            return Err(CatalogDataError::Validation(format!(
                "ability {} requires unknown skill {}",
                owner, skill
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal(extra_general: &str) -> String {
        format!(
            r#"{{
                "schema_version": 1,
                "skills": [{{"id": "reflex", "label": "Reflex"}}],
                "races": [{{"id": "Altered", "label": "Altered", "abilities": [
                    {{"name": "Latent Spark", "description": "x", "auto": true, "stack_max": 3}}
                ]}}],
                "general": [{}]
            }}"#,
            extra_general
        )
    }

    #[test]
    fn accepts_minimal_catalog() {
        let raw = minimal(r#"{"name": "Lucky", "description": "x", "prerequisites": [{"requires_any": ["Latent Spark"]}]}"#);
        let catalog = parse_catalog_file(&raw, "inline").unwrap();
        assert_eq!(catalog.general.len(), 1);
        assert_eq!(catalog.races[0].abilities[0].stack_max, Some(3));
    }

    #[test]
    fn rejects_dangling_prerequisite() {
        let raw = minimal(r#"{"name": "Veteran", "description": "x", "prerequisites": [{"requires_all": ["Toughness"]}]}"#);
        let err = parse_catalog_file(&raw, "inline").unwrap_err();
        assert!(err.to_string().contains("unknown ability Toughness"));
    }

    #[test]
    fn rejects_unknown_skill_gate() {
        let raw = minimal(r#"{"name": "Marksman", "description": "x", "prerequisites": [{"requires_skill": {"skill": "archery", "min_level": 2}}]}"#);
        let err = parse_catalog_file(&raw, "inline").unwrap_err();
        assert!(matches!(err, CatalogDataError::Validation(_)));
        assert!(err.to_string().contains("unknown skill archery"));
    }

    #[test]
    fn rejects_zero_stack_max() {
        let raw = minimal(r#"{"name": "Toughness", "description": "x", "stack_max": 0}"#);
        assert!(parse_catalog_file(&raw, "inline").is_err());
    }

    #[test]
    fn reports_json_errors_with_origin() {
        let err = parse_catalog_file("{", "broken.json").unwrap_err();
        assert!(err.to_string().starts_with("failed to parse broken.json"));
    }
}
