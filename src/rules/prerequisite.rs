use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// A single prerequisite requirement. A catalog entry's prerequisite is the
/// conjunction of all of its clauses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Clause {
    /// Every named ability must be held.
    RequiresAll(Vec<String>),
    /// At least one named ability must be held.
    RequiresAny(Vec<String>),
    /// At least one skill at or above the threshold.
    RequiresAnySkillLevel(u32),
    /// Each listed skill must be at or above its minimum.
    RequiresSkillLevels(BTreeMap<String, u32>),
    RequiresSkill { skill: String, min_level: u32 },
    RequiresAnySkill { skills: Vec<String>, min_level: u32 },
}

/// What a clause is evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct PrerequisiteContext<'a> {
    pub held: &'a BTreeSet<&'a str>,
    pub skills: &'a BTreeMap<String, u32>,
}

impl<'a> PrerequisiteContext<'a> {
    fn level(&self, skill: &str) -> u32 {
        self.skills.get(skill).copied().unwrap_or(0)
    }

    fn holds(&self, name: &str) -> bool {
        self.held.contains(name)
    }
}

impl Clause {
    pub fn is_satisfied(&self, ctx: &PrerequisiteContext<'_>) -> bool {
        match self {
            Clause::RequiresAll(names) => names.iter().all(|name| ctx.holds(name)),
            Clause::RequiresAny(names) => names.iter().any(|name| ctx.holds(name)),
            Clause::RequiresAnySkillLevel(threshold) => {
                ctx.skills.values().any(|level| level >= threshold)
            }
            Clause::RequiresSkillLevels(levels) => levels
                .iter()
                .all(|(skill, min)| ctx.level(skill) >= *min),
            Clause::RequiresSkill { skill, min_level } => ctx.level(skill) >= *min_level,
            Clause::RequiresAnySkill { skills, min_level } => {
                skills.iter().any(|skill| ctx.level(skill) >= *min_level)
            }
        }
    }

    /// Human readable explanation of why this clause fails.
    pub fn describe_failure(&self, ctx: &PrerequisiteContext<'_>) -> String {
        match self {
            Clause::RequiresAll(names) => {
                let missing: Vec<&str> = names
                    .iter()
                    .filter(|name| !ctx.holds(name))
                    .map(String::as_str)
                    .collect();
                format!("requires {}", missing.join(", "))
            }
            Clause::RequiresAny(names) => format!("requires one of {}", names.join(", ")),
            Clause::RequiresAnySkillLevel(threshold) => {
                format!("requires any skill at level {} or higher", threshold)
            }
            Clause::RequiresSkillLevels(levels) => {
                let missing: Vec<String> = levels
                    .iter()
                    .filter(|(skill, min)| ctx.level(skill) < **min)
                    .map(|(skill, min)| format!("{} {}", skill, min))
                    .collect();
                format!("requires skill levels {}", missing.join(", "))
            }
            Clause::RequiresSkill { skill, min_level } => {
                format!("requires {} level {}", skill, min_level)
            }
            Clause::RequiresAnySkill { skills, min_level } => format!(
                "requires one of {} at level {}",
                skills.join(", "),
                min_level
            ),
        }
    }

    /// Ability names this clause refers to.
    pub fn ability_names(&self) -> &[String] {
        match self {
            Clause::RequiresAll(names) | Clause::RequiresAny(names) => names,
            _ => &[],
        }
    }

    /// Skill ids this clause refers to.
    pub fn skill_ids(&self) -> Vec<&str> {
        match self {
            Clause::RequiresSkillLevels(levels) => levels.keys().map(String::as_str).collect(),
            Clause::RequiresSkill { skill, .. } => vec![skill.as_str()],
            Clause::RequiresAnySkill { skills, .. } => skills.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

/// Conjunction of clauses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Prerequisite(pub Vec<Clause>);

impl Prerequisite {
    pub fn none() -> Self {
        Self(Vec::new())
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_satisfied(&self, ctx: &PrerequisiteContext<'_>) -> bool {
        self.0.iter().all(|clause| clause.is_satisfied(ctx))
    }

    /// One reason per failing clause, empty when satisfied.
    pub fn failures(&self, ctx: &PrerequisiteContext<'_>) -> Vec<String> {
        self.0
            .iter()
            .filter(|clause| !clause.is_satisfied(ctx))
            .map(|clause| clause.describe_failure(ctx))
            .collect()
    }
}
