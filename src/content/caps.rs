use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::components::character::{AbilityVariant, Character};
use crate::data::abilities::CapDefinition;

/// Extension point for numeric caps that depend on the character, such as
/// a mutation limit raised by another ability's stack count.
pub trait DerivedCap: fmt::Debug + Send + Sync {
    /// Cap group the limit applies to.
    fn group(&self) -> &str;

    /// Maximum combined count of `group` members for this character.
    fn limit(&self, character: &Character) -> u32;
}

/// Cap of `base` plus `per_stack` for every held stack of a race ability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupCap {
    pub group: String,
    pub base: u32,
    pub bonus_ability: Option<String>,
    pub per_stack: u32,
}

impl GroupCap {
    pub fn fixed(group: impl Into<String>, base: u32) -> Self {
        Self {
            group: group.into(),
            base,
            bonus_ability: None,
            per_stack: 0,
        }
    }
}

impl From<&CapDefinition> for GroupCap {
    fn from(def: &CapDefinition) -> Self {
        Self {
            group: def.group.clone(),
            base: def.base,
            bonus_ability: def.bonus_ability.clone(),
            per_stack: def.per_stack,
        }
    }
}

impl DerivedCap for GroupCap {
    fn group(&self) -> &str {
        &self.group
    }

    fn limit(&self, character: &Character) -> u32 {
        let stacks = self
            .bonus_ability
            .as_deref()
            .and_then(|name| character.find_held(AbilityVariant::Race, name))
            .map(|held| held.count)
            .unwrap_or(0);
        self.base.saturating_add(stacks.saturating_mul(self.per_stack))
    }
}

/// Derived caps keyed by race.
#[derive(Debug, Clone, Default)]
pub struct CapRegistry {
    by_race: HashMap<String, Vec<Arc<dyn DerivedCap>>>,
}

impl CapRegistry {
    pub fn register(&mut self, race: impl Into<String>, cap: Arc<dyn DerivedCap>) {
        self.by_race.entry(race.into()).or_default().push(cap);
    }

    pub fn for_race(&self, race: &str) -> &[Arc<dyn DerivedCap>] {
        self.by_race.get(race).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn for_group<'a>(
        &'a self,
        race: &str,
        group: &'a str,
    ) -> impl Iterator<Item = &'a Arc<dyn DerivedCap>> + 'a {
        self.for_race(race)
            .iter()
            .filter(move |cap| cap.group() == group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::character::HeldAbility;

    #[test]
    fn bonus_stacks_raise_the_limit() {
        let cap = GroupCap {
            group: "mutation".to_string(),
            base: 3,
            bonus_ability: Some("Emerging Mutation".to_string()),
            per_stack: 1,
        };
        let mut character = Character::with_race("Abomination");
        assert_eq!(cap.limit(&character), 3);

        character.abilities.push(
            HeldAbility::new(AbilityVariant::Race, "Emerging Mutation").with_count(2),
        );
        assert_eq!(cap.limit(&character), 5);
    }

    #[test]
    fn registry_filters_by_race_and_group() {
        let mut registry = CapRegistry::default();
        registry.register("Abomination", Arc::new(GroupCap::fixed("mutation", 3)));
        registry.register("Ascended", Arc::new(GroupCap::fixed("core power", 1)));

        assert_eq!(registry.for_group("Abomination", "mutation").count(), 1);
        assert_eq!(registry.for_group("Abomination", "core power").count(), 0);
        assert!(registry.for_race("Human").is_empty());
    }
}
