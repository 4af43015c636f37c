use std::collections::BTreeSet;

use crate::components::character::{AbilityVariant, Character, HeldAbility, HeldAbilityId};
use crate::content::catalog::{AbilityDef, Catalog};
use crate::rules::error::EngineError;
use crate::rules::prerequisite::PrerequisiteContext;

pub fn can_acquire(
    catalog: &Catalog,
    character: &Character,
    variant: AbilityVariant,
    name: &str,
) -> bool {
    reasons_blocking(catalog, character, variant, name).is_empty()
}

/// Reasons `name` cannot be acquired right now. Empty iff it can.
pub fn reasons_blocking(
    catalog: &Catalog,
    character: &Character,
    variant: AbilityVariant,
    name: &str,
) -> Vec<String> {
    match check_acquire(catalog, character, variant, name) {
        Ok(_) => Vec::new(),
        Err(err) => err.reasons(),
    }
}

/// Run the acquisition checks in order and hand back the catalog entry.
pub fn check_acquire<'c>(
    catalog: &'c Catalog,
    character: &Character,
    variant: AbilityVariant,
    name: &str,
) -> Result<&'c AbilityDef, EngineError> {
    let reject = |reason: String| EngineError::ineligible(variant, name, vec![reason]);
    let race = character.race.as_deref();

    let Some(def) = catalog.lookup(variant, race, name) else {
        if variant == AbilityVariant::Race {
            let offering = catalog.races_offering(name);
            if !offering.is_empty() {
                return Err(reject(format!(
                    "{} is only available to {}",
                    name,
                    offering.join(", ")
                )));
            }
        }
        return Err(reject(format!("unknown {} ability {}", variant, name)));
    };

    let existing = character.find_held(variant, name);
    if let Some(policy) = def.stack {
        if existing.is_some_and(|held| held.count >= policy.max) {
            return Err(reject(format!("already at stack max {}", policy.max)));
        }
    } else if existing.is_some() {
        return Err(reject(format!("{} is already held", name)));
    }

    if let Some(group) = def.one_of.as_deref() {
        if let Some(rival) = exclusive_rival(catalog, character, group, def) {
            return Err(reject(format!("exclusive with {}", rival.name)));
        }
    }

    let held = other_held_names(character, name);
    let ctx = PrerequisiteContext {
        held: &held,
        skills: &character.skills,
    };
    let failures: Vec<String> = def
        .effective_clauses()
        .iter()
        .filter(|clause| !clause.is_satisfied(&ctx))
        .map(|clause| clause.describe_failure(&ctx))
        .collect();
    if !failures.is_empty() {
        return Err(EngineError::ineligible(variant, name, failures));
    }

    if let Some(reason) = cap_failure(catalog, character, def, 1) {
        return Err(reject(reason));
    }

    Ok(def)
}

/// Derived-cap check for adding `additional` units of `def`.
pub fn cap_failure(
    catalog: &Catalog,
    character: &Character,
    def: &AbilityDef,
    additional: u32,
) -> Option<String> {
    let group = def.group.as_deref()?;
    let race = character.race.as_deref()?;
    let used = group_usage(catalog, character, group);
    catalog
        .caps()
        .for_group(race, group)
        .map(|cap| cap.limit(character))
        .min()
        .filter(|limit| used.saturating_add(additional) > *limit)
        .map(|limit| format!("{} cap reached ({} of {})", group, used, limit))
}

/// Combined stack count of every held ability in cap group `group`.
pub fn group_usage(catalog: &Catalog, character: &Character, group: &str) -> u32 {
    character
        .abilities
        .iter()
        .filter(|held| {
            catalog
                .definition_for(character, held)
                .is_some_and(|def| def.group.as_deref() == Some(group))
        })
        .map(|held| held.count)
        .sum()
}

/// Cap groups of the current race holding more than their limit, as
/// `(group, used, limit)`.
pub fn exceeded_caps(catalog: &Catalog, character: &Character) -> Vec<(String, u32, u32)> {
    let Some(race) = character.race.as_deref() else {
        return Vec::new();
    };
    let groups: BTreeSet<&str> = catalog
        .caps()
        .for_race(race)
        .iter()
        .map(|cap| cap.group())
        .collect();
    groups
        .into_iter()
        .filter_map(|group| {
            let limit = catalog
                .caps()
                .for_group(race, group)
                .map(|cap| cap.limit(character))
                .min()?;
            let used = group_usage(catalog, character, group);
            (used > limit).then(|| (group.to_string(), used, limit))
        })
        .collect()
}

/// Cap violations that moving from `before` to `after` would introduce or
/// worsen. Both snapshots are read against the same race.
pub fn cap_regressions(catalog: &Catalog, before: &Character, after: &Character) -> Vec<String> {
    let prior = exceeded_caps(catalog, before);
    exceeded_caps(catalog, after)
        .into_iter()
        .filter(|(group, used, limit)| {
            prior
                .iter()
                .find(|(known, ..)| known == group)
                .map_or(true, |(_, was_used, was_limit)| {
                    used - limit > was_used - was_limit
                })
        })
        .map(|(group, used, limit)| format!("{} cap would drop to {} with {} held", group, limit, used))
        .collect()
}

fn exclusive_rival<'a>(
    catalog: &Catalog,
    character: &'a Character,
    group: &str,
    def: &AbilityDef,
) -> Option<&'a HeldAbility> {
    character.abilities.iter().find(|held| {
        !(held.variant == def.variant() && held.name == def.name)
            && catalog
                .definition_for(character, held)
                .is_some_and(|other| other.one_of.as_deref() == Some(group))
    })
}

fn other_held_names<'a>(character: &'a Character, exclude: &str) -> BTreeSet<&'a str> {
    character
        .abilities
        .iter()
        .map(|held| held.name.as_str())
        .filter(|name| *name != exclude)
        .collect()
}

/// An ability is locked when it is an auto grant of the character's current race.
pub fn is_locked(catalog: &Catalog, character: &Character, held: &HeldAbility) -> bool {
    held.variant == AbilityVariant::Race
        && catalog.auto_names(character.race.as_deref()).contains(held.name.as_str())
}

/// Held rows that only race reconciliation may remove.
pub fn locked_abilities(catalog: &Catalog, character: &Character) -> Vec<HeldAbilityId> {
    character
        .abilities
        .iter()
        .filter(|held| is_locked(catalog, character, held))
        .map(|held| held.id)
        .collect()
}

/// Whether a held row's prerequisite still holds against the character's other
/// abilities and skill levels. Locked rows are always supported.
pub fn is_supported(catalog: &Catalog, character: &Character, held: &HeldAbility) -> bool {
    if is_locked(catalog, character, held) {
        return true;
    }
    let Some(def) = catalog.definition_for(character, held) else {
        return true;
    };
    let others = other_held_names(character, &held.name);
    let ctx = PrerequisiteContext {
        held: &others,
        skills: &character.skills,
    };
    def.effective_clauses()
        .iter()
        .all(|clause| clause.is_satisfied(&ctx))
}

/// Catalog entries of `variant` the character could acquire right now.
pub fn acquirable<'c>(
    catalog: &'c Catalog,
    character: &Character,
    variant: AbilityVariant,
) -> Vec<&'c AbilityDef> {
    catalog
        .entries(variant, character.race.as_deref())
        .iter()
        .filter(|def| can_acquire(catalog, character, variant, &def.name))
        .collect()
}
