use bevy_utils::tracing::{debug, info, warn};

use crate::components::character::{AbilityVariant, Character, HeldAbility, HeldAbilityId};
use crate::content::catalog::Catalog;
use crate::ledger::repair::prune_unsupported;
use crate::rules::eligibility::{cap_failure, cap_regressions, check_acquire, is_locked};
use crate::rules::error::{EngineError, NotFound};

/// Add one unit of an ability. Stackable abilities already held gain a count;
/// anything else gets a new row.
pub fn acquire(
    catalog: &Catalog,
    character: &Character,
    variant: AbilityVariant,
    name: &str,
) -> Result<Character, EngineError> {
    let def = check_acquire(catalog, character, variant, name)?;
    let mut next = character.clone();

    if def.is_stackable() {
        if let Some(row) = next
            .abilities
            .iter_mut()
            .find(|held| held.variant == variant && held.name == name)
        {
            row.count = row.count.saturating_add(1).min(def.stack_max());
            debug!(ability = name, count = row.count, "stack increased");
            return Ok(next);
        }
    }

    next.abilities.push(HeldAbility::new(variant, name));
    debug!(ability = name, %variant, "ability acquired");
    Ok(next)
}

/// Remove one unit of a held ability. Stacks above one lose a count; otherwise
/// the row goes, along with anything whose prerequisites relied on it.
pub fn release(
    catalog: &Catalog,
    character: &Character,
    id: HeldAbilityId,
) -> Result<Character, EngineError> {
    let held = character.held(id).ok_or(NotFound::HeldAbility(id))?;
    let stackable = catalog
        .definition_for(character, held)
        .is_some_and(|def| def.is_stackable());

    if stackable && held.count > 1 {
        let mut next = character.clone();
        if let Some(row) = next.held_mut(id) {
            row.count -= 1;
        }
        guard_caps(catalog, character, &next, held)?;
        debug!(ability = %held.name, count = held.count - 1, "stack decreased");
        return Ok(next);
    }

    remove_row(catalog, character, id)
}

/// Set a row's count directly. Zero removes the row.
pub fn set_stack_count(
    catalog: &Catalog,
    character: &Character,
    id: HeldAbilityId,
    count: u32,
) -> Result<Character, EngineError> {
    let held = character.held(id).ok_or(NotFound::HeldAbility(id))?;
    if count == held.count {
        return Ok(character.clone());
    }
    if count == 0 {
        return remove_row(catalog, character, id);
    }

    let reject = |reason: String| EngineError::ineligible(held.variant, &held.name, vec![reason]);
    let Some(def) = catalog.definition_for(character, held) else {
        return Err(reject(format!("unknown {} ability {}", held.variant, held.name)));
    };
    if !def.is_stackable() {
        return Err(reject(format!("{} is not stackable", held.name)));
    }
    if count > def.stack_max() {
        return Err(reject(format!("stack max is {}", def.stack_max())));
    }
    if count > held.count {
        if let Some(reason) = cap_failure(catalog, character, def, count - held.count) {
            return Err(reject(reason));
        }
    }

    let mut next = character.clone();
    if let Some(row) = next.held_mut(id) {
        row.count = count;
    }
    if count < held.count {
        guard_caps(catalog, character, &next, held)?;
    }
    debug!(ability = %held.name, count, "stack count set");
    Ok(next)
}

/// Replace a row's free-text notes. Blank notes clear them.
pub fn annotate(
    character: &Character,
    id: HeldAbilityId,
    notes: Option<String>,
) -> Result<Character, EngineError> {
    let mut next = character.clone();
    let row = next.held_mut(id).ok_or(NotFound::HeldAbility(id))?;
    row.notes = notes.filter(|text| !text.trim().is_empty());
    Ok(next)
}

/// Move the character to `new_race`, swapping race-granted abilities.
pub fn reconcile_race(catalog: &Catalog, character: &Character, new_race: Option<&str>) -> Character {
    let old_race = character.race.clone();
    reconcile_race_between(catalog, character, old_race.as_deref(), new_race)
}

/// Grants of `old_race` that `new_race` does not share are removed, grants of
/// `new_race` not yet held are added, and shared grants keep their row and
/// count. Never fails and is not gated by eligibility.
pub fn reconcile_race_between(
    catalog: &Catalog,
    character: &Character,
    old_race: Option<&str>,
    new_race: Option<&str>,
) -> Character {
    if let Some(race) = new_race {
        if catalog.race(race).is_none() {
            warn!(race, "reconciling to a race with no catalog entry");
        }
    }

    let old_auto = catalog.auto_names(old_race);
    let new_auto = catalog.auto_names(new_race);

    let mut next = character.clone();
    next.race = new_race.map(str::to_string);
    next.abilities.retain(|held| {
        !(held.variant == AbilityVariant::Race
            && old_auto.contains(held.name.as_str())
            && !new_auto.contains(held.name.as_str()))
    });
    for name in &new_auto {
        if !next.holds(AbilityVariant::Race, name) {
            next.abilities
                .push(HeldAbility::granted(AbilityVariant::Race, *name));
        }
    }

    let (next, removed) = prune_unsupported(catalog, &next);
    info!(
        from = old_race.unwrap_or("none"),
        to = new_race.unwrap_or("none"),
        pruned = removed.len(),
        "race reconciled"
    );
    next
}

fn remove_row(
    catalog: &Catalog,
    character: &Character,
    id: HeldAbilityId,
) -> Result<Character, EngineError> {
    let held = character.held(id).ok_or(NotFound::HeldAbility(id))?;
    if is_locked(catalog, character, held) {
        return Err(EngineError::LockedAbility {
            name: held.name.clone(),
            race: character.race.clone().unwrap_or_default(),
        });
    }

    let mut next = character.clone();
    next.abilities.retain(|row| row.id != id);
    guard_caps(catalog, character, &next, held)?;
    debug!(ability = %held.name, "ability released");
    let (next, _) = prune_unsupported(catalog, &next);
    Ok(next)
}

/// Refuse a removal that would leave a cap group over the limit its bonus
/// stacks were holding up.
fn guard_caps(
    catalog: &Catalog,
    before: &Character,
    after: &Character,
    held: &HeldAbility,
) -> Result<(), EngineError> {
    let reasons = cap_regressions(catalog, before, after);
    if reasons.is_empty() {
        return Ok(());
    }
    Err(EngineError::ineligible(held.variant, &held.name, reasons))
}
