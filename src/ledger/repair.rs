use bevy_utils::tracing::warn;

use crate::components::character::{Character, HeldAbility};
use crate::content::catalog::Catalog;
use crate::rules::eligibility::{exceeded_caps, is_locked, is_supported};

/// Merge rows that should have been a single row. Stackable duplicates collapse
/// into one row whose count is the capped sum, keeping a race-granted row when
/// there is one. Repeated single abilities and zero-count rows are dropped.
/// Running it twice gives the same result as running it once.
pub fn consolidate_duplicates(catalog: &Catalog, character: &Character) -> Character {
    let mut next = character.clone();
    let mut merged: Vec<HeldAbility> = Vec::with_capacity(next.abilities.len());

    for row in next.abilities.drain(..) {
        let def = catalog.definition_for(character, &row);
        let max = def.map(|def| def.stack_max()).unwrap_or(1);
        let stackable = def.is_some_and(|def| def.is_stackable());

        if row.count == 0 {
            warn!(ability = %row.name, "dropping zero-count ability row");
            continue;
        }

        let existing = merged
            .iter()
            .position(|kept| kept.variant == row.variant && kept.name == row.name);
        let Some(index) = existing else {
            let mut row = row;
            row.count = row.count.min(max);
            merged.push(row);
            continue;
        };
        let kept = &mut merged[index];

        warn!(
            ability = %row.name,
            kept = %kept.id,
            merged = %row.id,
            "consolidating duplicate ability rows"
        );
        let total = if stackable {
            kept.count.saturating_add(row.count).min(max)
        } else {
            1
        };
        let notes = kept.notes.clone().or_else(|| row.notes.clone());
        if row.granted && !kept.granted {
            *kept = row;
        }
        kept.count = total;
        kept.notes = notes;
    }

    next.abilities = merged;
    next
}

/// Remove held abilities whose prerequisite no longer holds, repeating until
/// nothing changes since one removal can strand another ability. Cap groups
/// left over their limit lose their most recently added units. Returns the
/// removed rows, or single units for trimmed stacks.
pub fn prune_unsupported(catalog: &Catalog, character: &Character) -> (Character, Vec<HeldAbility>) {
    let mut next = character.clone();
    let mut removed = Vec::new();

    loop {
        if let Some(index) = next
            .abilities
            .iter()
            .position(|held| !is_supported(catalog, &next, held))
        {
            let row = next.abilities.remove(index);
            warn!(ability = %row.name, variant = %row.variant, "prerequisites lapsed, removing ability");
            removed.push(row);
            continue;
        }

        let Some(index) = over_cap_member(catalog, &next) else {
            break;
        };
        let row = &mut next.abilities[index];
        warn!(ability = %row.name, count = row.count, "cap group over its limit, trimming");
        if row.count > 1 {
            row.count -= 1;
            removed.push(row.clone().with_count(1));
        } else {
            removed.push(next.abilities.remove(index));
        }
    }

    (next, removed)
}

/// Last unlocked row belonging to a cap group that is over its limit.
fn over_cap_member(catalog: &Catalog, character: &Character) -> Option<usize> {
    let exceeded = exceeded_caps(catalog, character);
    if exceeded.is_empty() {
        return None;
    }
    character.abilities.iter().rposition(|held| {
        !is_locked(catalog, character, held)
            && catalog
                .definition_for(character, held)
                .and_then(|def| def.group.as_deref())
                .is_some_and(|group| exceeded.iter().any(|(over, ..)| over == group))
    })
}
