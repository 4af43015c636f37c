use std::collections::BTreeMap;

use bevy_utils::tracing::{debug, info};
use chrono::{DateTime, Utc};

use crate::components::character::{Character, MissionLogEntry};
use crate::content::catalog::Catalog;
use crate::ledger::repair::prune_unsupported;
use crate::rules::error::{EngineError, NotFound};

fn require_skill(catalog: &Catalog, skill: &str) -> Result<(), EngineError> {
    if catalog.skill(skill).is_none() {
        return Err(NotFound::Skill(skill.to_string()).into());
    }
    Ok(())
}

/// Flag or unflag `skill` as a success on the mission being drafted.
pub fn mark_mission_success(
    catalog: &Catalog,
    character: &Character,
    skill: &str,
    flag: bool,
) -> Result<Character, EngineError> {
    require_skill(catalog, skill)?;
    let mut next = character.clone();
    if flag {
        next.mission_draft.insert(skill.to_string());
    } else {
        next.mission_draft.remove(skill);
    }
    Ok(next)
}

/// Freeze the draft into mission history and start a fresh draft. A mission
/// with no flagged skills is still recorded.
pub fn commit_mission(
    character: &Character,
    completed_at: DateTime<Utc>,
) -> Result<Character, EngineError> {
    let last = character
        .missions
        .iter()
        .map(|entry| entry.sequence)
        .max()
        .unwrap_or(0);
    let sequence = last
        .checked_add(1)
        .ok_or(EngineError::MissionLogFull { last })?;
    let mut next = character.clone();
    let successes: Vec<String> = std::mem::take(&mut next.mission_draft).into_iter().collect();
    let entry = MissionLogEntry {
        id: mission_id(sequence, completed_at),
        sequence,
        completed_at,
        successes,
    };
    info!(
        mission = %entry.id,
        successes = entry.successes.len(),
        "mission committed"
    );
    next.missions.push(entry);
    Ok(next)
}

pub fn commit_mission_now(character: &Character) -> Result<Character, EngineError> {
    commit_mission(character, Utc::now())
}

/// Sequence padded to the full width of `u32` so ids sort like sequences.
fn mission_id(sequence: u32, completed_at: DateTime<Utc>) -> String {
    format!("M{:010}-{}", sequence, completed_at.format("%Y%m%dT%H%M%S"))
}

/// Banked credit per skill: successes earned across history minus what
/// level-ups already consumed. Lists every skill ever earned or spent.
pub fn effective_tally(character: &Character) -> BTreeMap<String, u32> {
    let mut earned: BTreeMap<String, u32> = BTreeMap::new();
    for entry in &character.missions {
        for skill in &entry.successes {
            *earned.entry(skill.clone()).or_insert(0) += 1;
        }
    }
    for skill in character.tally_spent.keys() {
        earned.entry(skill.clone()).or_insert(0);
    }
    earned
        .into_iter()
        .map(|(skill, total)| {
            let spent = character.tally_spent(&skill);
            (skill, total.saturating_sub(spent))
        })
        .collect()
}

/// Raise a skill. The whole effective tally for that skill is spent by the
/// level-up, however many levels it climbs.
pub fn raise_skill_level(
    catalog: &Catalog,
    character: &Character,
    skill: &str,
    new_level: u32,
) -> Result<Character, EngineError> {
    require_skill(catalog, skill)?;
    let current = character.skill_level(skill);
    if new_level <= current {
        return Err(EngineError::NonMonotonicLevelChange {
            skill: skill.to_string(),
            current,
            requested: new_level,
        });
    }

    let available = character
        .tally_earned(skill)
        .saturating_sub(character.tally_spent(skill));
    let mut next = character.clone();
    next.skills.insert(skill.to_string(), new_level);
    if available > 0 {
        *next.tally_spent.entry(skill.to_string()).or_insert(0) += available;
    }
    debug!(skill, from = current, to = new_level, spent = available, "skill raised");
    Ok(next)
}

/// Direct skill edit outside the progression ledger. Any level is accepted,
/// the tally is untouched, and abilities the new level no longer supports
/// are removed.
pub fn set_skill_level(
    catalog: &Catalog,
    character: &Character,
    skill: &str,
    level: u32,
) -> Result<Character, EngineError> {
    require_skill(catalog, skill)?;
    let mut next = character.clone();
    next.skills.insert(skill.to_string(), level);
    let (next, removed) = prune_unsupported(catalog, &next);
    debug!(skill, level, pruned = removed.len(), "skill level set");
    Ok(next)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn catalog() -> Catalog {
        Catalog::builtin().unwrap()
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, hour, 0, 0).unwrap()
    }

    #[test]
    fn draft_flags_toggle_before_commit() {
        let catalog = catalog();
        let character = mark_mission_success(&catalog, &Character::default(), "reflex", true).unwrap();
        let character = mark_mission_success(&catalog, &character, "might", true).unwrap();
        let character = mark_mission_success(&catalog, &character, "might", false).unwrap();
        assert_eq!(character.mission_draft.len(), 1);
        assert!(character.missions.is_empty());
    }

    #[test]
    fn unknown_skill_is_not_found() {
        let catalog = catalog();
        let character = Character::default();
        let err = mark_mission_success(&catalog, &character, "archery", true).unwrap_err();
        assert_eq!(err, EngineError::NotFound(NotFound::Skill("archery".to_string())));
    }

    #[test]
    fn commit_freezes_draft_and_numbers_missions() {
        let catalog = catalog();
        let character = mark_mission_success(&catalog, &Character::default(), "tech", true).unwrap();
        let first = commit_mission(&character, at(9)).unwrap();
        assert!(first.mission_draft.is_empty());
        assert_eq!(first.missions[0].successes, vec!["tech".to_string()]);
        assert_eq!(first.missions[0].id, "M0000000001-20260314T090000");

        let second = commit_mission(&first, at(9)).unwrap();
        assert_eq!(second.missions.len(), 2);
        assert_eq!(second.missions[1].sequence, 2);
        assert!(second.missions[1].successes.is_empty());
        assert_ne!(second.missions[0].id, second.missions[1].id);
    }

    #[test]
    fn mission_ids_sort_like_sequences_past_four_digits() {
        let mut character = Character::default();
        character.missions.push(MissionLogEntry {
            id: mission_id(9999, at(9)),
            sequence: 9999,
            completed_at: at(9),
            successes: Vec::new(),
        });
        let next = commit_mission(&character, at(9)).unwrap();
        assert_eq!(next.missions[1].sequence, 10000);
        assert!(next.missions[0].id < next.missions[1].id);
    }

    #[test]
    fn exhausted_sequence_is_rejected() {
        let mut character = Character::default();
        character.missions.push(MissionLogEntry {
            id: mission_id(u32::MAX, at(9)),
            sequence: u32::MAX,
            completed_at: at(9),
            successes: Vec::new(),
        });
        character.mission_draft.insert("reflex".to_string());
        assert_eq!(
            commit_mission(&character, at(10)),
            Err(EngineError::MissionLogFull { last: u32::MAX })
        );
    }

    #[test]
    fn commit_now_stamps_the_current_time() {
        let before = Utc::now();
        let character = commit_mission_now(&Character::default()).unwrap();
        let entry = &character.missions[0];
        assert!(entry.completed_at >= before);
        assert!(entry.id.starts_with("M0000000001-"));
    }

    #[test]
    fn effective_tally_subtracts_spent() {
        let mut character = Character::default();
        for hour in 1..=3 {
            character.mission_draft.insert("reflex".to_string());
            character = commit_mission(&character, at(hour)).unwrap();
        }
        character.tally_spent.insert("reflex".to_string(), 1);
        character.tally_spent.insert("might".to_string(), 0);

        let tally = effective_tally(&character);
        assert_eq!(tally.get("reflex"), Some(&2));
        assert_eq!(tally.get("might"), Some(&0));
        assert_eq!(tally.get("tech"), None);
    }

    #[test]
    fn raise_spends_the_whole_tally() {
        let catalog = catalog();
        let mut character = Character::default();
        character.skills.insert("reflex".to_string(), 1);
        for hour in 1..=2 {
            character = mark_mission_success(&catalog, &character, "reflex", true).unwrap();
            character = commit_mission(&character, at(hour)).unwrap();
        }

        let raised = raise_skill_level(&catalog, &character, "reflex", 2).unwrap();
        assert_eq!(raised.skill_level("reflex"), 2);
        assert_eq!(raised.tally_spent("reflex"), 2);
        assert_eq!(effective_tally(&raised).get("reflex"), Some(&0));

        let again = raise_skill_level(&catalog, &raised, "reflex", 3).unwrap();
        assert_eq!(again.tally_spent("reflex"), 2);
    }

    #[test]
    fn raise_rejects_decreases_and_repeats() {
        let catalog = catalog();
        let mut character = Character::default();
        character.skills.insert("might".to_string(), 2);
        let err = raise_skill_level(&catalog, &character, "might", 2).unwrap_err();
        assert_eq!(
            err,
            EngineError::NonMonotonicLevelChange {
                skill: "might".to_string(),
                current: 2,
                requested: 2
            }
        );
        assert!(raise_skill_level(&catalog, &character, "might", 1).is_err());
    }

    #[test]
    fn lowering_a_skill_prunes_dependent_unlocks() {
        let catalog = catalog();
        let mut character = Character::default();
        character.skills.insert("tech".to_string(), 2);
        let character = crate::ledger::acquisition::acquire(
            &catalog,
            &character,
            crate::components::character::AbilityVariant::Skill,
            "Overclock",
        )
        .unwrap();

        let lowered = set_skill_level(&catalog, &character, "tech", 1).unwrap();
        assert!(lowered.abilities.is_empty());
        assert_eq!(lowered.skill_level("tech"), 1);
    }
}
