use bevy_ecs::prelude::*;
use bevy_utils::tracing::debug;
use chrono::{DateTime, Utc};

use crate::components::character::{AbilityVariant, Character, HeldAbilityId};
use crate::content::catalog::Catalog;
use crate::ledger::acquisition::{acquire, annotate, reconcile_race, release, set_stack_count};
use crate::ledger::progression::{
    commit_mission, mark_mission_success, raise_skill_level, set_skill_level,
};
use crate::ledger::repair::consolidate_duplicates;
use crate::rules::error::EngineError;

/// Player intents fed into the session each run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CharacterIntent {
    Acquire { variant: AbilityVariant, name: String },
    Release { id: HeldAbilityId },
    SetStackCount { id: HeldAbilityId, count: u32 },
    Annotate { id: HeldAbilityId, notes: Option<String> },
    ChangeRace { race: Option<String> },
    FlagMissionSuccess { skill: String, flag: bool },
    CommitMission { completed_at: DateTime<Utc> },
    RaiseSkill { skill: String, level: u32 },
    SetSkillLevel { skill: String, level: u32 },
    Repair,
}

/// Resource storing the intents for the next run.
#[derive(Resource, Default, Debug)]
pub struct IntentQueue(pub Vec<CharacterIntent>);

/// The single snapshot every intent is applied against.
#[derive(Resource, Default, Debug, Clone)]
pub struct ActiveCharacter(pub Character);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentOutcome {
    pub intent: CharacterIntent,
    pub result: Result<(), EngineError>,
}

/// Outcomes of the most recent run, in intent order.
#[derive(Resource, Default, Debug)]
pub struct IntentLog(pub Vec<IntentOutcome>);

/// Apply one intent to a snapshot.
pub fn apply_intent(
    catalog: &Catalog,
    character: &Character,
    intent: &CharacterIntent,
) -> Result<Character, EngineError> {
    match intent {
        CharacterIntent::Acquire { variant, name } => acquire(catalog, character, *variant, name),
        CharacterIntent::Release { id } => release(catalog, character, *id),
        CharacterIntent::SetStackCount { id, count } => {
            set_stack_count(catalog, character, *id, *count)
        }
        CharacterIntent::Annotate { id, notes } => annotate(character, *id, notes.clone()),
        CharacterIntent::ChangeRace { race } => {
            Ok(reconcile_race(catalog, character, race.as_deref()))
        }
        CharacterIntent::FlagMissionSuccess { skill, flag } => {
            mark_mission_success(catalog, character, skill, *flag)
        }
        CharacterIntent::CommitMission { completed_at } => {
            commit_mission(character, *completed_at)
        }
        CharacterIntent::RaiseSkill { skill, level } => {
            raise_skill_level(catalog, character, skill, *level)
        }
        CharacterIntent::SetSkillLevel { skill, level } => {
            set_skill_level(catalog, character, skill, *level)
        }
        CharacterIntent::Repair => Ok(consolidate_duplicates(catalog, character)),
    }
}

/// System: applies queued intents one after another, each against the
/// snapshot the previous one produced. Rejected intents leave it unchanged.
pub fn character_intent_system(
    catalog: Res<Catalog>,
    intents: Res<IntentQueue>,
    mut active: ResMut<ActiveCharacter>,
    mut log: ResMut<IntentLog>,
) {
    log.0.clear();

    for intent in intents.0.iter() {
        let result = match apply_intent(&catalog, &active.0, intent) {
            Ok(next) => {
                active.0 = next;
                Ok(())
            }
            Err(err) => {
                debug!(?intent, %err, "intent rejected");
                Err(err)
            }
        };
        log.0.push(IntentOutcome {
            intent: intent.clone(),
            result,
        });
    }
}

/// System: drops intents once they have been applied.
pub fn clear_intents_system(mut intents: ResMut<IntentQueue>) {
    intents.0.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_intent_dispatches_to_the_ledgers() {
        let catalog = Catalog::builtin().unwrap();
        let character = apply_intent(
            &catalog,
            &Character::default(),
            &CharacterIntent::ChangeRace {
                race: Some("Abomination".to_string()),
            },
        )
        .unwrap();
        assert!(character.holds(AbilityVariant::Race, "Unstable Flesh"));

        let character = apply_intent(
            &catalog,
            &character,
            &CharacterIntent::Acquire {
                variant: AbilityVariant::Race,
                name: "Gills".to_string(),
            },
        )
        .unwrap();
        assert!(character.holds(AbilityVariant::Race, "Gills"));
    }
}
