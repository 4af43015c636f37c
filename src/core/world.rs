use std::collections::BTreeMap;

use bevy_ecs::prelude::*;
use bevy_utils::tracing::info;

use crate::components::character::{AbilityVariant, Character, HeldAbilityId};
use crate::content::catalog::Catalog;
use crate::core::ecs::{create_schedule, create_world};
use crate::core::serialization::SaveState;
use crate::ledger::progression::effective_tally;
use crate::ledger::repair::consolidate_duplicates;
use crate::rules::eligibility::{locked_abilities, reasons_blocking};
use crate::systems::character::{ActiveCharacter, CharacterIntent, IntentLog, IntentOutcome, IntentQueue};

/// Data snapshot returned to the presentation layer after each run.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub character: Character,
    pub outcomes: Vec<IntentOutcome>,
    pub tally: BTreeMap<String, u32>,
    pub locked: Vec<HeldAbilityId>,
}

impl SessionSnapshot {
    fn capture(world: &World) -> Self {
        let catalog = world.resource::<Catalog>();
        let character = world.resource::<ActiveCharacter>().0.clone();
        Self {
            tally: effective_tally(&character),
            locked: locked_abilities(catalog, &character),
            outcomes: world.resource::<IntentLog>().0.clone(),
            character,
        }
    }

    pub fn rejected(&self) -> impl Iterator<Item = &IntentOutcome> {
        self.outcomes.iter().filter(|outcome| outcome.result.is_err())
    }
}

/// Wrapper around the ECS world and schedule. All mutations of the loaded
/// character go through `submit`, one intent at a time.
pub struct Session {
    world: World,
    schedule: Schedule,
}

impl Session {
    /// Open a session on a loaded character. Split stack rows are repaired first.
    pub fn new(catalog: Catalog, character: Character) -> Self {
        let character = consolidate_duplicates(&catalog, &character);
        let world = create_world(catalog, character);
        let schedule = create_schedule();
        Self { world, schedule }
    }

    pub fn from_save(catalog: Catalog, state: SaveState) -> Self {
        let character = state.into_character(&catalog);
        Self::new(catalog, character)
    }

    /// Run the intents in order and return a snapshot for rendering.
    pub fn submit(&mut self, intents: Vec<CharacterIntent>) -> SessionSnapshot {
        {
            let mut queue = self.world.resource_mut::<IntentQueue>();
            queue.0 = intents;
        }

        self.schedule.run(&mut self.world);
        let snapshot = SessionSnapshot::capture(&self.world);
        info!(
            applied = snapshot.outcomes.len(),
            rejected = snapshot.rejected().count(),
            "session run complete"
        );
        snapshot
    }

    pub fn character(&self) -> &Character {
        &self.world.resource::<ActiveCharacter>().0
    }

    pub fn catalog(&self) -> &Catalog {
        self.world.resource::<Catalog>()
    }

    /// Why `name` cannot be acquired by the loaded character, if anything.
    pub fn reasons_blocking(&self, variant: AbilityVariant, name: &str) -> Vec<String> {
        reasons_blocking(self.catalog(), self.character(), variant, name)
    }

    /// Extract a serializable save state for the persistence collaborator.
    pub fn save_state(&self) -> SaveState {
        SaveState::new(self.character().clone())
    }

    /// Replace the loaded character with a saved one.
    pub fn load_state(&mut self, state: SaveState) {
        let character = state.into_character(self.catalog());
        self.world.resource_mut::<ActiveCharacter>().0 = character;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_intents_do_not_stop_the_run() {
        let catalog = Catalog::builtin().unwrap();
        let mut session = Session::new(catalog, Character::default());
        let snapshot = session.submit(vec![
            CharacterIntent::Acquire {
                variant: AbilityVariant::General,
                name: "Veteran".to_string(),
            },
            CharacterIntent::Acquire {
                variant: AbilityVariant::General,
                name: "Toughness".to_string(),
            },
            CharacterIntent::Acquire {
                variant: AbilityVariant::General,
                name: "Veteran".to_string(),
            },
        ]);

        assert_eq!(snapshot.outcomes.len(), 3);
        assert_eq!(snapshot.rejected().count(), 1);
        assert!(snapshot.character.holds(AbilityVariant::General, "Veteran"));
        assert_eq!(session.character(), &snapshot.character);
    }

    #[test]
    fn queue_is_empty_after_a_run() {
        let catalog = Catalog::builtin().unwrap();
        let mut session = Session::new(catalog, Character::default());
        session.submit(vec![CharacterIntent::Repair]);
        let snapshot = session.submit(Vec::new());
        assert!(snapshot.outcomes.is_empty());
    }
}
