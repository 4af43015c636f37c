use bevy_ecs::prelude::*;
use bevy_ecs::schedule::SystemSet;

use crate::components::character::Character;
use crate::content::catalog::Catalog;
use crate::systems::character::{
    character_intent_system, clear_intents_system, ActiveCharacter, IntentLog, IntentQueue,
};

/// Canonical ordering for one run of the session.
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum RunSet {
    Rules,
    Cleanup,
}

/// Build the ECS world with the catalog and the loaded character.
pub fn create_world(catalog: Catalog, character: Character) -> World {
    let mut world = World::new();
    world.insert_resource(catalog);
    world.insert_resource(ActiveCharacter(character));
    world.insert_resource(IntentQueue::default());
    world.insert_resource(IntentLog::default());
    world
}

/// Build the system schedule in the canonical order.
pub fn create_schedule() -> Schedule {
    let mut schedule = Schedule::default();

    schedule.configure_sets((RunSet::Rules, RunSet::Cleanup).chain());

    schedule.add_systems((
        character_intent_system.in_set(RunSet::Rules),
        clear_intents_system.in_set(RunSet::Cleanup),
    ));

    schedule
}
