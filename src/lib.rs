// Re-export core modules for use by hosts and tests
pub mod components;
pub mod content;
pub mod core;
pub mod data;
pub mod ledger;
pub mod rules;
pub mod systems;

// Expose the session wrapper and the types needed to drive it
pub use crate::components::character::{
    AbilityVariant, Character, HeldAbility, HeldAbilityId, MissionLogEntry,
};
pub use crate::content::catalog::Catalog;
pub use crate::core::serialization::SaveState;
pub use crate::core::world::{Session, SessionSnapshot};
pub use crate::rules::error::{EngineError, NotFound};
pub use crate::systems::character::{CharacterIntent, IntentOutcome};
