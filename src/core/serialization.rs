use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::components::character::Character;
use crate::content::catalog::Catalog;
use crate::ledger::repair::consolidate_duplicates;

pub const SAVE_VERSION: u32 = 1;

/// Versioned snapshot handed to the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveState {
    #[serde(default = "default_save_version")]
    pub version: u32,
    pub character: Character,
}

fn default_save_version() -> u32 {
    SAVE_VERSION
}

#[derive(Debug, Error)]
pub enum SaveStateError {
    #[error("failed to encode save state: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode save state: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("unsupported save version {0}")]
    UnsupportedVersion(u32),
}

impl SaveState {
    pub fn new(character: Character) -> Self {
        Self {
            version: SAVE_VERSION,
            character,
        }
    }

    pub fn to_json(&self) -> Result<String, SaveStateError> {
        serde_json::to_string_pretty(self).map_err(SaveStateError::Encode)
    }

    pub fn from_json(raw: &str) -> Result<Self, SaveStateError> {
        let state: SaveState = serde_json::from_str(raw).map_err(SaveStateError::Decode)?;
        if state.version == 0 || state.version > SAVE_VERSION {
            return Err(SaveStateError::UnsupportedVersion(state.version));
        }
        Ok(state)
    }

    /// Character ready for editing, with split stack rows repaired.
    pub fn into_character(self, catalog: &Catalog) -> Character {
        consolidate_duplicates(catalog, &self.character)
    }
}
