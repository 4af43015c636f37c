use thiserror::Error;

use crate::components::character::{AbilityVariant, HeldAbilityId};

/// Rejection of an intent. The snapshot the intent was applied to is left
/// unchanged whenever one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("cannot acquire {variant} ability {name}: {}", .reasons.join("; "))]
    IneligibleAbility {
        variant: AbilityVariant,
        name: String,
        reasons: Vec<String>,
    },
    #[error("{name} is granted by race {race} and cannot be removed")]
    LockedAbility { name: String, race: String },
    #[error(transparent)]
    NotFound(#[from] NotFound),
    #[error("{skill} cannot move from level {current} to {requested}")]
    NonMonotonicLevelChange {
        skill: String,
        current: u32,
        requested: u32,
    },
    #[error("mission log cannot number a mission after sequence {last}")]
    MissionLogFull { last: u32 },
}

/// Stale or unknown reference supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotFound {
    #[error("no held ability with id {0}")]
    HeldAbility(HeldAbilityId),
    #[error("unknown skill {0}")]
    Skill(String),
}

impl EngineError {
    pub fn ineligible(variant: AbilityVariant, name: &str, reasons: Vec<String>) -> Self {
        EngineError::IneligibleAbility {
            variant,
            name: name.to_string(),
            reasons,
        }
    }

    /// Reasons to show the player, one per line.
    pub fn reasons(&self) -> Vec<String> {
        match self {
            EngineError::IneligibleAbility { reasons, .. } => reasons.clone(),
            other => vec![other.to_string()],
        }
    }
}
