pub mod eligibility;
pub mod error;
pub mod prerequisite;

pub use eligibility::{
    acquirable, can_acquire, cap_regressions, check_acquire, exceeded_caps, group_usage,
    is_locked, is_supported, locked_abilities, reasons_blocking,
};
pub use error::{EngineError, NotFound};
pub use prerequisite::{Clause, Prerequisite, PrerequisiteContext};
