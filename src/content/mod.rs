pub mod caps;
pub mod catalog;

pub use caps::{CapRegistry, DerivedCap, GroupCap};
pub use catalog::{
    load_catalog, load_default_catalog, AbilityDef, AbilityScope, Catalog, RaceTable, SkillDef,
    StackPolicy,
};
