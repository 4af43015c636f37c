pub mod acquisition;
pub mod progression;
pub mod repair;

pub use acquisition::{
    acquire, annotate, reconcile_race, reconcile_race_between, release, set_stack_count,
};
pub use progression::{
    commit_mission, commit_mission_now, effective_tally, mark_mission_success, raise_skill_level,
    set_skill_level,
};
pub use repair::{consolidate_duplicates, prune_unsupported};
