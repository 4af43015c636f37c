use chrono::{TimeZone, Utc};

use rules_engine::{
    AbilityVariant, Catalog, Character, CharacterIntent, EngineError, HeldAbility, SaveState,
    Session,
};

fn session(character: Character) -> Session {
    Session::new(Catalog::builtin().expect("builtin catalog"), character)
}

#[test]
fn full_play_session_flow() {
    let mut session = session(Character::default());
    let completed_at = Utc.with_ymd_and_hms(2026, 7, 1, 22, 0, 0).unwrap();

    let snapshot = session.submit(vec![
        CharacterIntent::ChangeRace {
            race: Some("Altered".to_string()),
        },
        CharacterIntent::SetSkillLevel {
            skill: "reflex".to_string(),
            level: 1,
        },
        CharacterIntent::FlagMissionSuccess {
            skill: "reflex".to_string(),
            flag: true,
        },
        CharacterIntent::CommitMission { completed_at },
        CharacterIntent::RaiseSkill {
            skill: "reflex".to_string(),
            level: 2,
        },
        CharacterIntent::Acquire {
            variant: AbilityVariant::Skill,
            name: "Evasive Roll".to_string(),
        },
        CharacterIntent::Acquire {
            variant: AbilityVariant::Skill,
            name: "Quickdraw".to_string(),
        },
    ]);

    assert_eq!(snapshot.rejected().count(), 1);
    let rejected = snapshot.rejected().next().unwrap();
    assert!(matches!(
        rejected.result,
        Err(EngineError::IneligibleAbility { .. })
    ));

    let character = &snapshot.character;
    assert_eq!(character.race.as_deref(), Some("Altered"));
    assert_eq!(character.skill_level("reflex"), 2);
    assert_eq!(character.tally_spent("reflex"), 1);
    assert_eq!(snapshot.tally.get("reflex"), Some(&0));
    assert!(character.holds(AbilityVariant::Skill, "Evasive Roll"));
    assert_eq!(snapshot.locked.len(), 2);
}

#[test]
fn locked_release_is_reported_and_ignored() {
    let mut session = session(Character::default());
    let snapshot = session.submit(vec![CharacterIntent::ChangeRace {
        race: Some("Human".to_string()),
    }]);
    let id = snapshot.locked[0];

    let snapshot = session.submit(vec![CharacterIntent::Release { id }]);
    assert!(matches!(
        snapshot.outcomes[0].result,
        Err(EngineError::LockedAbility { .. })
    ));
    assert!(snapshot.character.held(id).is_some());
}

#[test]
fn save_and_reload_preserves_the_character() {
    let mut session = session(Character::default());
    session.submit(vec![
        CharacterIntent::ChangeRace {
            race: Some("Abomination".to_string()),
        },
        CharacterIntent::Acquire {
            variant: AbilityVariant::Race,
            name: "Night Eyes".to_string(),
        },
    ]);
    let raw = session.save_state().to_json().unwrap();

    let restored = Session::from_save(
        Catalog::builtin().unwrap(),
        SaveState::from_json(&raw).unwrap(),
    );
    assert_eq!(restored.character(), session.character());
    assert!(restored
        .reasons_blocking(AbilityVariant::Race, "Night Eyes")
        .contains(&"Night Eyes is already held".to_string()));
}

#[test]
fn opening_a_session_repairs_split_stacks() {
    let mut character = Character::default();
    character
        .abilities
        .push(HeldAbility::new(AbilityVariant::General, "Toughness"));
    character
        .abilities
        .push(HeldAbility::new(AbilityVariant::General, "Toughness").with_count(2));

    let session = session(character);
    assert_eq!(session.character().abilities.len(), 1);
    assert_eq!(session.character().abilities[0].count, 3);
}

#[test]
fn load_state_replaces_the_active_character() {
    let mut session = session(Character::default());
    session.load_state(SaveState::new(Character::with_race("Human")));
    assert_eq!(session.character().race.as_deref(), Some("Human"));
}
