//! End-to-end tests for the progress engine.

use folio_common::state::keys;
use folio_common::{
    calculate_level, EngineConfig, FileBackend, ItemKind, KvBackend, LevelCurve, ManualClock,
    MemoryBackend, ProgressEngine, ProgressEvent, SpecialFlag, VisitOutcome, ZoneId,
    ZoneRequirement, ZoneTable,
};
use std::collections::BTreeSet;
use tempfile::tempdir;

fn memory_engine() -> (ProgressEngine<MemoryBackend>, ManualClock) {
    let clock = ManualClock::new(1_700_000_000_000);
    let engine = ProgressEngine::builder(MemoryBackend::new())
        .clock(Box::new(clock.clone()))
        .build();
    (engine, clock)
}

#[test]
fn test_xp_and_sets_never_shrink() {
    let (mut engine, clock) = memory_engine();
    let mut previous = engine.snapshot();

    let pages = ["home", "about", "home", "skills", "about", "contact"];
    for (i, page) in pages.iter().enumerate() {
        clock.advance(1500);
        engine.visit_page(page);
        engine.award_xp((i as i64 + 1) * 37, "click");
        if i % 2 == 0 {
            engine.complete_puzzle("p2");
            engine.unlock_skill("aws");
        }

        let current = engine.snapshot();
        assert!(current.total_xp >= previous.total_xp);
        assert!(current.unlocked_zones.is_superset(&previous.unlocked_zones));
        assert!(current.visited_pages.is_superset(&previous.visited_pages));
        assert!(current.unlocked_skills.is_superset(&previous.unlocked_skills));
        assert!(current.completed_puzzles.is_superset(&previous.completed_puzzles));
        assert!(current.unlocked_anime.is_superset(&previous.unlocked_anime));
        previous = current;
    }
}

#[test]
fn test_level_always_matches_xp() {
    let (mut engine, _) = memory_engine();
    for amount in [1, 998, 1, 1500, 499, 7, 12_000] {
        let outcome = engine.award_xp(amount, "step");
        assert_eq!(outcome.new_level, calculate_level(outcome.new_total_xp));
        assert_eq!(engine.state().current_level, calculate_level(engine.state().total_xp));
    }
}

#[test]
fn test_level_formula_examples() {
    assert_eq!(calculate_level(0), 1);
    assert_eq!(calculate_level(999), 1);
    assert_eq!(calculate_level(1000), 2);
    assert_eq!(calculate_level(2500), 3);
}

#[test]
fn test_custom_table_threshold() {
    let table = ZoneTable::new(vec![
        (ZoneId::Home, ZoneRequirement::new(0, 1)),
        (ZoneId::Skills, ZoneRequirement::new(300, 3)),
    ]);
    // One level per 100 XP so 300 XP is level 4
    let config = EngineConfig {
        level_curve: LevelCurve::Linear { xp_per_level: 100 },
        ..EngineConfig::default()
    };
    let mut engine = ProgressEngine::builder(MemoryBackend::new())
        .config(config)
        .zone_table(table)
        .build();

    let outcome = engine.award_xp(299, "almost");
    assert_eq!(outcome.new_level, 3);
    assert!(!engine.is_unlocked(ZoneId::Skills));

    let outcome = engine.award_xp(1, "there");
    assert_eq!(outcome.newly_unlocked_zones, BTreeSet::from([ZoneId::Skills]));
    assert_eq!(engine.progress_percentage(), 100);
}

#[test]
fn test_special_flag_zone_needs_flag_and_progress() {
    let (mut engine, _) = memory_engine();

    // Flag first, not enough XP yet
    assert!(engine
        .set_special_flag(SpecialFlag::InstagramUnlocked, true)
        .is_empty());
    assert!(!engine.is_unlocked(ZoneId::InstagramUnlock));

    // Crossing the threshold with the flag already set unlocks on that award
    let outcome = engine.award_xp(9000, "grind");
    assert!(outcome.newly_unlocked_zones.contains(&ZoneId::InstagramUnlock));
}

#[test]
fn test_special_flag_off_blocks_zone() {
    let (mut engine, _) = memory_engine();
    engine.award_xp(50_000, "grind");
    assert!(!engine.is_unlocked(ZoneId::InstagramUnlock));
    assert_eq!(engine.zones_unlocked_count(), 10);
}

#[test]
fn test_one_shot_puzzle() {
    let (mut engine, _) = memory_engine();
    assert!(engine.unlock_item(ItemKind::Puzzle, "p1", 100));
    assert!(!engine.unlock_item(ItemKind::Puzzle, "p1", 100));
    assert!(!engine.unlock_item_named("puzzle", "p1", 100));
    assert_eq!(engine.state().total_xp, 100);
}

#[test]
fn test_visit_rate_limit() {
    let (mut engine, clock) = memory_engine();

    assert!(matches!(engine.visit_page("home"), VisitOutcome::FirstVisit { .. }));
    clock.advance(2000);
    assert!(engine.visit_page("home").award().is_none());
    assert_eq!(engine.state().total_xp, 50);

    clock.advance(5000);
    assert!(matches!(engine.visit_page("home"), VisitOutcome::RepeatVisit { .. }));
    clock.advance(5000);
    assert!(matches!(engine.visit_page("home"), VisitOutcome::RepeatVisit { .. }));
    assert_eq!(engine.state().total_xp, 70);

    // Another page has its own cooldown
    assert!(matches!(engine.visit_page("about"), VisitOutcome::FirstVisit { .. }));
}

#[test]
fn test_reset_completeness() {
    let (mut engine, _) = memory_engine();
    let rx = engine.subscribe();
    engine.award_xp(3200, "x");
    engine.visit_page("gym");
    engine.unlock_skill("react");
    engine.complete_puzzle("p3");
    engine.unlock_anime("mha");
    engine.set_special_flag(SpecialFlag::InstagramUnlocked, true);

    engine.reset_progress();

    let state = engine.state();
    assert_eq!(state.total_xp, 0);
    assert_eq!(state.current_level, 1);
    assert_eq!(state.unlocked_zones, BTreeSet::from([ZoneId::Home]));
    assert!(state.visited_pages.is_empty());
    assert!(state.unlocked_skills.is_empty());
    assert!(state.completed_puzzles.is_empty());
    assert!(state.unlocked_anime.is_empty());
    assert!(state.special_flags.enabled().is_empty());
    assert!(rx.try_iter().any(|e| e == ProgressEvent::Reset));

    let stored: Option<u64> = engine.store().read(keys::TOTAL_XP);
    assert_eq!(stored, Some(0));
}

#[test]
fn test_file_roundtrip_reproduces_state() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("storage.json");

    let before = {
        let mut engine = ProgressEngine::new(FileBackend::open(&path));
        engine.visit_page("home");
        engine.award_xp(2600, "quest");
        engine.unlock_anime("onepiece");
        engine.complete_puzzle("nodejs-quiz");
        engine.add_affection(21);
        engine.set_special_flag(SpecialFlag::InstagramUnlocked, true);
        engine.snapshot()
    };

    let reloaded = ProgressEngine::new(FileBackend::open(&path));
    assert_eq!(reloaded.snapshot(), before);
}

#[test]
fn test_startup_repairs_stale_state() {
    let mut backend = MemoryBackend::new();
    backend.set(keys::TOTAL_XP, "1300".to_string()).unwrap();
    backend.set(keys::LEVEL, "9".to_string()).unwrap();
    backend.set(keys::UNLOCKED_ZONES, "[\"about\"]".to_string()).unwrap();

    let engine = ProgressEngine::new(backend);
    let state = engine.state();
    assert_eq!(state.current_level, 2);
    assert!(state.unlocked_zones.contains(&ZoneId::Home));
    assert!(state.unlocked_zones.contains(&ZoneId::Experience));
    assert!(!state.unlocked_zones.contains(&ZoneId::Skills));

    // The repaired state was written back
    let stored: Option<u32> = engine.store().read(keys::LEVEL);
    assert_eq!(stored, Some(2));
}

#[test]
fn test_startup_with_garbage_store() {
    let mut backend = MemoryBackend::new();
    for key in keys::ALL {
        backend.set(key, "{{garbage".to_string()).unwrap();
    }
    let engine = ProgressEngine::new(backend);
    assert_eq!(engine.state().total_xp, 0);
    assert_eq!(engine.state().unlocked_zones, BTreeSet::from([ZoneId::Home]));
}

#[test]
fn test_exponential_curve_from_config() {
    let config = EngineConfig::parse("[level_curve]\nkind = \"exponential\"\n").unwrap();
    let mut engine = ProgressEngine::builder(MemoryBackend::new())
        .config(config)
        .build();

    let outcome = engine.award_xp(250, "x");
    assert_eq!(outcome.new_level, 3);
    let progress = engine.level_progress();
    assert_eq!(progress.current, 0);
    assert_eq!(progress.needed, 225);
}

#[test]
fn test_open_catalog_accepts_new_ids() {
    let config = EngineConfig {
        strict_catalog: false,
        ..EngineConfig::default()
    };
    let mut engine = ProgressEngine::builder(MemoryBackend::new())
        .config(config)
        .build();
    assert!(engine.unlock_skill("rust"));
    assert!(!engine.unlock_skill("rust"));
}
