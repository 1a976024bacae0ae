//! Progress state and its persisted layout.
//!
//! Each field is stored under its own key:
//!
//! | Key               | JSON shape                                     |
//! |-------------------|------------------------------------------------|
//! | portfolioXP       | integer                                        |
//! | portfolioLevel    | integer                                        |
//! | unlockedZones     | array of string                                |
//! | visitedPages      | array of string                                |
//! | unlockedSkills    | array of string                                |
//! | completedPuzzles  | array of string                                |
//! | unlockedAnime     | array of string                                |
//! | instagramUnlocked | boolean                                        |
//! | crushAffection    | integer                                        |
//! | gymStats          | { strength, endurance, consistency } (numbers) |
//!
//! Absent or malformed keys load as their defaults.

use crate::catalog::ItemKind;
use crate::error::Result;
use crate::kv_store::{KvBackend, KvStore};
use crate::zones::{SpecialFlag, SpecialFlags, ZoneId, DEFAULT_ZONE};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeSet;
use tracing::warn;

/// Storage keys
pub mod keys {
    pub const TOTAL_XP: &str = "portfolioXP";
    pub const LEVEL: &str = "portfolioLevel";
    pub const UNLOCKED_ZONES: &str = "unlockedZones";
    pub const VISITED_PAGES: &str = "visitedPages";
    pub const UNLOCKED_SKILLS: &str = "unlockedSkills";
    pub const COMPLETED_PUZZLES: &str = "completedPuzzles";
    pub const UNLOCKED_ANIME: &str = "unlockedAnime";
    pub const INSTAGRAM_UNLOCKED: &str = "instagramUnlocked";
    pub const CRUSH_AFFECTION: &str = "crushAffection";
    pub const GYM_STATS: &str = "gymStats";

    pub const ALL: [&str; 10] = [
        TOTAL_XP,
        LEVEL,
        UNLOCKED_ZONES,
        VISITED_PAGES,
        UNLOCKED_SKILLS,
        COMPLETED_PUZZLES,
        UNLOCKED_ANIME,
        INSTAGRAM_UNLOCKED,
        CRUSH_AFFECTION,
        GYM_STATS,
    ];
}

/// Personal training stats shown in the gym zone (percentages)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GymStats {
    pub strength: f64,
    pub endurance: f64,
    pub consistency: f64,
}

impl Default for GymStats {
    fn default() -> Self {
        Self {
            strength: 85.0,
            endurance: 78.0,
            consistency: 92.0,
        }
    }
}

impl GymStats {
    /// Copy with every stat clamped to 0..=100 (non-finite becomes 0)
    pub fn clamped(&self) -> Self {
        fn clamp(v: f64) -> f64 {
            if v.is_finite() {
                v.clamp(0.0, 100.0)
            } else {
                0.0
            }
        }
        Self {
            strength: clamp(self.strength),
            endurance: clamp(self.endurance),
            consistency: clamp(self.consistency),
        }
    }
}

/// The single source of truth for a visitor's progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressState {
    pub total_xp: u64,
    pub current_level: u32,
    pub unlocked_zones: BTreeSet<ZoneId>,
    pub visited_pages: BTreeSet<String>,
    pub unlocked_skills: BTreeSet<String>,
    pub completed_puzzles: BTreeSet<String>,
    pub unlocked_anime: BTreeSet<String>,
    pub special_flags: SpecialFlags,
    pub crush_affection: i64,
    pub gym_stats: GymStats,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressState {
    pub fn new() -> Self {
        Self {
            total_xp: 0,
            current_level: 1,
            unlocked_zones: BTreeSet::from([DEFAULT_ZONE]),
            visited_pages: BTreeSet::new(),
            unlocked_skills: BTreeSet::new(),
            completed_puzzles: BTreeSet::new(),
            unlocked_anime: BTreeSet::new(),
            special_flags: SpecialFlags::default(),
            crush_affection: 0,
            gym_stats: GymStats::default(),
        }
    }

    pub fn items(&self, kind: ItemKind) -> &BTreeSet<String> {
        match kind {
            ItemKind::Skill => &self.unlocked_skills,
            ItemKind::Puzzle => &self.completed_puzzles,
            ItemKind::Anime => &self.unlocked_anime,
        }
    }

    pub(crate) fn items_mut(&mut self, kind: ItemKind) -> &mut BTreeSet<String> {
        match kind {
            ItemKind::Skill => &mut self.unlocked_skills,
            ItemKind::Puzzle => &mut self.completed_puzzles,
            ItemKind::Anime => &mut self.unlocked_anime,
        }
    }

    /// Read every field from `store`, defaulting per field
    pub fn load<B: KvBackend>(store: &KvStore<B>) -> Self {
        let defaults = Self::new();

        let zone_names: Vec<String> = store.read_or(keys::UNLOCKED_ZONES, Vec::new());
        let mut unlocked_zones = BTreeSet::new();
        for name in &zone_names {
            match name.parse::<ZoneId>() {
                Ok(zone) => {
                    unlocked_zones.insert(zone);
                }
                Err(_) => warn!("Dropping unknown persisted zone '{}'", name),
            }
        }
        unlocked_zones.insert(DEFAULT_ZONE);

        let mut special_flags = SpecialFlags::default();
        special_flags.set(
            SpecialFlag::InstagramUnlocked,
            store.read_or(keys::INSTAGRAM_UNLOCKED, false),
        );

        Self {
            total_xp: store.read_or(keys::TOTAL_XP, defaults.total_xp),
            current_level: store
                .read_or(keys::LEVEL, defaults.current_level)
                .max(1),
            unlocked_zones,
            visited_pages: read_set(store, keys::VISITED_PAGES),
            unlocked_skills: read_set(store, keys::UNLOCKED_SKILLS),
            completed_puzzles: read_set(store, keys::COMPLETED_PUZZLES),
            unlocked_anime: read_set(store, keys::UNLOCKED_ANIME),
            special_flags,
            crush_affection: store.read_or(keys::CRUSH_AFFECTION, defaults.crush_affection),
            gym_stats: store.read_or(keys::GYM_STATS, defaults.gym_stats),
        }
    }

    /// Every persisted key with its JSON value
    pub fn to_entries(&self) -> Vec<(&'static str, serde_json::Value)> {
        let zones: Vec<&str> = self.unlocked_zones.iter().map(|z| z.as_str()).collect();
        vec![
            (keys::TOTAL_XP, json!(self.total_xp)),
            (keys::LEVEL, json!(self.current_level)),
            (keys::UNLOCKED_ZONES, json!(zones)),
            (keys::VISITED_PAGES, json!(self.visited_pages)),
            (keys::UNLOCKED_SKILLS, json!(self.unlocked_skills)),
            (keys::COMPLETED_PUZZLES, json!(self.completed_puzzles)),
            (keys::UNLOCKED_ANIME, json!(self.unlocked_anime)),
            (
                keys::INSTAGRAM_UNLOCKED,
                json!(self.special_flags.get(SpecialFlag::InstagramUnlocked)),
            ),
            (keys::CRUSH_AFFECTION, json!(self.crush_affection)),
            (keys::GYM_STATS, json!(self.gym_stats)),
        ]
    }

    /// Rewrite every key in one backend write
    pub fn persist<B: KvBackend>(&self, store: &mut KvStore<B>) -> Result<()> {
        store.write_all(self.to_entries())
    }
}

fn read_set<B: KvBackend>(store: &KvStore<B>, key: &str) -> BTreeSet<String> {
    let items: Vec<String> = store.read_or(key, Vec::new());
    items.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv_store::MemoryBackend;

    #[test]
    fn test_defaults_from_empty_store() {
        let store = KvStore::new(MemoryBackend::new());
        let state = ProgressState::load(&store);
        assert_eq!(state, ProgressState::new());
        assert!(state.unlocked_zones.contains(&ZoneId::Home));
        assert_eq!(state.gym_stats.strength, 85.0);
    }

    #[test]
    fn test_persist_and_load_roundtrip() {
        let mut state = ProgressState::new();
        state.total_xp = 1350;
        state.current_level = 2;
        state.unlocked_zones.insert(ZoneId::About);
        state.visited_pages.insert("about".to_string());
        state.completed_puzzles.insert("p1".to_string());
        state.special_flags.set(SpecialFlag::InstagramUnlocked, true);
        state.crush_affection = 17;

        let mut store = KvStore::new(MemoryBackend::new());
        state.persist(&mut store).unwrap();
        assert_eq!(ProgressState::load(&store), state);
    }

    #[test]
    fn test_persisted_layout() {
        let mut store = KvStore::new(MemoryBackend::new());
        ProgressState::new().persist(&mut store).unwrap();

        let backend = store.backend();
        assert_eq!(backend.get(keys::TOTAL_XP).as_deref(), Some("0"));
        assert_eq!(backend.get(keys::UNLOCKED_ZONES).as_deref(), Some("[\"home\"]"));
        assert_eq!(backend.get(keys::INSTAGRAM_UNLOCKED).as_deref(), Some("false"));
        assert_eq!(backend.keys().len(), keys::ALL.len());
    }

    #[test]
    fn test_malformed_fields_use_defaults() {
        let mut backend = MemoryBackend::new();
        backend.set(keys::TOTAL_XP, "-40".to_string()).unwrap();
        backend.set(keys::VISITED_PAGES, "{\"oops\":1}".to_string()).unwrap();
        backend.set(keys::GYM_STATS, "[1,2]".to_string()).unwrap();
        backend.set(keys::CRUSH_AFFECTION, "12".to_string()).unwrap();
        let store = KvStore::new(backend);

        let state = ProgressState::load(&store);
        assert_eq!(state.total_xp, 0);
        assert!(state.visited_pages.is_empty());
        assert_eq!(state.gym_stats, GymStats::default());
        assert_eq!(state.crush_affection, 12);
    }

    #[test]
    fn test_unknown_zones_dropped_and_home_restored() {
        let mut backend = MemoryBackend::new();
        backend
            .set(keys::UNLOCKED_ZONES, "[\"about\",\"moonbase\"]".to_string())
            .unwrap();
        let state = ProgressState::load(&KvStore::new(backend));
        assert_eq!(
            state.unlocked_zones,
            BTreeSet::from([ZoneId::Home, ZoneId::About])
        );
    }

    #[test]
    fn test_gym_stats_clamped() {
        let stats = GymStats {
            strength: 140.0,
            endurance: -3.0,
            consistency: f64::NAN,
        }
        .clamped();
        assert_eq!(stats.strength, 100.0);
        assert_eq!(stats.endurance, 0.0);
        assert_eq!(stats.consistency, 0.0);
    }
}
