//! Progress engine: the only writer of `ProgressState`.
//!
//! Every public mutation runs as one synchronous step: update the in-memory
//! state, re-derive the level, re-evaluate zones, persist the full state,
//! then publish events. A failed write never rolls back memory; the next
//! successful write (or `flush`) brings storage up to date.

use crate::affection::AffectionTier;
use crate::catalog::{ItemCatalog, ItemKind};
use crate::config::EngineConfig;
use crate::events::{EventBus, ProgressEvent};
use crate::kv_store::{FileBackend, KvBackend, KvStore};
use crate::levels::LevelProgress;
use crate::rate_limit::{Clock, RateLimiter, SystemClock};
use crate::state::{GymStats, ProgressState};
use crate::zones::{SpecialFlag, ZoneId, ZoneTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::mpsc::Receiver;
use tracing::{debug, info, warn};

/// Result of an XP award
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwardOutcome {
    pub new_total_xp: u64,
    pub new_level: u32,
    pub leveled_up: bool,
    pub newly_unlocked_zones: BTreeSet<ZoneId>,
}

impl AwardOutcome {
    fn unchanged(state: &ProgressState) -> Self {
        Self {
            new_total_xp: state.total_xp,
            new_level: state.current_level,
            leveled_up: false,
            newly_unlocked_zones: BTreeSet::new(),
        }
    }
}

/// Result of a page visit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VisitOutcome {
    FirstVisit { award: AwardOutcome },
    RepeatVisit { award: AwardOutcome },
    /// Same page visited again inside the cooldown
    Throttled { retry_in_ms: u64 },
    /// Blank page id
    Ignored,
}

impl VisitOutcome {
    pub fn award(&self) -> Option<&AwardOutcome> {
        match self {
            VisitOutcome::FirstVisit { award } | VisitOutcome::RepeatVisit { award } => {
                Some(award)
            }
            VisitOutcome::Throttled { .. } | VisitOutcome::Ignored => None,
        }
    }
}

/// Counters for a progress dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub total_xp: u64,
    pub level: u32,
    pub zones_unlocked: usize,
    pub zones_total: usize,
    pub pages_visited: usize,
    pub skills_unlocked: usize,
    pub puzzles_completed: usize,
    pub anime_unlocked: usize,
    pub progress_percent: u8,
}

pub struct EngineBuilder<B: KvBackend> {
    backend: B,
    config: EngineConfig,
    zones: ZoneTable,
    catalog: Option<ItemCatalog>,
    clock: Box<dyn Clock>,
}

impl<B: KvBackend> EngineBuilder<B> {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn zone_table(mut self, zones: ZoneTable) -> Self {
        self.zones = zones;
        self
    }

    /// Overrides the catalog implied by `strict_catalog`
    pub fn catalog(mut self, catalog: ItemCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> ProgressEngine<B> {
        let catalog = self
            .catalog
            .unwrap_or_else(|| ItemCatalog::standard().with_strict(self.config.strict_catalog));
        let store = KvStore::new(self.backend);
        let state = ProgressState::load(&store);

        let mut engine = ProgressEngine {
            state,
            store,
            limiter: RateLimiter::new(self.clock),
            zones: self.zones,
            catalog,
            config: self.config,
            events: EventBus::new(),
            pending: Vec::new(),
            last_persist_error: None,
        };
        engine.repair_loaded_state();
        engine
    }
}

pub struct ProgressEngine<B: KvBackend> {
    state: ProgressState,
    store: KvStore<B>,
    limiter: RateLimiter,
    zones: ZoneTable,
    catalog: ItemCatalog,
    config: EngineConfig,
    events: EventBus,
    pending: Vec<ProgressEvent>,
    last_persist_error: Option<String>,
}

impl ProgressEngine<FileBackend> {
    /// Engine over the file store named by `config`
    pub fn open(config: EngineConfig) -> Self {
        let backend = FileBackend::open(config.storage_path());
        ProgressEngine::builder(backend).config(config).build()
    }
}

impl<B: KvBackend> ProgressEngine<B> {
    pub fn builder(backend: B) -> EngineBuilder<B> {
        EngineBuilder {
            backend,
            config: EngineConfig::default(),
            zones: ZoneTable::standard(),
            catalog: None,
            clock: Box::new(SystemClock),
        }
    }

    /// Engine with default config, standard zones and the wall clock
    pub fn new(backend: B) -> Self {
        Self::builder(backend).build()
    }

    /// Bring freshly loaded state back in line with the invariants
    fn repair_loaded_state(&mut self) {
        let loaded = self.state.clone();

        let level = self.config.level_curve.level_for(self.state.total_xp);
        if level != self.state.current_level {
            warn!(
                "Stored level {} does not match {} XP, using level {}",
                self.state.current_level, self.state.total_xp, level
            );
            self.state.current_level = level;
        }

        let unlocked = self.evaluate_zones();
        if !unlocked.is_empty() {
            info!("Zones unlocked on load: {}", join_zones(&unlocked));
        }

        if self.state != loaded {
            self.commit();
        }
        // Nobody can be subscribed yet
        self.pending.clear();
    }

    // ========== Queries ==========

    /// Read-only view of the current state
    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    pub fn snapshot(&self) -> ProgressState {
        self.state.clone()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn zone_table(&self) -> &ZoneTable {
        &self.zones
    }

    pub fn catalog(&self) -> &ItemCatalog {
        &self.catalog
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Unknown ids are simply not unlocked
    pub fn is_zone_unlocked(&self, zone: &str) -> bool {
        zone.parse::<ZoneId>()
            .map(|z| self.is_unlocked(z))
            .unwrap_or(false)
    }

    pub fn is_unlocked(&self, zone: ZoneId) -> bool {
        self.state.unlocked_zones.contains(&zone)
    }

    /// Unlocked zones as a rounded percentage of the zone table
    pub fn progress_percentage(&self) -> u8 {
        let total = self.zones.len() as u64;
        if total == 0 {
            return 0;
        }
        let unlocked = self.zones_unlocked_count() as u64;
        ((unlocked * 200 + total) / (total * 2)).min(100) as u8
    }

    pub fn zones_unlocked_count(&self) -> usize {
        self.zones.zones().filter(|z| self.is_unlocked(*z)).count()
    }

    pub fn total_zone_count(&self) -> usize {
        self.zones.len()
    }

    pub fn level_progress(&self) -> LevelProgress {
        self.config.level_curve.progress(self.state.total_xp)
    }

    pub fn affection_tier(&self) -> AffectionTier {
        AffectionTier::from_points(self.state.crush_affection)
    }

    pub fn summary(&self) -> ProgressSummary {
        ProgressSummary {
            total_xp: self.state.total_xp,
            level: self.state.current_level,
            zones_unlocked: self.zones_unlocked_count(),
            zones_total: self.total_zone_count(),
            pages_visited: self.state.visited_pages.len(),
            skills_unlocked: self.state.unlocked_skills.len(),
            puzzles_completed: self.state.completed_puzzles.len(),
            anime_unlocked: self.state.unlocked_anime.len(),
            progress_percent: self.progress_percentage(),
        }
    }

    /// Last storage failure, cleared by the next successful write
    pub fn last_persist_error(&self) -> Option<&str> {
        self.last_persist_error.as_deref()
    }

    pub fn subscribe(&mut self) -> Receiver<ProgressEvent> {
        self.events.subscribe()
    }

    pub fn store(&self) -> &KvStore<B> {
        &self.store
    }

    pub fn into_backend(self) -> B {
        self.store.into_backend()
    }

    // ========== Mutations ==========

    /// Grant `amount` XP. Zero or negative amounts change nothing.
    pub fn award_xp(&mut self, amount: i64, source: &str) -> AwardOutcome {
        if amount <= 0 {
            warn!("Ignoring non-positive XP award {} from '{}'", amount, source);
            return AwardOutcome::unchanged(&self.state);
        }
        let outcome = self.apply_award(amount as u64, source);
        self.commit();
        outcome
    }

    /// Visit a page: cooldown gate, then first-visit bonus or repeat trickle
    pub fn visit_page(&mut self, page: &str) -> VisitOutcome {
        let page = page.trim();
        if page.is_empty() {
            return VisitOutcome::Ignored;
        }

        let key = format!("visit:{}", page);
        let cooldown = self.config.visit.cooldown_ms;
        if !self.limiter.try_acquire(&key, cooldown) {
            let retry_in_ms = self.limiter.remaining_ms(&key, cooldown);
            debug!("Visit to '{}' throttled ({} ms left)", page, retry_in_ms);
            return VisitOutcome::Throttled { retry_in_ms };
        }

        let source = format!("visited_{}", page);
        if self.state.visited_pages.insert(page.to_string()) {
            let award = self.apply_award(self.config.visit.first_visit_xp, &source);
            self.commit();
            VisitOutcome::FirstVisit { award }
        } else {
            let award = self.apply_award(self.config.visit.repeat_visit_xp, &source);
            self.commit();
            VisitOutcome::RepeatVisit { award }
        }
    }

    /// One-shot award: true only the first time `id` is unlocked
    pub fn unlock_item(&mut self, kind: ItemKind, id: &str, xp_reward: u64) -> bool {
        if !self.catalog.is_known(kind, id) {
            warn!("Ignoring unknown {} '{}'", kind, id);
            return false;
        }
        if !self.state.items_mut(kind).insert(id.to_string()) {
            debug!("{} '{}' already unlocked", kind, id);
            return false;
        }
        self.pending.push(ProgressEvent::ItemUnlocked {
            kind,
            id: id.to_string(),
        });
        self.apply_award(xp_reward, &kind.source_tag(id));
        self.commit();
        true
    }

    /// `unlock_item` with a kind given by name; unknown kinds return false
    pub fn unlock_item_named(&mut self, kind: &str, id: &str, xp_reward: u64) -> bool {
        match kind.parse::<ItemKind>() {
            Ok(kind) => self.unlock_item(kind, id, xp_reward),
            Err(e) => {
                warn!("{}", e);
                false
            }
        }
    }

    pub fn unlock_skill(&mut self, id: &str) -> bool {
        self.unlock_item(ItemKind::Skill, id, self.config.rewards.skill_xp)
    }

    pub fn complete_puzzle(&mut self, id: &str) -> bool {
        self.unlock_item(ItemKind::Puzzle, id, self.config.rewards.puzzle_xp)
    }

    pub fn unlock_anime(&mut self, id: &str) -> bool {
        self.unlock_item(ItemKind::Anime, id, self.config.rewards.anime_xp)
    }

    /// Set a narrative flag and re-evaluate zones at once
    pub fn set_special_flag(&mut self, flag: SpecialFlag, value: bool) -> BTreeSet<ZoneId> {
        if self.state.special_flags.get(flag) == value {
            return BTreeSet::new();
        }
        self.state.special_flags.set(flag, value);
        info!("Special flag {} set to {}", flag, value);
        self.pending.push(ProgressEvent::FlagChanged { flag, value });

        let unlocked = self.evaluate_zones();
        self.commit();
        unlocked
    }

    /// Adjust the affection counter (never below zero); returns the new value
    pub fn add_affection(&mut self, points: i64) -> i64 {
        let value = self.state.crush_affection.saturating_add(points).max(0);
        if value != self.state.crush_affection {
            self.state.crush_affection = value;
            self.commit();
        }
        value
    }

    pub fn set_gym_stats(&mut self, stats: GymStats) {
        let stats = stats.clamped();
        if stats != self.state.gym_stats {
            self.state.gym_stats = stats;
            self.commit();
        }
    }

    /// Wipe all progress back to a first visit.
    ///
    /// Gym stats are personal data rather than visitor progress and survive.
    pub fn reset_progress(&mut self) {
        let gym_stats = self.state.gym_stats;
        self.state = ProgressState::new();
        self.state.gym_stats = gym_stats;
        self.limiter.clear();
        info!("All progress reset");
        self.pending.push(ProgressEvent::Reset);
        self.commit();
    }

    /// Retry persisting the current state
    pub fn flush(&mut self) -> crate::error::Result<()> {
        self.state.persist(&mut self.store)?;
        self.last_persist_error = None;
        Ok(())
    }

    // ========== Internals ==========

    /// Apply an award to memory only; callers commit
    fn apply_award(&mut self, amount: u64, source: &str) -> AwardOutcome {
        if amount == 0 {
            return AwardOutcome::unchanged(&self.state);
        }

        let old_level = self.state.current_level;
        let new_total = self.state.total_xp.saturating_add(amount);
        let new_level = self.config.level_curve.level_for(new_total);

        self.state.total_xp = new_total;
        self.state.current_level = new_level;
        debug!("+{} XP from '{}' (total {})", amount, source, new_total);
        self.pending.push(ProgressEvent::XpGained {
            amount,
            source: source.to_string(),
            new_total_xp: new_total,
        });

        let leveled_up = new_level > old_level;
        if leveled_up {
            info!("Level up! Now level {}", new_level);
            self.pending.push(ProgressEvent::LeveledUp {
                from: old_level,
                to: new_level,
            });
        }

        let newly_unlocked_zones = self.evaluate_zones();
        AwardOutcome {
            new_total_xp: new_total,
            new_level,
            leveled_up,
            newly_unlocked_zones,
        }
    }

    /// Merge every newly qualifying zone into the state
    fn evaluate_zones(&mut self) -> BTreeSet<ZoneId> {
        let unlocked = self.zones.evaluate(
            self.state.total_xp,
            self.state.current_level,
            &self.state.special_flags,
            &self.state.unlocked_zones,
        );
        if !unlocked.is_empty() {
            info!("New zones unlocked: {}", join_zones(&unlocked));
            self.state.unlocked_zones.extend(unlocked.iter().copied());
            self.pending.push(ProgressEvent::ZonesUnlocked {
                zones: unlocked.clone(),
            });
        }
        unlocked
    }

    /// Persist, then publish queued events
    fn commit(&mut self) {
        match self.state.persist(&mut self.store) {
            Ok(()) => self.last_persist_error = None,
            Err(e) => {
                warn!("Failed to persist progress: {}", e);
                let message = e.to_string();
                self.last_persist_error = Some(message.clone());
                self.pending.push(ProgressEvent::PersistFailed { message });
            }
        }
        for event in self.pending.drain(..) {
            self.events.emit(event);
        }
    }
}

fn join_zones(zones: &BTreeSet<ZoneId>) -> String {
    zones
        .iter()
        .map(|z| z.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
