//! Command handlers for folioctl

use anyhow::{bail, Context, Result};
use folio_common::{
    EngineConfig, FileBackend, ItemKind, ProgressEngine, ProgressEvent, SpecialFlag, VisitOutcome,
};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use tracing::debug;

type Engine = ProgressEngine<FileBackend>;

/// Resolve config from an explicit file or the user config
pub fn load_config(path: Option<&Path>, store: Option<PathBuf>) -> Result<EngineConfig> {
    let mut config = match path {
        Some(path) => EngineConfig::load_from(path)?,
        None => EngineConfig::load()?,
    };
    if store.is_some() {
        config.storage.path = store;
    }
    debug!("Using store {}", config.storage_path().display());
    Ok(config)
}

fn open(config: EngineConfig) -> (Engine, Receiver<ProgressEvent>) {
    let mut engine = ProgressEngine::open(config);
    let events = engine.subscribe();
    (engine, events)
}

/// Print queued notifications the way the UI would toast them
fn print_events(events: &Receiver<ProgressEvent>) {
    for event in events.try_iter() {
        let line = event.format_toast();
        match event {
            ProgressEvent::XpGained { .. } => println!("  {}", line.yellow()),
            ProgressEvent::LeveledUp { .. } => println!("  {}", line.bold().magenta()),
            ProgressEvent::ZonesUnlocked { .. } => println!("  {}", line.green()),
            ProgressEvent::PersistFailed { .. } => eprintln!("  {}", line.red()),
            _ => println!("  {}", line),
        }
    }
}

fn progress_bar(percent: u8, width: usize) -> String {
    let filled = (percent as usize * width) / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

pub fn status(config: EngineConfig, json: bool) -> Result<()> {
    let (engine, _) = open(config);

    if json {
        let out = serde_json::to_string_pretty(engine.state())?;
        println!("{}", out);
        return Ok(());
    }

    let summary = engine.summary();
    let level = engine.level_progress();
    let state = engine.state();

    println!("{}", "Folio progress".bold());
    println!();
    println!(
        "  Level {}  {}  {}/{} XP",
        summary.level.to_string().yellow(),
        progress_bar(level.percentage, 20),
        level.current,
        level.needed
    );
    println!("  Total XP        {}", summary.total_xp);
    println!(
        "  Zones           {}/{} ({}%)",
        summary.zones_unlocked, summary.zones_total, summary.progress_percent
    );
    println!("  Pages visited   {}", summary.pages_visited);
    println!("  Skills          {}", summary.skills_unlocked);
    println!("  Puzzles         {}", summary.puzzles_completed);
    println!("  Anime           {}", summary.anime_unlocked);
    println!(
        "  Affection       {} ({})",
        state.crush_affection,
        engine.affection_tier().label()
    );
    println!(
        "  Gym             strength {:.0}%  endurance {:.0}%  consistency {:.0}%",
        state.gym_stats.strength, state.gym_stats.endurance, state.gym_stats.consistency
    );
    Ok(())
}

pub fn zones(config: EngineConfig) -> Result<()> {
    let (engine, _) = open(config);

    println!("{:<16} {:>7} {:>6}  {:<18} {}", "ZONE", "MIN XP", "LEVEL", "SPECIAL", "STATE");
    for (zone, req) in engine.zone_table().entries() {
        let special = req.special.map(|f| f.key()).unwrap_or("-");
        let state = if engine.is_unlocked(*zone) {
            "unlocked".green().to_string()
        } else {
            "locked".red().to_string()
        };
        println!(
            "{:<16} {:>7} {:>6}  {:<18} {}",
            zone.as_str(),
            req.min_xp,
            req.min_level,
            special,
            state
        );
    }
    Ok(())
}

pub fn visit(config: EngineConfig, page: &str) -> Result<()> {
    let (mut engine, events) = open(config);

    match engine.visit_page(page) {
        VisitOutcome::FirstVisit { .. } => println!("First visit to '{}'", page),
        VisitOutcome::RepeatVisit { .. } => println!("Welcome back to '{}'", page),
        VisitOutcome::Throttled { retry_in_ms } => {
            println!("'{}' visited too recently, try again in {} ms", page, retry_in_ms)
        }
        VisitOutcome::Ignored => bail!("Page name must not be empty"),
    }
    print_events(&events);
    Ok(())
}

pub fn award(config: EngineConfig, amount: i64, source: &str) -> Result<()> {
    if amount <= 0 {
        println!("{}", "Only positive amounts grant XP; nothing changed".dimmed());
        return Ok(());
    }
    let (mut engine, events) = open(config);
    let outcome = engine.award_xp(amount, source);
    println!("Total XP {} (level {})", outcome.new_total_xp, outcome.new_level);
    print_events(&events);
    Ok(())
}

pub fn unlock(config: EngineConfig, kind: &str, id: &str, xp: Option<u64>) -> Result<()> {
    let kind: ItemKind = kind.parse()?;
    let reward = xp.unwrap_or_else(|| config.rewards.for_kind(kind));
    let (mut engine, events) = open(config);

    if engine.unlock_item(kind, id, reward) {
        println!("Unlocked {} '{}'", kind, id);
    } else if engine.state().items(kind).contains(id) {
        println!("{} '{}' was already unlocked", kind, id);
    } else {
        bail!("Unknown {} '{}'", kind, id);
    }
    print_events(&events);
    Ok(())
}

pub fn flag(config: EngineConfig, name: &str, value: &str) -> Result<()> {
    let flag: SpecialFlag = name.parse()?;
    let value = match value.to_lowercase().as_str() {
        "on" | "true" | "1" => true,
        "off" | "false" | "0" => false,
        other => bail!("Flag value must be on or off, got '{}'", other),
    };
    let (mut engine, events) = open(config);
    if engine.state().special_flags.get(flag) == value {
        println!("{} already {}", flag, value);
        return Ok(());
    }
    // The FlagChanged toast reports the new value
    engine.set_special_flag(flag, value);
    print_events(&events);
    Ok(())
}

pub fn affection(config: EngineConfig, points: i64) -> Result<()> {
    let (mut engine, events) = open(config);
    let value = engine.add_affection(points);
    println!("Affection {} ({})", value, engine.affection_tier().label());
    print_events(&events);
    Ok(())
}

pub fn show_config(config: &EngineConfig) -> Result<()> {
    println!("# level scheme: {}", config.level_curve.describe());
    println!("# store: {}", config.storage_path().display());
    print!("{}", config.to_toml().context("Cannot render config")?);
    Ok(())
}

pub fn reset(config: EngineConfig, yes: bool) -> Result<()> {
    if !yes {
        bail!("Reset erases all progress; re-run with --yes to confirm");
    }
    let (mut engine, events) = open(config);
    engine.reset_progress();
    print_events(&events);
    Ok(())
}
