//! Level calculator.
//!
//! Maps cumulative XP to a level number. The linear curve is authoritative:
//! the zone table's XP and level thresholds are tuned for it. The exponential
//! curve exists only as an explicit configuration choice.
//!
//! ## Linear curve (default)
//!
//! level = floor(xp / xp_per_level) + 1, with xp_per_level = 1000:
//! - 0..=999 XP: level 1
//! - 1000..=1999 XP: level 2
//! - 2500 XP: level 3
//!
//! ## Exponential curve
//!
//! Leaving level L costs floor(base_xp * growth^(L-1)) XP. With the defaults
//! (100, 1.5) level 2 starts at 100 XP, level 3 at 250, level 4 at 475.

use serde::{Deserialize, Serialize};

/// XP width of one level on the default linear curve
pub const XP_PER_LEVEL: u64 = 1000;

/// Upper bound for the exponential curve so degenerate settings terminate
pub const MAX_EXPONENTIAL_LEVEL: u32 = 10_000;

const DEFAULT_BASE_XP: u64 = 100;
const DEFAULT_GROWTH: f64 = 1.5;

fn default_xp_per_level() -> u64 {
    XP_PER_LEVEL
}

fn default_base_xp() -> u64 {
    DEFAULT_BASE_XP
}

fn default_growth() -> f64 {
    DEFAULT_GROWTH
}

/// Level for `total_xp` on the default linear curve
pub fn calculate_level(total_xp: u64) -> u32 {
    LevelCurve::default().level_for(total_xp)
}

/// The active XP-to-level scheme
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LevelCurve {
    Linear {
        #[serde(default = "default_xp_per_level")]
        xp_per_level: u64,
    },
    Exponential {
        #[serde(default = "default_base_xp")]
        base_xp: u64,
        #[serde(default = "default_growth")]
        growth: f64,
    },
}

impl Default for LevelCurve {
    fn default() -> Self {
        LevelCurve::Linear {
            xp_per_level: XP_PER_LEVEL,
        }
    }
}

impl LevelCurve {
    /// Level reached with `total_xp`. Total, never below 1.
    pub fn level_for(&self, total_xp: u64) -> u32 {
        match *self {
            LevelCurve::Linear { xp_per_level } => {
                let band = total_xp / xp_per_level.max(1);
                u32::try_from(band.saturating_add(1)).unwrap_or(u32::MAX)
            }
            LevelCurve::Exponential { .. } => {
                let mut level = 1u32;
                let mut next_threshold = self.step(1);
                while level < MAX_EXPONENTIAL_LEVEL && total_xp >= next_threshold {
                    level += 1;
                    next_threshold = next_threshold.saturating_add(self.step(level));
                }
                level
            }
        }
    }

    /// Cumulative XP at which `level` begins
    pub fn xp_to_reach(&self, level: u32) -> u64 {
        if level <= 1 {
            return 0;
        }
        match *self {
            LevelCurve::Linear { xp_per_level } => {
                u64::from(level - 1).saturating_mul(xp_per_level.max(1))
            }
            LevelCurve::Exponential { .. } => (1..level)
                .map(|l| self.step(l))
                .fold(0u64, |acc, s| acc.saturating_add(s)),
        }
    }

    /// XP needed to go from `level` to `level + 1`
    fn step(&self, level: u32) -> u64 {
        match *self {
            LevelCurve::Linear { xp_per_level } => xp_per_level.max(1),
            LevelCurve::Exponential { base_xp, growth } => {
                let growth = if growth.is_finite() { growth.max(1.0) } else { 1.0 };
                let cost = base_xp.max(1) as f64 * growth.powi(level as i32 - 1);
                if cost >= u64::MAX as f64 {
                    u64::MAX
                } else {
                    (cost.floor() as u64).max(1)
                }
            }
        }
    }

    /// Progress within the current level
    pub fn progress(&self, total_xp: u64) -> LevelProgress {
        let level = self.level_for(total_xp);
        let start = self.xp_to_reach(level);
        let needed = self.step(level);
        let current = total_xp.saturating_sub(start).min(needed);
        let percentage = ((current as u128 * 100) / needed.max(1) as u128).min(100) as u8;
        LevelProgress {
            level,
            current,
            needed,
            percentage,
        }
    }

    /// Short human description naming the active scheme
    pub fn describe(&self) -> String {
        match self {
            LevelCurve::Linear { xp_per_level } => {
                format!("linear ({} XP per level)", xp_per_level)
            }
            LevelCurve::Exponential { base_xp, growth } => {
                format!("exponential (base {} XP, x{} per level)", base_xp, growth)
            }
        }
    }
}

/// XP progress inside the current level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelProgress {
    pub level: u32,
    /// XP earned since the level began
    pub current: u64,
    /// XP width of the level
    pub needed: u64,
    /// 0-100
    pub percentage: u8,
}
