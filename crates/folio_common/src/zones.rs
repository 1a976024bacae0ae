//! Zones, special flags, and the zone unlock evaluator.
//!
//! ## Standard zone table
//!
//! | Zone            | Min XP | Min Level | Special           |
//! |-----------------|--------|-----------|-------------------|
//! | home            | 0      | 1         |                   |
//! | about           | 100    | 1         |                   |
//! | experience      | 250    | 2         |                   |
//! | skills          | 500    | 3         |                   |
//! | projects        | 750    | 4         |                   |
//! | gym             | 1000   | 5         |                   |
//! | animeverse      | 1250   | 6         |                   |
//! | shaayari        | 1500   | 7         |                   |
//! | secretcrush     | 2000   | 8         |                   |
//! | contact         | 100    | 1         |                   |
//! | instagramunlock | 3000   | 10        | instagramUnlocked |
//!
//! XP, level and flag conditions are AND-ed. Evaluation always scans the
//! whole table so several conditions changing in one update cannot hide an
//! unlock.

use crate::error::FolioError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A gated content area
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneId {
    Home,
    About,
    Experience,
    Skills,
    Projects,
    Gym,
    Animeverse,
    Shaayari,
    SecretCrush,
    Contact,
    InstagramUnlock,
}

impl ZoneId {
    pub const ALL: [ZoneId; 11] = [
        ZoneId::Home,
        ZoneId::About,
        ZoneId::Experience,
        ZoneId::Skills,
        ZoneId::Projects,
        ZoneId::Gym,
        ZoneId::Animeverse,
        ZoneId::Shaayari,
        ZoneId::SecretCrush,
        ZoneId::Contact,
        ZoneId::InstagramUnlock,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneId::Home => "home",
            ZoneId::About => "about",
            ZoneId::Experience => "experience",
            ZoneId::Skills => "skills",
            ZoneId::Projects => "projects",
            ZoneId::Gym => "gym",
            ZoneId::Animeverse => "animeverse",
            ZoneId::Shaayari => "shaayari",
            ZoneId::SecretCrush => "secretcrush",
            ZoneId::Contact => "contact",
            ZoneId::InstagramUnlock => "instagramunlock",
        }
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ZoneId {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ZoneId::ALL
            .iter()
            .copied()
            .find(|z| z.as_str() == wanted)
            .ok_or_else(|| FolioError::UnknownZone(s.to_string()))
    }
}

/// Narrative conditions independent of XP
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SpecialFlag {
    #[serde(rename = "instagramUnlocked")]
    InstagramUnlocked,
}

impl SpecialFlag {
    pub const ALL: [SpecialFlag; 1] = [SpecialFlag::InstagramUnlocked];

    /// Persisted key (and display name)
    pub fn key(&self) -> &'static str {
        match self {
            SpecialFlag::InstagramUnlocked => "instagramUnlocked",
        }
    }
}

impl fmt::Display for SpecialFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for SpecialFlag {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "instagramunlocked" | "instagram" => Ok(SpecialFlag::InstagramUnlocked),
            _ => Err(FolioError::UnknownFlag(s.to_string())),
        }
    }
}

/// Boolean value of every special flag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialFlags {
    #[serde(rename = "instagramUnlocked")]
    pub instagram_unlocked: bool,
}

impl SpecialFlags {
    pub fn get(&self, flag: SpecialFlag) -> bool {
        match flag {
            SpecialFlag::InstagramUnlocked => self.instagram_unlocked,
        }
    }

    pub fn set(&mut self, flag: SpecialFlag, value: bool) {
        match flag {
            SpecialFlag::InstagramUnlocked => self.instagram_unlocked = value,
        }
    }

    /// Flags currently true
    pub fn enabled(&self) -> Vec<SpecialFlag> {
        SpecialFlag::ALL
            .iter()
            .copied()
            .filter(|f| self.get(*f))
            .collect()
    }
}

/// Gate for a single zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneRequirement {
    pub min_xp: u64,
    pub min_level: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special: Option<SpecialFlag>,
}

impl ZoneRequirement {
    pub const fn new(min_xp: u64, min_level: u32) -> Self {
        Self {
            min_xp,
            min_level,
            special: None,
        }
    }

    pub const fn with_flag(mut self, flag: SpecialFlag) -> Self {
        self.special = Some(flag);
        self
    }

    pub fn is_met(&self, total_xp: u64, level: u32, flags: &SpecialFlags) -> bool {
        let meets_xp = total_xp >= self.min_xp;
        let meets_level = level >= self.min_level;
        let meets_special = self.special.map_or(true, |f| flags.get(f));
        meets_xp && meets_level && meets_special
    }
}

/// Zone every visitor starts with
pub const DEFAULT_ZONE: ZoneId = ZoneId::Home;

pub const STANDARD_ZONES: &[(ZoneId, ZoneRequirement)] = &[
    (ZoneId::Home, ZoneRequirement::new(0, 1)),
    (ZoneId::About, ZoneRequirement::new(100, 1)),
    (ZoneId::Experience, ZoneRequirement::new(250, 2)),
    (ZoneId::Skills, ZoneRequirement::new(500, 3)),
    (ZoneId::Projects, ZoneRequirement::new(750, 4)),
    (ZoneId::Gym, ZoneRequirement::new(1000, 5)),
    (ZoneId::Animeverse, ZoneRequirement::new(1250, 6)),
    (ZoneId::Shaayari, ZoneRequirement::new(1500, 7)),
    (ZoneId::SecretCrush, ZoneRequirement::new(2000, 8)),
    (ZoneId::Contact, ZoneRequirement::new(100, 1)),
    (
        ZoneId::InstagramUnlock,
        ZoneRequirement::new(3000, 10).with_flag(SpecialFlag::InstagramUnlocked),
    ),
];

/// Immutable requirement table
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneTable {
    entries: Vec<(ZoneId, ZoneRequirement)>,
}

impl Default for ZoneTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl ZoneTable {
    pub fn standard() -> Self {
        Self::new(STANDARD_ZONES.to_vec())
    }

    /// Build a table; later duplicates of a zone are dropped
    pub fn new(entries: Vec<(ZoneId, ZoneRequirement)>) -> Self {
        let mut seen = BTreeSet::new();
        let entries = entries
            .into_iter()
            .filter(|(zone, _)| seen.insert(*zone))
            .collect();
        Self { entries }
    }

    pub fn requirement(&self, zone: ZoneId) -> Option<&ZoneRequirement> {
        self.entries.iter().find(|(z, _)| *z == zone).map(|(_, r)| r)
    }

    pub fn zones(&self) -> impl Iterator<Item = ZoneId> + '_ {
        self.entries.iter().map(|(z, _)| *z)
    }

    pub fn entries(&self) -> &[(ZoneId, ZoneRequirement)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Zones that qualify now and are not yet unlocked
    pub fn evaluate(
        &self,
        total_xp: u64,
        level: u32,
        flags: &SpecialFlags,
        already_unlocked: &BTreeSet<ZoneId>,
    ) -> BTreeSet<ZoneId> {
        self.entries
            .iter()
            .filter(|(zone, _)| !already_unlocked.contains(zone))
            .filter(|(_, req)| req.is_met(total_xp, level, flags))
            .map(|(zone, _)| *zone)
            .collect()
    }
}

/// Newly qualifying zones for the given progress
pub fn evaluate_unlocks(
    table: &ZoneTable,
    total_xp: u64,
    level: u32,
    flags: &SpecialFlags,
    already_unlocked: &BTreeSet<ZoneId>,
) -> BTreeSet<ZoneId> {
    table.evaluate(total_xp, level, flags, already_unlocked)
}
