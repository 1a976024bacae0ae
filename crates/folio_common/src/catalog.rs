//! One-shot item kinds and the catalog of known ids.

use crate::error::FolioError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Skills shown on the skills page
pub const STANDARD_SKILLS: &[&str] = &[
    "nodejs",
    "nestjs",
    "express",
    "react",
    "tailwind",
    "aws",
    "docker",
    "postgresql",
    "mongodb",
];

/// Anime cards in the animeverse
pub const STANDARD_ANIME: &[&str] = &["mha", "jjk", "onepiece", "aot"];

/// Free-standing puzzles; every skill also has a `<skill>-quiz` puzzle
pub const STANDARD_PUZZLES: &[&str] = &["p1", "p2", "p3", "p4", "p5"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Skill,
    Puzzle,
    Anime,
}

impl ItemKind {
    pub const ALL: [ItemKind; 3] = [ItemKind::Skill, ItemKind::Puzzle, ItemKind::Anime];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Skill => "skill",
            ItemKind::Puzzle => "puzzle",
            ItemKind::Anime => "anime",
        }
    }

    /// Prefix used in XP source tags
    pub fn source_tag(&self, id: &str) -> String {
        format!("{}_{}", self.as_str(), id)
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "skill" | "skills" => Ok(ItemKind::Skill),
            "puzzle" | "puzzles" => Ok(ItemKind::Puzzle),
            "anime" => Ok(ItemKind::Anime),
            _ => Err(FolioError::UnknownItemKind(s.to_string())),
        }
    }
}

/// Known item ids per kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemCatalog {
    skills: BTreeSet<String>,
    puzzles: BTreeSet<String>,
    anime: BTreeSet<String>,
    strict: bool,
}

impl Default for ItemCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl ItemCatalog {
    /// Portfolio content ids, rejecting anything else
    pub fn standard() -> Self {
        let skills: BTreeSet<String> = STANDARD_SKILLS.iter().map(|s| s.to_string()).collect();
        let puzzles = STANDARD_PUZZLES
            .iter()
            .map(|p| p.to_string())
            .chain(skills.iter().map(|s| format!("{}-quiz", s)))
            .collect();
        Self {
            skills,
            puzzles,
            anime: STANDARD_ANIME.iter().map(|a| a.to_string()).collect(),
            strict: true,
        }
    }

    /// Accept any non-empty id
    pub fn open() -> Self {
        Self {
            strict: false,
            ..Self::standard()
        }
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Register an extra id
    pub fn with_item(mut self, kind: ItemKind, id: &str) -> Self {
        self.ids_mut(kind).insert(id.to_string());
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn ids(&self, kind: ItemKind) -> &BTreeSet<String> {
        match kind {
            ItemKind::Skill => &self.skills,
            ItemKind::Puzzle => &self.puzzles,
            ItemKind::Anime => &self.anime,
        }
    }

    fn ids_mut(&mut self, kind: ItemKind) -> &mut BTreeSet<String> {
        match kind {
            ItemKind::Skill => &mut self.skills,
            ItemKind::Puzzle => &mut self.puzzles,
            ItemKind::Anime => &mut self.anime,
        }
    }

    pub fn is_known(&self, kind: ItemKind, id: &str) -> bool {
        if id.trim().is_empty() {
            return false;
        }
        !self.strict || self.ids(kind).contains(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog() {
        let catalog = ItemCatalog::standard();
        assert!(catalog.is_known(ItemKind::Skill, "react"));
        assert!(catalog.is_known(ItemKind::Puzzle, "p1"));
        assert!(catalog.is_known(ItemKind::Puzzle, "docker-quiz"));
        assert!(catalog.is_known(ItemKind::Anime, "jjk"));
        assert!(!catalog.is_known(ItemKind::Anime, "react"));
        assert!(!catalog.is_known(ItemKind::Skill, "cobol"));
    }

    #[test]
    fn test_open_catalog_accepts_any_id() {
        let catalog = ItemCatalog::open();
        assert!(catalog.is_known(ItemKind::Skill, "cobol"));
        assert!(!catalog.is_known(ItemKind::Skill, "  "));
    }

    #[test]
    fn test_with_item() {
        let catalog = ItemCatalog::standard().with_item(ItemKind::Anime, "naruto");
        assert!(catalog.is_known(ItemKind::Anime, "naruto"));
    }

    #[test]
    fn test_kind_parse_and_tag() {
        assert_eq!("Skills".parse::<ItemKind>().unwrap(), ItemKind::Skill);
        assert!("badge".parse::<ItemKind>().is_err());
        assert_eq!(ItemKind::Puzzle.source_tag("p1"), "puzzle_p1");
    }
}
