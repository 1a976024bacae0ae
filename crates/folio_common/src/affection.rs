//! Affection bands for the secret-crush dialogue counter.
//!
//! The counter is independent of XP and never gates a zone by itself.

use serde::{Deserialize, Serialize};

/// Lower bound (inclusive) and tier, highest first
const TIER_BANDS: &[(i64, AffectionTier)] = &[
    (40, AffectionTier::Soulmate),
    (30, AffectionTier::CrushingHard),
    (20, AffectionTier::VeryInterested),
    (10, AffectionTier::GettingWarm),
    (5, AffectionTier::Curious),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AffectionTier {
    Stranger,
    Curious,
    GettingWarm,
    VeryInterested,
    CrushingHard,
    Soulmate,
}

impl AffectionTier {
    pub fn from_points(points: i64) -> Self {
        TIER_BANDS
            .iter()
            .find(|(min, _)| points >= *min)
            .map(|(_, tier)| *tier)
            .unwrap_or(AffectionTier::Stranger)
    }

    pub fn label(&self) -> &'static str {
        match self {
            AffectionTier::Stranger => "Stranger",
            AffectionTier::Curious => "Curious",
            AffectionTier::GettingWarm => "Getting Warm",
            AffectionTier::VeryInterested => "Very Interested",
            AffectionTier::CrushingHard => "Crushing Hard",
            AffectionTier::Soulmate => "Soulmate",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_bands() {
        assert_eq!(AffectionTier::from_points(-3), AffectionTier::Stranger);
        assert_eq!(AffectionTier::from_points(4), AffectionTier::Stranger);
        assert_eq!(AffectionTier::from_points(5), AffectionTier::Curious);
        assert_eq!(AffectionTier::from_points(19), AffectionTier::GettingWarm);
        assert_eq!(AffectionTier::from_points(30), AffectionTier::CrushingHard);
        assert_eq!(AffectionTier::from_points(400), AffectionTier::Soulmate);
    }

    #[test]
    fn test_tiers_ordered() {
        assert!(AffectionTier::Soulmate > AffectionTier::Curious);
        assert_eq!(AffectionTier::VeryInterested.label(), "Very Interested");
    }
}
