//! Level-of-detail tiers and distance classification.

use std::fmt;

/// Detail tier chosen by camera distance. Finer levels come first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LodLevel {
    High,
    Medium,
    Low,
}

impl LodLevel {
    pub const ALL: [LodLevel; 3] = [LodLevel::High, LodLevel::Medium, LodLevel::Low];

    /// Dense index into per-level arrays.
    pub const fn index(self) -> usize {
        match self {
            LodLevel::High => 0,
            LodLevel::Medium => 1,
            LodLevel::Low => 2,
        }
    }

    /// Capacity hint for this level's batch, in percent of the visible count.
    pub const fn reserve_percent(self) -> usize {
        match self {
            LodLevel::High => 10,
            LodLevel::Medium => 25,
            LodLevel::Low => 65,
        }
    }

    /// Debug tint applied when the lod tint visual is on.
    pub const fn tint(self) -> [f32; 4] {
        match self {
            LodLevel::High => [0.45, 1.0, 0.45, 1.0],
            LodLevel::Medium => [1.0, 0.9, 0.35, 1.0],
            LodLevel::Low => [1.0, 0.4, 0.35, 1.0],
        }
    }
}

impl fmt::Display for LodLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LodLevel::High => "HIGH",
            LodLevel::Medium => "MEDIUM",
            LodLevel::Low => "LOW",
        })
    }
}

/// Distances driving one object-field update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LodDistances {
    pub cull: f32,
    pub high: f32,
    pub medium: f32,
}

impl Default for LodDistances {
    fn default() -> Self {
        Self {
            cull: 400.0,
            high: 50.0,
            medium: 150.0,
        }
    }
}

/// Boundaries are inclusive, so an object exactly at `high` is still HIGH.
pub fn classify(distance: f32, high: f32, medium: f32) -> LodLevel {
    if distance <= high {
        LodLevel::High
    } else if distance <= medium {
        LodLevel::Medium
    } else {
        LodLevel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_pick_the_finer_level() {
        assert_eq!(classify(50.0, 50.0, 150.0), LodLevel::High);
        assert_eq!(classify(50.001, 50.0, 150.0), LodLevel::Medium);
        assert_eq!(classify(150.0, 50.0, 150.0), LodLevel::Medium);
        assert_eq!(classify(150.5, 50.0, 150.0), LodLevel::Low);
    }

    #[test]
    fn reserve_hints_cover_the_whole_batch() {
        let total: usize = LodLevel::ALL.iter().map(|l| l.reserve_percent()).sum();
        assert_eq!(total, 100);
    }
}
