//! Discrete PM2.5 air-quality categories (µg/m³).
//!
//! Thresholds follow the WHO interim targets used by the dashboard legend.
//! Lower bounds are inclusive, upper bounds exclusive.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    /// [0, 15)
    Good,
    /// [15, 50)
    Moderate,
    /// [50, 75)
    Poor,
    /// [75, 125)
    VeryPoor,
    /// [125, ∞)
    Hazardous,
}

/// All categories from best to worst.
pub const ALL_CATEGORIES: [Category; 5] = [
    Category::Good,
    Category::Moderate,
    Category::Poor,
    Category::VeryPoor,
    Category::Hazardous,
];

impl Category {
    /// Category of a concentration. Values below zero (interpolation
    /// overshoot) count as Good.
    pub fn classify(value: f64) -> Self {
        ALL_CATEGORIES
            .iter()
            .rev()
            .copied()
            .find(|c| value >= c.lower_bound())
            .unwrap_or(Category::Good)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Moderate => "Moderate",
            Self::Poor => "Poor",
            Self::VeryPoor => "Very Poor",
            Self::Hazardous => "Hazardous",
        }
    }

    /// Inclusive lower bound.
    pub fn lower_bound(self) -> f64 {
        match self {
            Self::Good => 0.0,
            Self::Moderate => 15.0,
            Self::Poor => 50.0,
            Self::VeryPoor => 75.0,
            Self::Hazardous => 125.0,
        }
    }

    /// Exclusive upper bound; None for the open top category.
    pub fn upper_bound(self) -> Option<f64> {
        match self {
            Self::Hazardous => None,
            other => Some(ALL_CATEGORIES[other as usize + 1].lower_bound()),
        }
    }

    /// Legend colour as `#RRGGBB`.
    pub fn color(self) -> &'static str {
        match self {
            Self::Good => "#70E17B",
            Self::Moderate => "#FDD900",
            Self::Poor => "#EE7D15",
            Self::VeryPoor => "#C90101",
            Self::Hazardous => "#6C1775",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_are_lower_inclusive() {
        assert_eq!(Category::classify(15.0), Category::Moderate);
        assert_eq!(Category::classify(14.999), Category::Good);
        assert_eq!(Category::classify(50.0), Category::Poor);
        assert_eq!(Category::classify(74.9), Category::Poor);
        assert_eq!(Category::classify(75.0), Category::VeryPoor);
        assert_eq!(Category::classify(124.99), Category::VeryPoor);
        assert_eq!(Category::classify(125.0), Category::Hazardous);
        assert_eq!(Category::classify(1e6), Category::Hazardous);
    }

    #[test]
    fn negative_overshoot_is_good() {
        assert_eq!(Category::classify(-3.2), Category::Good);
        assert_eq!(Category::classify(0.0), Category::Good);
    }

    #[test]
    fn bounds_chain_without_gaps() {
        for pair in ALL_CATEGORIES.windows(2) {
            assert_eq!(pair[0].upper_bound(), Some(pair[1].lower_bound()));
        }
        assert_eq!(Category::Hazardous.upper_bound(), None);
        assert_eq!(Category::VeryPoor.to_string(), "Very Poor");
    }
}
