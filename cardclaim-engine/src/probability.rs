//! Claim probability table.
//!
//! Two on-disk shapes exist: the coarse one (`tier1to3`, `tier4to6`) and the
//! per-tier one (`tier1` … `tier6`). Both deserialize into the same
//! [`ProbabilityTable`]; per-tier keys win over the coarse group, and the
//! table always serializes back in the per-tier shape.
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    DEFAULT_PREFERRED_PROBABILITY, DEFAULT_TIER_1_TO_3_PROBABILITY,
    DEFAULT_TIER_4_TO_6_PROBABILITY, DEFAULT_TIER_S_PROBABILITY, MAX_NUMBERED_TIER,
    MIN_NUMBERED_TIER,
};

const TIER_COUNT: usize = MAX_NUMBERED_TIER as usize;

/// Rarity tier of a spawned card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    S,
    Numbered(u8),
}

impl Tier {
    /// Parse the token captured after `*Tier*:`.
    ///
    /// `"S"` is the special tier. Numbered tiers are read from the leading
    /// digits of the token, so `"4"`, `"04"` and `"4x"` are all tier 4.
    /// Anything else, including numbers outside 1–6, is `None`.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        if token == "S" {
            return Some(Self::S);
        }
        let end = token
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(token.len());
        let number: u8 = token[..end].parse().ok()?;
        (MIN_NUMBERED_TIER..=MAX_NUMBERED_TIER)
            .contains(&number)
            .then_some(Self::Numbered(number))
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::S => f.write_str("Tier S"),
            Self::Numbered(n) => write!(f, "Tier {n}"),
        }
    }
}

/// A key of the probability table that an operator can change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbabilityCategory {
    Preferred,
    TierS,
    Tier(u8),
    /// Legacy `tier1to3`; writes tiers 1, 2 and 3.
    LowTiers,
    /// Legacy `tier4to6`; writes tiers 4, 5 and 6.
    HighTiers,
}

impl ProbabilityCategory {
    /// Human-facing label used in confirmation messages.
    #[must_use]
    pub fn label(self) -> String {
        match self {
            Self::Preferred => "Preferred".to_string(),
            Self::TierS => "Tier S".to_string(),
            Self::Tier(n) => format!("Tier {n}"),
            Self::LowTiers => "Tiers 1-3".to_string(),
            Self::HighTiers => "Tiers 4-6".to_string(),
        }
    }

    fn numbered_tiers(self) -> Option<RangeInclusive<u8>> {
        match self {
            Self::Tier(n) if (MIN_NUMBERED_TIER..=MAX_NUMBERED_TIER).contains(&n) => Some(n..=n),
            Self::Tier(_) => None,
            Self::LowTiers => Some(1..=3),
            Self::HighTiers => Some(4..=6),
            Self::Preferred | Self::TierS => None,
        }
    }
}

impl fmt::Display for ProbabilityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preferred => f.write_str("preferred"),
            Self::TierS => f.write_str("tierS"),
            Self::Tier(n) => write!(f, "tier{n}"),
            Self::LowTiers => f.write_str("tier1to3"),
            Self::HighTiers => f.write_str("tier4to6"),
        }
    }
}

impl FromStr for ProbabilityCategory {
    type Err = ProbabilityError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let tier_number = trimmed.strip_prefix("tier").unwrap_or(trimmed);
        match trimmed {
            "preferred" => return Ok(Self::Preferred),
            "tierS" | "S" => return Ok(Self::TierS),
            "tier1to3" => return Ok(Self::LowTiers),
            "tier4to6" => return Ok(Self::HighTiers),
            _ => {}
        }
        match tier_number.parse::<u8>() {
            Ok(n) if (MIN_NUMBERED_TIER..=MAX_NUMBERED_TIER).contains(&n) => Ok(Self::Tier(n)),
            _ => Err(ProbabilityError::UnknownCategory(trimmed.to_string())),
        }
    }
}

/// Configuration errors raised by probability updates and table loading.
#[derive(Debug, Error, PartialEq)]
pub enum ProbabilityError {
    #[error("invalid category `{0}`; use preferred, tierS, tier1to3, tier4to6 or numbers 1-6")]
    UnknownCategory(String),
    #[error("{category} probability must be a number between 0 and 1 (got {value})")]
    OutOfRange { category: String, value: f64 },
}

/// Canonical claim probabilities, one value per category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawProbabilityTable", into = "RawProbabilityTable")]
pub struct ProbabilityTable {
    preferred: f64,
    tier_s: f64,
    tiers: [f64; TIER_COUNT],
}

impl Default for ProbabilityTable {
    fn default() -> Self {
        Self {
            preferred: DEFAULT_PREFERRED_PROBABILITY,
            tier_s: DEFAULT_TIER_S_PROBABILITY,
            tiers: [
                DEFAULT_TIER_1_TO_3_PROBABILITY,
                DEFAULT_TIER_1_TO_3_PROBABILITY,
                DEFAULT_TIER_1_TO_3_PROBABILITY,
                DEFAULT_TIER_4_TO_6_PROBABILITY,
                DEFAULT_TIER_4_TO_6_PROBABILITY,
                DEFAULT_TIER_4_TO_6_PROBABILITY,
            ],
        }
    }
}

impl ProbabilityTable {
    /// Build a table from explicit values.
    ///
    /// # Errors
    ///
    /// Returns [`ProbabilityError::OutOfRange`] if any value is outside `[0, 1]`.
    pub fn new(preferred: f64, tier_s: f64, tiers: [f64; TIER_COUNT]) -> Result<Self, ProbabilityError> {
        let mut table = Self {
            preferred,
            tier_s,
            tiers,
        };
        table.set(ProbabilityCategory::Preferred, preferred)?;
        table.set(ProbabilityCategory::TierS, tier_s)?;
        for (idx, value) in tiers.iter().enumerate() {
            table.set(ProbabilityCategory::Tier(tier_number(idx)), *value)?;
        }
        Ok(table)
    }

    /// Same probability for every category.
    #[must_use]
    pub fn uniform(probability: f64) -> Self {
        let clamped = if probability.is_finite() {
            probability.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            preferred: clamped,
            tier_s: clamped,
            tiers: [clamped; TIER_COUNT],
        }
    }

    #[must_use]
    pub const fn preferred(&self) -> f64 {
        self.preferred
    }

    #[must_use]
    pub const fn tier_s(&self) -> f64 {
        self.tier_s
    }

    /// Probability configured for a tier.
    #[must_use]
    pub fn for_tier(&self, tier: Tier) -> f64 {
        match tier {
            Tier::S => self.tier_s,
            Tier::Numbered(n) => self
                .tiers
                .get(usize::from(n).wrapping_sub(1))
                .copied()
                .unwrap_or(0.0),
        }
    }

    /// Overwrite one category. Coarse categories write all three of their tiers.
    ///
    /// # Errors
    ///
    /// Returns [`ProbabilityError::OutOfRange`] when `value` is not a finite
    /// number in `[0, 1]`; the table is left unchanged.
    pub fn set(&mut self, category: ProbabilityCategory, value: f64) -> Result<(), ProbabilityError> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(ProbabilityError::OutOfRange {
                category: category.to_string(),
                value,
            });
        }
        match category {
            ProbabilityCategory::Preferred => self.preferred = value,
            ProbabilityCategory::TierS => self.tier_s = value,
            other => {
                let range = other
                    .numbered_tiers()
                    .ok_or_else(|| ProbabilityError::UnknownCategory(other.to_string()))?;
                for n in range {
                    let idx = usize::from(n.saturating_sub(MIN_NUMBERED_TIER));
                    if let Some(slot) = self.tiers.get_mut(idx) {
                        *slot = value;
                    }
                }
            }
        }
        Ok(())
    }

    /// Every fine-grained category with its value, in display order.
    #[must_use]
    pub fn entries(&self) -> Vec<(ProbabilityCategory, f64)> {
        let mut entries = vec![
            (ProbabilityCategory::Preferred, self.preferred),
            (ProbabilityCategory::TierS, self.tier_s),
        ];
        entries.extend(
            self.tiers
                .iter()
                .enumerate()
                .rev()
                .map(|(idx, value)| (ProbabilityCategory::Tier(tier_number(idx)), *value)),
        );
        entries
    }
}

impl fmt::Display for ProbabilityTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self
            .entries()
            .into_iter()
            .map(|(category, value)| format!("• {category}: {}", format_percent(value)))
            .collect();
        f.write_str(&lines.join("\n"))
    }
}

/// Format a probability as a percentage with one decimal, e.g. `45.0%`.
#[must_use]
pub fn format_percent(probability: f64) -> String {
    format!("{:.1}%", probability * 100.0)
}

fn tier_number(idx: usize) -> u8 {
    u8::try_from(idx + 1).unwrap_or(MAX_NUMBERED_TIER)
}

/// On-disk probability shape accepting both the coarse and per-tier keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawProbabilityTable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred: Option<f64>,
    #[serde(default, rename = "tierS", skip_serializing_if = "Option::is_none")]
    pub tier_s: Option<f64>,
    #[serde(default, rename = "tier1", skip_serializing_if = "Option::is_none")]
    pub tier1: Option<f64>,
    #[serde(default, rename = "tier2", skip_serializing_if = "Option::is_none")]
    pub tier2: Option<f64>,
    #[serde(default, rename = "tier3", skip_serializing_if = "Option::is_none")]
    pub tier3: Option<f64>,
    #[serde(default, rename = "tier4", skip_serializing_if = "Option::is_none")]
    pub tier4: Option<f64>,
    #[serde(default, rename = "tier5", skip_serializing_if = "Option::is_none")]
    pub tier5: Option<f64>,
    #[serde(default, rename = "tier6", skip_serializing_if = "Option::is_none")]
    pub tier6: Option<f64>,
    #[serde(default, rename = "tier1to3", skip_serializing_if = "Option::is_none")]
    pub tier1to3: Option<f64>,
    #[serde(default, rename = "tier4to6", skip_serializing_if = "Option::is_none")]
    pub tier4to6: Option<f64>,
}

impl TryFrom<RawProbabilityTable> for ProbabilityTable {
    type Error = ProbabilityError;

    fn try_from(raw: RawProbabilityTable) -> Result<Self, Self::Error> {
        let defaults = Self::default();
        let fine = [raw.tier1, raw.tier2, raw.tier3, raw.tier4, raw.tier5, raw.tier6];
        let mut tiers = defaults.tiers;
        for (idx, slot) in tiers.iter_mut().enumerate() {
            let coarse = if idx < 3 { raw.tier1to3 } else { raw.tier4to6 };
            if let Some(value) = fine[idx].or(coarse) {
                *slot = value;
            }
        }
        Self::new(
            raw.preferred.unwrap_or(defaults.preferred),
            raw.tier_s.unwrap_or(defaults.tier_s),
            tiers,
        )
    }
}

impl From<ProbabilityTable> for RawProbabilityTable {
    fn from(table: ProbabilityTable) -> Self {
        let [tier1, tier2, tier3, tier4, tier5, tier6] = table.tiers.map(Some);
        Self {
            preferred: Some(table.preferred),
            tier_s: Some(table.tier_s),
            tier1,
            tier2,
            tier3,
            tier4,
            tier5,
            tier6,
            tier1to3: None,
            tier4to6: None,
        }
    }
}
