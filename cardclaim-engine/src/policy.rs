use rand::Rng;

use crate::probability::{ProbabilityTable, Tier, format_percent};

/// Outcome of a claim decision.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimDecision {
    pub should_claim: bool,
    pub reason: String,
}

impl ClaimDecision {
    fn drawn<R: Rng + ?Sized>(rng: &mut R, probability: f64, label: &str) -> Self {
        Self {
            should_claim: roll(rng, probability),
            reason: format!("{label} with {} claim chance", format_percent(probability)),
        }
    }

    fn unknown_tier() -> Self {
        Self {
            should_claim: false,
            reason: "Unknown tier".to_string(),
        }
    }
}

/// Decide whether to claim a spawned card.
///
/// Preferred names are matched case-insensitively as substrings of the card
/// name and take priority over the tier. Blank entries never match. An
/// unparseable tier is never claimed unless the name is preferred.
#[must_use]
pub fn decide<R: Rng + ?Sized>(
    tier: &str,
    card_name: Option<&str>,
    preferred_names: &[String],
    table: &ProbabilityTable,
    rng: &mut R,
) -> ClaimDecision {
    if let Some(name) = card_name
        && is_preferred(name, preferred_names)
    {
        return ClaimDecision::drawn(rng, table.preferred(), "Preferred card");
    }

    match Tier::parse(tier) {
        Some(parsed) => ClaimDecision::drawn(rng, table.for_tier(parsed), &format!("{parsed} card")),
        None => ClaimDecision::unknown_tier(),
    }
}

/// Whether the card name contains any non-blank preferred entry, ignoring case.
#[must_use]
pub fn is_preferred(card_name: &str, preferred_names: &[String]) -> bool {
    let lowered = card_name.to_lowercase();
    preferred_names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .any(|name| lowered.contains(&name.to_lowercase()))
}

/// Bernoulli draw: true with probability `p` (`p <= 0` never, `p >= 1` always).
pub fn roll<R: Rng + ?Sized>(rng: &mut R, p: f64) -> bool {
    rng.gen_range(0.0..1.0) < p
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn table() -> ProbabilityTable {
        ProbabilityTable::new(0.95, 0.9, [0.2, 0.3, 0.5, 0.6, 0.7, 0.8]).unwrap()
    }

    fn claim_rate(tier: &str, name: Option<&str>, preferred: &[String], seed: u64) -> f64 {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let trials = 100_000;
        let claimed = (0..trials)
            .filter(|_| decide(tier, name, preferred, &table(), &mut rng).should_claim)
            .count();
        claimed as f64 / f64::from(trials)
    }

    #[test]
    fn draws_match_configured_tier_probabilities() {
        let expected = [
            ("S", 0.9),
            ("1", 0.2),
            ("2", 0.3),
            ("3", 0.5),
            ("4", 0.6),
            ("5", 0.7),
            ("6", 0.8),
        ];
        for (idx, (tier, p)) in expected.into_iter().enumerate() {
            let rate = claim_rate(tier, None, &[], 0xC1A1_0000 + idx as u64);
            assert!((rate - p).abs() < 0.02, "tier {tier}: rate {rate} vs {p}");
        }
    }

    #[test]
    fn preferred_name_overrides_tier() {
        let preferred = vec!["Luffy".to_string()];
        let rate = claim_rate("1", Some("Monkey D. LUFFY (Gear 5)"), &preferred, 7);
        assert!((rate - 0.95).abs() < 0.02, "rate {rate}");

        let mut rng = ChaCha20Rng::seed_from_u64(9);
        let decision = decide("garbage", Some("luffy"), &preferred, &table(), &mut rng);
        assert!(decision.reason.starts_with("Preferred card"));
    }

    #[test]
    fn unknown_tier_never_claims() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let certain = ProbabilityTable::uniform(1.0);
        for tier in ["0", "7", "X", "", "SS"] {
            for _ in 0..100 {
                let decision = decide(tier, Some("Zoro"), &[], &certain, &mut rng);
                assert!(!decision.should_claim);
                assert_eq!(decision.reason, "Unknown tier");
            }
        }
    }

    #[test]
    fn reason_reports_percentage() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let decision = decide("3", None, &[], &table(), &mut rng);
        assert_eq!(decision.reason, "Tier 3 card with 50.0% claim chance");
    }

    #[test]
    fn blank_preferred_entries_are_ignored() {
        assert!(!is_preferred("Nami", &["  ".to_string(), String::new()]));
        assert!(is_preferred("Nico Robin", &["robin".to_string()]));
    }

    #[test]
    fn roll_respects_certain_bounds() {
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        assert!((0..1_000).all(|_| roll(&mut rng, 1.0)));
        assert!((0..1_000).all(|_| !roll(&mut rng, 0.0)));
    }
}
