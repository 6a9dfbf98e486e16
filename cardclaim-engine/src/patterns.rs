//! Text patterns the game bot's announcements are matched against.
use once_cell::sync::Lazy;
use regex::Regex;

// `\w` in the game's protocol is ASCII-only.
static TIER_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"⭐\s*\*Tier\*:\s*([0-9A-Za-z_]+)").ok());
static CLAIM_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"\.claim\s+([0-9A-Za-z_]+)").ok());
static NAME_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"🎴\s*\*Name\*:\s*([^\n]+)").ok());

/// Fields captured from one inbound message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageFields {
    pub tier: Option<String>,
    pub claim_id: Option<String>,
    pub card_name: Option<String>,
}

impl MessageFields {
    /// Match all three patterns against `text`; each takes its first match.
    #[must_use]
    pub fn extract(text: &str) -> Self {
        Self {
            tier: first_capture(&TIER_PATTERN, text),
            claim_id: first_capture(&CLAIM_PATTERN, text),
            card_name: first_capture(&NAME_PATTERN, text)
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty()),
        }
    }
}

fn first_capture(pattern: &Option<Regex>, text: &str) -> Option<String> {
    pattern
        .as_ref()?
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// The claim command for a claim id, e.g. `.claim ABC123`.
#[must_use]
pub fn claim_command(claim_id: &str) -> String {
    format!("{} {claim_id}", crate::constants::CLAIM_COMMAND_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPAWN: &str = "🃏 A wild card appeared!\n🎴 *Name*: Roronoa Zoro  \n⭐ *Tier*: 5\n\nUse .claim Zx91Q to claim it";

    #[test]
    fn extracts_all_fields_from_spawn_announcement() {
        let fields = MessageFields::extract(SPAWN);
        assert_eq!(fields.tier.as_deref(), Some("5"));
        assert_eq!(fields.claim_id.as_deref(), Some("Zx91Q"));
        assert_eq!(fields.card_name.as_deref(), Some("Roronoa Zoro"));
    }

    #[test]
    fn tier_and_claim_on_separate_lines() {
        let fields = MessageFields::extract("⭐ *Tier*: S\n.claim ABC123");
        assert_eq!(fields.tier.as_deref(), Some("S"));
        assert_eq!(fields.claim_id.as_deref(), Some("ABC123"));
        assert_eq!(fields.card_name, None);
    }

    #[test]
    fn plain_claim_has_no_tier() {
        let fields = MessageFields::extract(".claim ABC123");
        assert_eq!(fields.tier, None);
        assert_eq!(fields.claim_id.as_deref(), Some("ABC123"));
    }

    #[test]
    fn claim_requires_whitespace_and_ascii_token() {
        assert_eq!(MessageFields::extract(".claimABC").claim_id, None);
        assert_eq!(MessageFields::extract(".claim   éclair").claim_id, None);
        assert_eq!(
            MessageFields::extract(".claim a_1-b").claim_id.as_deref(),
            Some("a_1")
        );
    }

    #[test]
    fn tier_without_star_marker_is_ignored() {
        assert_eq!(MessageFields::extract("*Tier*: 4").tier, None);
        assert_eq!(MessageFields::extract("⭐*Tier*:4").tier.as_deref(), Some("4"));
    }

    #[test]
    fn claim_command_formats_prefix() {
        assert_eq!(claim_command("ABC123"), ".claim ABC123");
    }
}
