// Content pattern detection shared by the rule evaluator and purge filters.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:https?://|www\.)[^\s<>()]+\.[^\s<>()]{2,}").unwrap()
});

static RE_DISCORD_INVITE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:https?://)?(?:www\.)?(?:discord\.(?:gg|io|me|li|link|plus)|discord(?:app)?\.com/invite|invite\.gg|dsc\.gg)/[A-Za-z0-9-]+",
    )
    .unwrap()
});

/// Does the text contain a URL?
pub fn contains_link(text: &str) -> bool {
    RE_LINK.is_match(text)
}

/// Does the text contain a Discord server invite?
pub fn contains_discord_invite(text: &str) -> bool {
    RE_DISCORD_INVITE.is_match(text)
}
