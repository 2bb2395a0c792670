//! Keyword-based suspicion scoring of protagonist dialogue.
//!
//! | Tier | Keywords | Delta |
//! |------|----------|-------|
//! | High | suspicious, watched, strange, weird | 20 |
//! | Mild | unusual, odd | 10 |
//! | None | anything else | 0 |
//!
//! Matching is case-insensitive substring search and the first matching
//! tier wins, so "strange" and "odd" together score 20. Clamping the
//! cumulative meter is the store's job, not the scorer's.

/// Keywords that add [`HIGH_DELTA`].
pub const HIGH_KEYWORDS: [&str; 4] = ["suspicious", "watched", "strange", "weird"];

/// Keywords that add [`MILD_DELTA`].
pub const MILD_KEYWORDS: [&str; 2] = ["unusual", "odd"];

/// Delta for the high tier.
pub const HIGH_DELTA: u8 = 20;

/// Delta for the mild tier.
pub const MILD_DELTA: u8 = 10;

/// Score a line of dialogue. Returns 0, 10, or 20.
pub fn score(text: &str) -> u8 {
    let lower = text.to_lowercase();
    if HIGH_KEYWORDS.iter().any(|k| lower.contains(k)) {
        HIGH_DELTA
    } else if MILD_KEYWORDS.iter().any(|k| lower.contains(k)) {
        MILD_DELTA
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_tier() {
        assert_eq!(score("this is strange"), 20);
        assert_eq!(score("I feel like I'm being WATCHED"), 20);
    }

    #[test]
    fn mild_tier() {
        assert_eq!(score("that's odd"), 10);
        assert_eq!(score("An Unusual morning"), 10);
    }

    #[test]
    fn no_keyword() {
        assert_eq!(score("hello there"), 0);
        assert_eq!(score(""), 0);
    }

    #[test]
    fn higher_tier_wins() {
        assert_eq!(score("strange and odd"), 20);
        assert_eq!(score("odd, really weird"), 20);
    }

    #[test]
    fn substring_match() {
        // "odd" inside a longer word still counts.
        assert_eq!(score("Oddly quiet today"), 10);
    }

    #[test]
    fn deterministic() {
        let text = "Something weird is going on";
        let first = score(text);
        for _ in 0..10 {
            assert_eq!(score(text), first);
        }
    }
}
