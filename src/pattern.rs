//! Case-insensitive wildcard matching.
//!
//! The protocol selects entities and stored commands by glob-style patterns:
//! `*` matches any run of characters (including none) and `?` matches exactly
//! one.  Matching is ASCII case-insensitive, which is what the command syntax
//! guarantees for keywords and what users expect for titles.
//!
//! The matcher is the classic iterative two-pointer algorithm with a single
//! backtrack point, so it runs in O(n·m) worst case with no recursion and no
//! allocation — safe to call from the innermost listing loops.

/// Test `text` against a `*`/`?` wildcard `pattern`, ignoring ASCII case.
///
/// An empty pattern matches only the empty string; callers that want
/// "no pattern means everything" substitute `"*"` first (see
/// [`matches_any_csv`]).
pub fn matches(pattern: &str, text: &str) -> bool {
    let pat: &[u8] = pattern.as_bytes();
    let txt: &[u8] = text.as_bytes();

    let mut p = 0; // position in pattern
    let mut t = 0; // position in text
    let mut star: Option<usize> = None; // pattern index after the last '*'
    let mut star_t = 0; // text index the last '*' is currently bound to

    while t < txt.len() {
        if p < pat.len() && (pat[p] == b'?' || eq_nocase(pat[p], txt[t])) {
            p += 1;
            t += 1;
        } else if p < pat.len() && pat[p] == b'*' {
            star = Some(p + 1);
            star_t = t;
            p += 1;
        } else if let Some(resume) = star {
            // Widen the last '*' by one character and retry.
            star_t += 1;
            p = resume;
            t = star_t;
        } else {
            return false;
        }
    }
    // Only trailing stars may remain.
    while p < pat.len() && pat[p] == b'*' {
        p += 1;
    }
    p == pat.len()
}

/// Match `text` against a comma-separated list of patterns.
///
/// An empty or absent list means "match everything", mirroring the registry
/// filter behaviour (`INCLUDE DEVICES` with no pattern keeps all devices).
pub fn matches_any_csv(patterns: &str, text: &str) -> bool {
    if patterns.is_empty() {
        return true;
    }
    patterns.split(',').any(|pat| matches(pat, text))
}

fn eq_nocase(a: u8, b: u8) -> bool {
    a.eq_ignore_ascii_case(&b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_match_is_case_insensitive() {
        assert!(matches("Cooling Fan", "cooling fan"));
        assert!(matches("TOGGLE", "Toggle"));
        assert!(!matches("Toggle", "Toggles"));
    }

    #[test]
    fn star_matches_runs() {
        assert!(matches("*", ""));
        assert!(matches("*", "anything at all"));
        assert!(matches("fan*", "Fan Bank 1"));
        assert!(matches("*bank*", "Fan Bank 1"));
        assert!(matches("*1", "Fan Bank 1"));
        assert!(!matches("*2", "Fan Bank 1"));
    }

    #[test]
    fn question_mark_matches_single_char() {
        assert!(matches("fan?", "fan1"));
        assert!(!matches("fan?", "fan"));
        assert!(!matches("fan?", "fan12"));
    }

    #[test]
    fn empty_pattern_only_matches_empty_text() {
        assert!(matches("", ""));
        assert!(!matches("", "x"));
    }

    #[test]
    fn multiple_stars_backtrack() {
        assert!(matches("a*b*c", "aXXbYYc"));
        assert!(matches("a*b*c", "abc"));
        assert!(!matches("a*b*c", "acb"));
    }

    #[test]
    fn csv_list_matches_any() {
        assert!(matches_any_csv("pump*,fan*", "Fan Bank 1"));
        assert!(!matches_any_csv("pump*,heater*", "Fan Bank 1"));
        assert!(matches_any_csv("", "whatever"));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn text_matches_itself(s in "[a-zA-Z0-9 ,/_-]{0,40}") {
            prop_assert!(matches(&s, &s));
        }

        #[test]
        fn star_matches_everything(s in "\\PC{0,60}") {
            prop_assert!(matches("*", &s));
        }

        #[test]
        fn prefix_star_matches(s in "[a-zA-Z0-9]{1,20}", tail in "[a-zA-Z0-9]{0,20}") {
            let text = format!("{s}{tail}");
            let pattern = format!("{s}*");
            prop_assert!(matches(&pattern, &text));
        }
    }
}
