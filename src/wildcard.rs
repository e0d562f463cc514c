//! Glob matching for operator-authored path patterns.
//!
//! Three tokens, nothing else:
//!
//! | Token | Matches |
//! |---|---|
//! | `*` | zero or more characters |
//! | `?` | exactly one character |
//! | any other char | itself |
//!
//! There are no character classes and no escaping. Matching backtracks, so
//! it is exponential in the worst case; patterns come from configuration.

/// Returns `true` when `candidate` matches the glob `pattern`.
///
/// ```rust
/// use footprint::wildcard;
///
/// assert!(wildcard::matches("/api/*", "/api/v1/users"));
/// assert!(wildcard::matches("*", ""));
/// assert!(!wildcard::matches("/api/?", "/api/ab"));
/// ```
pub fn matches(pattern: &str, candidate: &str) -> bool {
    if pattern.is_empty() {
        return candidate.is_empty();
    }
    if pattern == "*" {
        return true;
    }

    let pattern: Vec<char> = pattern.chars().collect();
    let candidate: Vec<char> = candidate.chars().collect();
    deep_match(&candidate, &pattern)
}

fn deep_match(mut s: &[char], mut p: &[char]) -> bool {
    while let Some((&head, rest)) = p.split_first() {
        match head {
            '*' => {
                // Either `*` matches nothing here, or it swallows one more char.
                return deep_match(s, rest) || (!s.is_empty() && deep_match(&s[1..], p));
            }
            '?' => {
                if s.is_empty() {
                    return false;
                }
            }
            literal => {
                if s.first() != Some(&literal) {
                    return false;
                }
            }
        }
        s = &s[1..];
        p = rest;
    }
    s.is_empty()
}
