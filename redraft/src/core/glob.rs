//! Glob pattern compilation for tree walks.
//!
//! Patterns use the buildkit conventions the workspace exposes: `**` matches
//! any number of path segments (including none), `*` matches within a single
//! segment. Everything else is literal. Patterns are compiled to anchored
//! regexes; any input compiles, so there is no error path.

use regex::Regex;

/// Compile a glob pattern into an anchored [`Regex`] over slash-separated
/// relative paths.
pub fn glob_regex(pattern: &str) -> Regex {
    let segments: Vec<&str> = pattern.split('/').collect();
    let mut out = String::from("^");
    for (index, segment) in segments.iter().enumerate() {
        let last = index + 1 == segments.len();
        if *segment == "**" {
            if last {
                out.push_str(".*");
            } else {
                // Zero or more whole segments, separator included.
                out.push_str("(?:.*/)?");
            }
            continue;
        }
        for ch in segment.chars() {
            if ch == '*' {
                out.push_str("[^/]*");
            } else {
                out.push_str(&regex::escape(&ch.to_string()));
            }
        }
        if !last {
            out.push('/');
        }
    }
    out.push('$');
    Regex::new(&out).expect("glob translation always yields a valid regex")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_stays_within_a_segment() {
        let re = glob_regex("src/*.rs");
        assert!(re.is_match("src/lib.rs"));
        assert!(!re.is_match("src/io/mod.rs"));
        assert!(!re.is_match("lib.rs"));
    }

    #[test]
    fn double_star_spans_segments() {
        let re = glob_regex("**/*.go");
        assert!(re.is_match("main.go"));
        assert!(re.is_match("cmd/tool/main.go"));
        assert!(!re.is_match("main.rs"));
    }

    #[test]
    fn bare_double_star_matches_everything() {
        let re = glob_regex("**");
        assert!(re.is_match("a"));
        assert!(re.is_match("a/b/c.txt"));
    }

    #[test]
    fn literals_are_escaped() {
        let re = glob_regex("a+b/c.txt");
        assert!(re.is_match("a+b/c.txt"));
        assert!(!re.is_match("aab/cxtxt"));
    }
}
