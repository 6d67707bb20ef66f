use regex::Regex;
use std::sync::OnceLock;

const VERBS: &[&str] = &[
    "fix", "refactor", "add", "remove", "implement", "debug", "test", "optimize", "retry",
    "revert", "update", "rename", "improve", "migrate", "deploy", "investigate",
];

fn code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[a-z_][a-z0-9_]*\(|\b[a-z][a-z0-9]*(?:_[a-z0-9]+)+\b").expect("static pattern")
    })
}

/// Cheap topic extraction used to tag a working-set item when it's added:
/// code-ish tokens (function calls, `snake_case` identifiers) plus a fixed
/// list of programming verbs, capped at 5 topics and deduplicated in the
/// order first seen.
pub fn extract_topics(content: &str) -> Vec<String> {
    let lowered = content.to_lowercase();
    let mut topics: Vec<String> = Vec::new();

    for m in code_pattern().find_iter(&lowered) {
        let token = m.as_str().trim_end_matches('(').to_string();
        if !topics.contains(&token) {
            topics.push(token);
        }
        if topics.len() >= 5 {
            return topics;
        }
    }

    for word in lowered.split_whitespace() {
        let word = word.trim_matches(|c: char| !c.is_alphanumeric());
        if VERBS.contains(&word) && !topics.iter().any(|t| t == word) {
            topics.push(word.to_string());
            if topics.len() >= 5 {
                break;
            }
        }
    }

    topics
}
