use md5::{Digest as Md5Digest, Md5};
use sha2::{Digest as Sha2Digest, Sha256};
use unicode_normalization::UnicodeNormalization;

/// Maximum byte length of a canonical key before truncation kicks in.
const CANONICAL_KEY_MAX_BYTES: usize = 200;
/// Prefix length kept when a canonical key is truncated, leaving room for
/// the `_` separator and 8-hex suffix.
const CANONICAL_KEY_TRUNCATED_PREFIX: usize = 191;

/// Optional context that modifies canonicalization.
#[derive(Debug, Clone, Default)]
pub struct CanonContext {
    pub project: Option<String>,
}

/// Deterministic identity key for a piece of text content.
///
/// Pipeline: NFKC normalize -> lowercase -> drop everything that isn't a
/// Unicode letter, number, or whitespace -> collapse whitespace runs ->
/// trim -> optionally prefix with `"<project>::"` -> truncate to 200 bytes
/// (191-byte prefix + `_` + 8 hex digits of the untruncated key's MD5) if
/// the result is too long.
///
/// Must be bit-exact stable across releases: retrieval scope filters and
/// dedupe both depend on it never drifting for the same input.
pub fn canonical_key(content: &str, ctx: Option<&CanonContext>) -> String {
    let normalized: String = content.nfkc().collect();
    let lowered = normalized.to_lowercase();

    let mut stripped = String::with_capacity(lowered.len());
    for ch in lowered.chars() {
        if ch.is_alphanumeric() || ch.is_whitespace() {
            stripped.push(ch);
        }
    }

    let collapsed = collapse_whitespace(&stripped);
    let trimmed = collapsed.trim();

    let with_project = match ctx.and_then(|c| c.project.as_deref()) {
        Some(project) if !project.is_empty() => format!("{}::{}", project, trimmed),
        _ => trimmed.to_string(),
    };

    truncate_with_hash_suffix(&with_project)
}

fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_was_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }
    out
}

fn truncate_with_hash_suffix(s: &str) -> String {
    if s.len() <= CANONICAL_KEY_MAX_BYTES {
        return s.to_string();
    }

    let mut hasher = Md5::new();
    hasher.update(s.as_bytes());
    let digest = hasher.finalize();
    let suffix: String = digest.iter().take(4).map(|b| format!("{:02x}", b)).collect();

    let prefix = truncate_to_char_boundary(s, CANONICAL_KEY_TRUNCATED_PREFIX);
    format!("{}_{}", prefix, suffix)
}

fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// `session_id ":" sha256(content)`, hex-encoded. Unique per event; two
/// sessions never collide even on identical content because the session id
/// is baked into the hashed input's prefix.
pub fn dedupe_key(content: &str, session_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    format!("{}:{:x}", session_id, digest)
}

/// `canonical_key(a) == canonical_key(b)` under the default (no-project)
/// context.
pub fn same_canonical(a: &str, b: &str) -> bool {
    canonical_key(a, None) == canonical_key(b, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_strips_punctuation() {
        let key = canonical_key("Hello, World!!", None);
        assert_eq!(key, "hello world");
    }

    #[test]
    fn collapses_internal_whitespace() {
        let key = canonical_key("hello   \t\n world", None);
        assert_eq!(key, "hello world");
    }

    #[test]
    fn normalizes_full_width_and_unicode_punctuation() {
        // Full-width "ＡＢＣ" NFKC-normalizes to ASCII "ABC".
        let key = canonical_key("ＡＢＣ：ｔｅｓｔ", None);
        assert_eq!(key, "abctest");
    }

    #[test]
    fn applies_project_prefix_when_given() {
        let ctx = CanonContext {
            project: Some("myproj".to_string()),
        };
        let key = canonical_key("hello", Some(&ctx));
        assert_eq!(key, "myproj::hello");
    }

    #[test]
    fn truncates_oversized_keys_with_stable_hash_suffix() {
        let long = "word ".repeat(100);
        let key = canonical_key(&long, None);
        assert!(key.len() <= 200);
        assert!(key.contains('_'));

        // Same input always produces the same suffix.
        let key2 = canonical_key(&long, None);
        assert_eq!(key, key2);
    }

    #[test]
    fn same_canonical_ignores_case_and_punctuation_differences() {
        assert!(same_canonical("Hello, World", "hello world"));
        assert!(!same_canonical("hello world", "goodbye world"));
    }

    #[test]
    fn dedupe_key_differs_across_sessions_for_identical_content() {
        let a = dedupe_key("same content", "session-a");
        let b = dedupe_key("same content", "session-b");
        assert_ne!(a, b);
    }

    #[test]
    fn dedupe_key_is_deterministic() {
        let a = dedupe_key("content", "session-1");
        let b = dedupe_key("content", "session-1");
        assert_eq!(a, b);
    }
}
