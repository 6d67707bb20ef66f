use ctxmem_types::{Event, EventType};
use serde_json::Value;

/// Narrows a retrieval to a subset of the event space. Applied **after**
/// reranking and after the full event has been loaded (`canonical_key`,
/// `content`, and `metadata` aren't present on a bare search hit).
#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub session_id: Option<String>,
    pub session_id_prefix: Option<String>,
    pub event_types: Vec<EventType>,
    pub metadata: Vec<(String, Value)>,
    pub canonical_key_prefix: Option<String>,
    pub content_includes: Vec<String>,
}

impl Scope {
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(session_id) = &self.session_id
            && &event.session_id != session_id
        {
            return false;
        }
        if let Some(prefix) = &self.session_id_prefix
            && !event.session_id.starts_with(prefix.as_str())
        {
            return false;
        }
        if !self.event_types.is_empty() && !self.event_types.contains(&event.event_type) {
            return false;
        }
        if let Some(prefix) = &self.canonical_key_prefix
            && !event.canonical_key.starts_with(prefix.as_str())
        {
            return false;
        }
        for needle in &self.content_includes {
            if !event.content.contains(needle.as_str()) {
                return false;
            }
        }
        for (path, expected) in &self.metadata {
            if !event.metadata.path_equals(path, expected) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ctxmem_types::Metadata;

    fn event(session_id: &str, canonical_key: &str, content: &str) -> Event {
        Event {
            id: "e1".into(),
            event_type: EventType::UserPrompt,
            session_id: session_id.into(),
            turn_id: None,
            timestamp: Utc::now(),
            content: content.into(),
            canonical_key: canonical_key.into(),
            dedupe_key: "s1:x".into(),
            metadata: Metadata::new(),
            rowid: 1,
        }
    }

    #[test]
    fn empty_scope_matches_everything() {
        let scope = Scope::default();
        assert!(scope.matches(&event("s1", "k", "c")));
    }

    #[test]
    fn canonical_key_prefix_and_content_includes_combine_as_and() {
        let mut scope = Scope::default();
        scope.canonical_key_prefix = Some("pref/briefing/morning".to_string());
        scope.content_includes = vec!["morning".to_string()];

        assert!(scope.matches(&event("s1", "pref/briefing/morning", "morning briefing preference")));
        assert!(!scope.matches(&event("s1", "pref/briefing/morning", "skip after-lunch summaries")));
        assert!(!scope.matches(&event("s1", "other", "morning briefing preference")));
    }
}
