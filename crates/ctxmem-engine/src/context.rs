use ctxmem_types::Event;

/// One ranked memory plus the neighboring events from the same session,
/// used to give the formatted block a sliver of surrounding conversation.
#[derive(Debug, Clone)]
pub struct RetrievedMemory {
    pub event: Event,
    pub score: f64,
    pub neighbor_before: Option<Event>,
    pub neighbor_after: Option<Event>,
}

/// Result of packing ranked memories into a context block under a token
/// budget: the formatted text plus how many memories actually fit.
#[derive(Debug, Clone)]
pub struct AssembledContext {
    pub text: String,
    pub included: usize,
}

/// Token count is estimated as `text.len() / 4`, matching the budget the
/// caller passes as `max_tokens` — this is deliberately crude rather than
/// tokenizer-accurate, since the budget itself is a soft guard, not a hard
/// model limit.
fn estimate_tokens(text: &str) -> usize {
    text.len() / 4
}

pub fn format_memory(memory: &RetrievedMemory) -> String {
    let date = memory.event.timestamp.format("%Y-%m-%d");
    let mut block = format!(
        "**{}** ({date}, score: {:.2})\n{}",
        memory.event.event_type.as_str(),
        memory.score,
        memory.event.content,
    );

    if memory.neighbor_before.is_some() || memory.neighbor_after.is_some() {
        block.push_str("\n\n_Context:_ ");
        if let Some(before) = &memory.neighbor_before {
            block.push_str(&before.content);
        }
        if memory.neighbor_before.is_some() && memory.neighbor_after.is_some() {
            block.push_str(" / ");
        }
        if let Some(after) = &memory.neighbor_after {
            block.push_str(&after.content);
        }
    }

    block
}

/// Greedily appends formatted memories (already in final rank order) until
/// the estimated token count would exceed `max_tokens`. Always includes at
/// least the first memory, even if it alone exceeds the budget, so a
/// caller never gets an empty context for a non-empty result set.
pub fn assemble_context(memories: &[RetrievedMemory], max_tokens: usize) -> AssembledContext {
    let mut blocks: Vec<String> = Vec::new();
    let mut tokens = 0usize;

    for memory in memories {
        let block = format_memory(memory);
        let block_tokens = estimate_tokens(&block);
        if !blocks.is_empty() && tokens + block_tokens > max_tokens {
            break;
        }
        tokens += block_tokens;
        blocks.push(block);
    }

    AssembledContext {
        included: blocks.len(),
        text: blocks.join("\n\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ctxmem_types::{EventType, Metadata};

    fn memory(content: &str, score: f64) -> RetrievedMemory {
        RetrievedMemory {
            event: Event {
                id: "e1".into(),
                event_type: EventType::UserPrompt,
                session_id: "s1".into(),
                turn_id: None,
                timestamp: Utc::now(),
                content: content.to_string(),
                canonical_key: "k".into(),
                dedupe_key: "s1:x".into(),
                metadata: Metadata::new(),
                rowid: 1,
            },
            score,
            neighbor_before: None,
            neighbor_after: None,
        }
    }

    #[test]
    fn format_includes_type_date_and_score() {
        let block = format_memory(&memory("hello", 0.876));
        assert!(block.starts_with("**user_prompt**"));
        assert!(block.contains("score: 0.88"));
        assert!(block.contains("hello"));
    }

    #[test]
    fn assembly_always_includes_at_least_one_memory() {
        let huge = "x".repeat(10_000);
        let result = assemble_context(&[memory(&huge, 0.9)], 1);
        assert_eq!(result.included, 1);
    }

    #[test]
    fn assembly_stops_once_the_budget_is_exceeded() {
        let memories = vec![memory("short one", 0.9), memory("short two", 0.8), memory("short three", 0.7)];
        let result = assemble_context(&memories, 10);
        assert!(result.included < memories.len());
    }
}
