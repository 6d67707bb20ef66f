use crate::context::ExecutionContext;
use crate::output::{self, dim, heading};
use anyhow::Result;
use ctxmem_sdk::{RetrieveOptions, Strategy};
use serde::Serialize;

#[derive(Serialize)]
struct SearchView {
    confidence: String,
    fallback_trace: Vec<String>,
    context: String,
    memories: Vec<MemoryView>,
}

#[derive(Serialize)]
struct MemoryView {
    id: String,
    event_type: String,
    session_id: String,
    score: f64,
    content: String,
}

pub fn run(
    ctx: &ExecutionContext,
    query: &str,
    strategy: &str,
    session: Option<String>,
    top_k: usize,
    min_score: Option<f64>,
    json: bool,
) -> Result<()> {
    let client = ctx.client()?;

    let mut opts = RetrieveOptions {
        strategy: parse_strategy(strategy),
        top_k,
        ..RetrieveOptions::default()
    };
    if let Some(min_score) = min_score {
        opts.min_score = min_score;
    }
    if let Some(session) = session {
        opts.scope.session_id = Some(session);
    }

    let result = client.retrieve(query, opts)?;

    let view = SearchView {
        confidence: format!("{:?}", result.confidence).to_lowercase(),
        fallback_trace: result.fallback_trace.clone(),
        context: result.context.text.clone(),
        memories: result
            .memories
            .iter()
            .map(|m| MemoryView {
                id: m.event.id.clone(),
                event_type: m.event.event_type.as_str().to_string(),
                session_id: m.event.session_id.clone(),
                score: m.score,
                content: m.event.content.clone(),
            })
            .collect(),
    };

    output::render(json, &view, || {
        println!("{}", heading(&format!("{} result(s), confidence: {}", view.memories.len(), view.confidence)));
        if !view.fallback_trace.is_empty() {
            println!("{}", dim(&format!("fallback: {}", view.fallback_trace.join(" -> "))));
        }
        println!();
        for memory in &view.memories {
            println!("[{:.2}] ({}) {}", memory.score, memory.event_type, memory.content);
        }
    })
}

fn parse_strategy(s: &str) -> Strategy {
    match s {
        "fast" => Strategy::Fast,
        "deep" => Strategy::Deep,
        _ => Strategy::Auto,
    }
}
