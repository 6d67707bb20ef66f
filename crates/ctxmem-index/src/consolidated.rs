use crate::connection::EventLog;
use crate::error::Result;
use chrono::{DateTime, Utc};
use ctxmem_types::{ConsolidatedMemory, ConsolidatedRule};
use rusqlite::{params, Row};

impl EventLog {
    pub fn insert_consolidated_memory(&self, memory: &ConsolidatedMemory) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO consolidated_memories
                (memory_id, summary, topics, source_events, confidence, created_at, accessed_at, access_count)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(memory_id) DO UPDATE SET
                summary = ?2, topics = ?3, source_events = ?4, confidence = ?5
            "#,
            params![
                memory.memory_id,
                memory.summary,
                serde_json::to_string(&memory.topics).unwrap_or_else(|_| "[]".to_string()),
                serde_json::to_string(&memory.source_events).unwrap_or_else(|_| "[]".to_string()),
                memory.confidence,
                memory.created_at.to_rfc3339(),
                memory.accessed_at.map(|t| t.to_rfc3339()),
                memory.access_count,
            ],
        )?;
        Ok(())
    }

    pub fn list_consolidated_memories(&self) -> Result<Vec<ConsolidatedMemory>> {
        let mut stmt = self.conn.prepare(
            "SELECT memory_id, summary, topics, source_events, confidence, created_at, \
             accessed_at, access_count FROM consolidated_memories ORDER BY created_at DESC",
        )?;
        let rows = stmt
            .query_map([], row_to_memory)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn touch_consolidated_memory(&self, memory_id: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE consolidated_memories SET accessed_at = ?2, access_count = access_count + 1 \
             WHERE memory_id = ?1",
            params![memory_id, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn promote_consolidated_rule(&self, rule: &ConsolidatedRule) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO consolidated_rules (memory_id, summary, topics, source_events, confidence, promoted_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(memory_id) DO NOTHING
            "#,
            params![
                rule.memory_id,
                rule.summary,
                serde_json::to_string(&rule.topics).unwrap_or_else(|_| "[]".to_string()),
                serde_json::to_string(&rule.source_events).unwrap_or_else(|_| "[]".to_string()),
                rule.confidence,
                rule.promoted_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn list_consolidated_rules(&self) -> Result<Vec<ConsolidatedRule>> {
        let mut stmt = self.conn.prepare(
            "SELECT memory_id, summary, topics, source_events, confidence, promoted_at \
             FROM consolidated_rules ORDER BY promoted_at DESC",
        )?;
        let rows = stmt
            .query_map([], row_to_rule)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

fn row_to_memory(row: &Row) -> rusqlite::Result<ConsolidatedMemory> {
    let topics: String = row.get(2)?;
    let source_events: String = row.get(3)?;
    let created_at: String = row.get(5)?;
    let accessed_at: Option<String> = row.get(6)?;

    Ok(ConsolidatedMemory {
        memory_id: row.get(0)?,
        summary: row.get(1)?,
        topics: serde_json::from_str(&topics).unwrap_or_default(),
        source_events: serde_json::from_str(&source_events).unwrap_or_default(),
        confidence: row.get(4)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        accessed_at: accessed_at.and_then(|t| DateTime::parse_from_rfc3339(&t).ok().map(|d| d.with_timezone(&Utc))),
        access_count: row.get(7)?,
    })
}

fn row_to_rule(row: &Row) -> rusqlite::Result<ConsolidatedRule> {
    let topics: String = row.get(2)?;
    let source_events: String = row.get(3)?;
    let promoted_at: String = row.get(5)?;

    Ok(ConsolidatedRule {
        memory_id: row.get(0)?,
        summary: row.get(1)?,
        topics: serde_json::from_str(&topics).unwrap_or_default(),
        source_events: serde_json::from_str(&source_events).unwrap_or_default(),
        confidence: row.get(4)?,
        promoted_at: DateTime::parse_from_rfc3339(&promoted_at)
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory(id: &str, confidence: f64, sources: usize) -> ConsolidatedMemory {
        ConsolidatedMemory {
            memory_id: id.to_string(),
            summary: "Topics: retry".to_string(),
            topics: vec!["retry".to_string()],
            source_events: (0..sources).map(|i| format!("e{i}")).collect(),
            confidence,
            created_at: Utc::now(),
            accessed_at: None,
            access_count: 0,
        }
    }

    #[test]
    fn promotable_memory_can_be_promoted_to_a_rule() {
        let log = EventLog::open_in_memory().unwrap();
        let mem = memory("m1", 0.6, 4);
        assert!(mem.is_promotable());
        log.insert_consolidated_memory(&mem).unwrap();
        log.promote_consolidated_rule(&mem.clone().into()).unwrap();

        assert_eq!(log.list_consolidated_memories().unwrap().len(), 1);
        assert_eq!(log.list_consolidated_rules().unwrap().len(), 1);
    }
}
