use crate::error::{Error, Result};
use crate::record::{passes_filter, SearchFilter, SearchHit, SearchOptions, VectorRecord};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// In-memory, disk-persisted brute-force vector index.
///
/// No ANN structure: every search is a full scan scoring every record by
/// cosine similarity. This is deliberate — the corpus this workspace
/// learns from (`stratadb`) defaults to a brute-force backend too, and at
/// the event-log scale this engine targets (a single developer's project
/// history) a full scan is fast enough that an ANN index would only add
/// operational risk for no measurable benefit.
///
/// Upserts are keyed by `event_id`: re-embedding an event replaces its
/// prior vector rather than appending a duplicate.
pub struct VectorIndex {
    dim: usize,
    path: PathBuf,
    records: HashMap<String, VectorRecord>,
    by_event_id: HashMap<String, String>,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct PersistedIndex {
    dim: usize,
    records: Vec<VectorRecord>,
}

impl VectorIndex {
    /// Open (or create) a vector index backed by a single JSON file at
    /// `path`. `dim` pins the embedding dimensionality this index accepts;
    /// mixing embedding versions in one index is forbidden by the caller
    /// (see `ctxmem-runtime`'s embedding worker), not enforced here beyond
    /// rejecting mismatched vector lengths.
    pub fn open(path: impl Into<PathBuf>, dim: usize) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Ok(Self {
                dim,
                path,
                records: HashMap::new(),
                by_event_id: HashMap::new(),
            });
        }

        let raw = std::fs::read_to_string(&path)?;
        let persisted: PersistedIndex = serde_json::from_str(&raw)?;

        let mut records = HashMap::new();
        let mut by_event_id = HashMap::new();
        for record in persisted.records {
            by_event_id.insert(record.event_id.clone(), record.id.clone());
            records.insert(record.id.clone(), record);
        }

        Ok(Self {
            dim: persisted.dim,
            path,
            records,
            by_event_id,
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// Idempotent by `event_id`: a prior record for the same event is
    /// replaced.
    pub fn upsert(&mut self, record: VectorRecord) -> Result<()> {
        if record.vector.len() != self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                got: record.vector.len(),
            });
        }

        if let Some(prior_id) = self.by_event_id.get(&record.event_id).cloned()
            && prior_id != record.id
        {
            self.records.remove(&prior_id);
        }

        self.by_event_id
            .insert(record.event_id.clone(), record.id.clone());
        self.records.insert(record.id.clone(), record);
        Ok(())
    }

    pub fn upsert_batch(&mut self, records: Vec<VectorRecord>) -> Result<()> {
        for record in records {
            self.upsert(record)?;
        }
        Ok(())
    }

    pub fn delete(&mut self, event_id: &str) -> bool {
        if let Some(id) = self.by_event_id.remove(event_id) {
            self.records.remove(&id);
            true
        } else {
            false
        }
    }

    /// Cosine similarity mapped to `[0, 1]` (`1 - distance/2`), sorted
    /// descending, filtered by `min_score` and the supplied predicate.
    pub fn search(&self, query: &[f32], opts: &SearchOptions) -> Result<Vec<SearchHit>> {
        if query.len() != self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                got: query.len(),
            });
        }

        let mut hits: Vec<SearchHit> = self
            .records
            .values()
            .filter(|r| passes_filter(r, &opts.filter))
            .filter_map(|record| {
                let similarity = cosine_similarity(query, &record.vector);
                if similarity >= opts.min_score {
                    Some(SearchHit {
                        record: record.clone(),
                        similarity,
                    })
                } else {
                    None
                }
            })
            .collect();

        hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        hits.truncate(opts.limit);
        Ok(hits)
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let persisted = PersistedIndex {
            dim: self.dim,
            records: self.records.values().cloned().collect(),
        };
        let serialized = serde_json::to_string(&persisted)?;

        let tmp_path = tmp_path_for(&self.path);
        std::fs::write(&tmp_path, serialized)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let file_name = path
        .file_name()
        .map(|n| format!("{}.tmp", n.to_string_lossy()))
        .unwrap_or_else(|| "index.tmp".to_string());
    tmp.set_file_name(file_name);
    tmp
}

/// Cosine similarity mapped into `[0, 1]`. Two zero vectors are defined as
/// dissimilar (`0.0`) rather than undefined, since a search should never
/// rank a degenerate embedding above a real one.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let cosine = (dot / (norm_a * norm_b)).clamp(-1.0, 1.0);
    let distance = 1.0 - cosine;
    (1.0 - distance / 2.0).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ctxmem_types::{EventType, Metadata};
    use tempfile::TempDir;

    fn record(id: &str, event_id: &str, vector: Vec<f32>) -> VectorRecord {
        VectorRecord {
            id: id.to_string(),
            event_id: event_id.to_string(),
            session_id: "s1".to_string(),
            event_type: EventType::UserPrompt,
            content: "content".to_string(),
            vector,
            timestamp: Utc::now(),
            metadata: Metadata::new(),
        }
    }

    #[test]
    fn identical_vectors_score_one() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn opposite_vectors_score_zero() {
        assert!(cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) < 1e-6);
    }

    #[test]
    fn upsert_is_idempotent_by_event_id() {
        let dir = TempDir::new().unwrap();
        let mut index = VectorIndex::open(dir.path().join("vectors.json"), 2).unwrap();

        index.upsert(record("v1", "e1", vec![1.0, 0.0])).unwrap();
        index.upsert(record("v2", "e1", vec![0.0, 1.0])).unwrap();

        assert_eq!(index.count(), 1);
        let hits = index
            .search(&[0.0, 1.0], &SearchOptions::default())
            .unwrap();
        assert_eq!(hits[0].record.id, "v2");
    }

    #[test]
    fn search_filters_by_min_score_and_sorts_descending() {
        let dir = TempDir::new().unwrap();
        let mut index = VectorIndex::open(dir.path().join("vectors.json"), 2).unwrap();
        index.upsert(record("v1", "e1", vec![1.0, 0.0])).unwrap();
        index.upsert(record("v2", "e2", vec![0.0, 1.0])).unwrap();

        let hits = index
            .search(
                &[1.0, 0.0],
                &SearchOptions {
                    limit: 10,
                    min_score: 0.9,
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.id, "v1");
    }

    #[test]
    fn delete_removes_by_event_id() {
        let dir = TempDir::new().unwrap();
        let mut index = VectorIndex::open(dir.path().join("vectors.json"), 2).unwrap();
        index.upsert(record("v1", "e1", vec![1.0, 0.0])).unwrap();
        assert!(index.delete("e1"));
        assert_eq!(index.count(), 0);
        assert!(!index.delete("e1"));
    }

    #[test]
    fn save_and_reopen_round_trips_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vectors.json");
        {
            let mut index = VectorIndex::open(&path, 2).unwrap();
            index.upsert(record("v1", "e1", vec![1.0, 0.0])).unwrap();
            index.save().unwrap();
        }

        let reopened = VectorIndex::open(&path, 2).unwrap();
        assert_eq!(reopened.count(), 1);
    }

    #[test]
    fn rejects_vector_with_wrong_dimension() {
        let dir = TempDir::new().unwrap();
        let mut index = VectorIndex::open(dir.path().join("vectors.json"), 4).unwrap();
        let err = index.upsert(record("v1", "e1", vec![1.0, 0.0])).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }
}
