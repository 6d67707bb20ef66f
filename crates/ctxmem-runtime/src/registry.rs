use crate::paths::Layout;
use crate::worker::Worker;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// Cap on the registry file so a long-lived machine doesn't grow it
/// unboundedly; the oldest entries are dropped first.
const MAX_REGISTERED_SESSIONS: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredSession {
    pub session_id: String,
    pub project_path: String,
    pub project_hash: String,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    sessions: Vec<RegisteredSession>,
}

/// Process-wide table of background workers keyed by a name unique to the
/// project+kind pair (e.g. `"<hash>:embedding"`), so a second call for the
/// same project reuses the already-running worker instead of spawning a
/// duplicate.
static WORKERS: Lazy<Mutex<HashMap<String, Worker>>> = Lazy::new(|| Mutex::new(HashMap::new()));

pub fn register_worker(key: String, worker: Worker) {
    let mut workers = WORKERS.lock().expect("workers registry poisoned");
    if let Some(previous) = workers.insert(key, worker) {
        previous.stop();
    }
}

pub fn worker_status(key: &str) -> Option<bool> {
    let workers = WORKERS.lock().expect("workers registry poisoned");
    workers.get(key).map(|w| w.is_running())
}

/// Stops every registered worker and drops its handle. Called on process
/// shutdown (CLI exit, SDK facade drop) so no thread outlives the process
/// intentionally — `Worker::stop` itself only flips the running flag and
/// joins, it does not leak.
pub fn shutdown() {
    let mut workers = WORKERS.lock().expect("workers registry poisoned");
    for (_, worker) in workers.drain() {
        worker.stop();
    }
}

/// Records (or refreshes) a session's project association in the
/// well-known registry file. Best-effort: a write failure here should
/// never fail the caller's actual ingest/retrieve path, so callers should
/// log and continue rather than propagate.
pub fn register_session(layout: &Layout, session_id: &str, project_path: &str, project_hash: &str) -> crate::Result<()> {
    let path = layout.session_registry_path();
    let mut file = read_registry(&path)?;

    file.sessions.retain(|s| s.session_id != session_id);
    file.sessions.push(RegisteredSession {
        session_id: session_id.to_string(),
        project_path: project_path.to_string(),
        project_hash: project_hash.to_string(),
        registered_at: Utc::now(),
    });
    file.sessions.sort_by(|a, b| a.registered_at.cmp(&b.registered_at));
    if file.sessions.len() > MAX_REGISTERED_SESSIONS {
        let excess = file.sessions.len() - MAX_REGISTERED_SESSIONS;
        file.sessions.drain(0..excess);
    }

    write_registry(&path, &file)
}

pub fn lookup_session(layout: &Layout, session_id: &str) -> crate::Result<Option<RegisteredSession>> {
    let file = read_registry(&layout.session_registry_path())?;
    Ok(file.sessions.into_iter().find(|s| s.session_id == session_id))
}

fn read_registry(path: &std::path::Path) -> crate::Result<RegistryFile> {
    if !path.exists() {
        return Ok(RegistryFile::default());
    }
    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(RegistryFile::default());
    }
    Ok(serde_json::from_str(&content)?)
}

/// Writes via a temp file + rename in the same directory so a reader never
/// observes a partially-written registry, even if the process is killed
/// mid-write.
fn write_registry(path: &std::path::Path, file: &RegistryFile) -> crate::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, serde_json::to_string_pretty(file)?)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn layout_at(dir: &TempDir) -> Layout {
        Layout::resolve(Some(dir.path().to_str().unwrap())).unwrap()
    }

    #[test]
    fn registering_a_session_makes_it_lookupable() {
        let dir = TempDir::new().unwrap();
        let layout = layout_at(&dir);
        register_session(&layout, "sess-1", "/home/user/proj", "deadbeef").unwrap();

        let found = lookup_session(&layout, "sess-1").unwrap().unwrap();
        assert_eq!(found.project_hash, "deadbeef");
    }

    #[test]
    fn re_registering_the_same_session_replaces_rather_than_duplicates() {
        let dir = TempDir::new().unwrap();
        let layout = layout_at(&dir);
        register_session(&layout, "sess-1", "/a", "hash-a").unwrap();
        register_session(&layout, "sess-1", "/b", "hash-b").unwrap();

        let file = read_registry(&layout.session_registry_path()).unwrap();
        assert_eq!(file.sessions.len(), 1);
        assert_eq!(file.sessions[0].project_hash, "hash-b");
    }

    #[test]
    fn registry_is_capped_at_the_most_recent_sessions() {
        let dir = TempDir::new().unwrap();
        let layout = layout_at(&dir);
        for i in 0..(MAX_REGISTERED_SESSIONS + 10) {
            register_session(&layout, &format!("sess-{i}"), "/p", "h").unwrap();
        }
        let file = read_registry(&layout.session_registry_path()).unwrap();
        assert_eq!(file.sessions.len(), MAX_REGISTERED_SESSIONS);
        assert!(file.sessions.iter().any(|s| s.session_id == format!("sess-{}", MAX_REGISTERED_SESSIONS + 9)));
    }
}
