use ctxmem_core::path::{project_hash_from_root, resolve_workspace_path, ProjectHash};
use std::path::PathBuf;

/// Concrete on-disk layout rooted at the memory home directory, matching
/// the persisted-layout contract:
///
/// - `<home>/projects/<hash>/events.sqlite`
/// - `<home>/projects/<hash>/vectors/`
/// - `<home>/.turn-state-<session_id>.json`
/// - `<home>/session-registry.json`
/// - `<home>/shared/shared.sqlite`, `<home>/shared/vectors/`
/// - `<project storage>/mongo-sync.json`
pub struct Layout {
    home: PathBuf,
}

impl Layout {
    pub fn resolve(explicit_home: Option<&str>) -> crate::Result<Self> {
        let home = resolve_workspace_path(explicit_home).map_err(|e| crate::Error::Config(e.to_string()))?;
        Ok(Self { home })
    }

    pub fn home(&self) -> &std::path::Path {
        &self.home
    }

    pub fn project_hash(&self, project_root: &str) -> ProjectHash {
        project_hash_from_root(project_root)
    }

    pub fn project_dir(&self, hash: &ProjectHash) -> PathBuf {
        self.home.join("projects").join(hash.as_str())
    }

    pub fn events_db_path(&self, hash: &ProjectHash) -> PathBuf {
        self.project_dir(hash).join("events.sqlite")
    }

    pub fn vectors_dir(&self, hash: &ProjectHash) -> PathBuf {
        self.project_dir(hash).join("vectors")
    }

    pub fn mongo_sync_config_path(&self, hash: &ProjectHash) -> PathBuf {
        self.project_dir(hash).join("mongo-sync.json")
    }

    pub fn turn_state_path(&self, session_id: &str) -> PathBuf {
        self.home.join(format!(".turn-state-{}.json", session_id))
    }

    pub fn session_registry_path(&self) -> PathBuf {
        self.home.join("session-registry.json")
    }

    pub fn shared_dir(&self) -> PathBuf {
        self.home.join("shared")
    }

    pub fn shared_db_path(&self) -> PathBuf {
        self.shared_dir().join("shared.sqlite")
    }

    pub fn shared_vectors_dir(&self) -> PathBuf {
        self.shared_dir().join("vectors")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_nests_project_storage_under_an_eight_hex_hash() {
        let layout = Layout::resolve(Some("/tmp/ctxmem-layout-test")).unwrap();
        let hash = layout.project_hash("/tmp/some-project");
        assert_eq!(hash.as_str().len(), 8);

        let db = layout.events_db_path(&hash);
        assert!(db.starts_with(layout.home()));
        assert!(db.to_string_lossy().contains("projects"));
        assert!(db.ends_with("events.sqlite"));
    }

    #[test]
    fn shared_store_lives_directly_under_home() {
        let layout = Layout::resolve(Some("/tmp/ctxmem-layout-test")).unwrap();
        assert_eq!(layout.shared_db_path(), layout.home().join("shared/shared.sqlite"));
    }
}
