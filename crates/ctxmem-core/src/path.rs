use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Opaque 8-hex identifier for a project's storage directory, derived from
/// its canonicalized filesystem path. Short enough to be human-readable in
/// a directory listing, long enough that accidental collisions are not a
/// practical concern for the number of projects any one machine will have.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectHash(String);

impl ProjectHash {
    pub fn new(hash: String) -> Self {
        Self(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProjectHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resolve the memory-store home directory based on priority:
/// 1. Explicit path (with tilde expansion)
/// 2. `CLAUDE_MEMORY_HOME` environment variable (with tilde expansion)
/// 3. System data directory
/// 4. `~/.claude-memory` (fallback for systems without a standard data dir)
pub fn resolve_workspace_path(explicit_path: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = explicit_path {
        return Ok(expand_tilde(path));
    }

    if let Ok(env_path) = std::env::var("CLAUDE_MEMORY_HOME") {
        return Ok(expand_tilde(&env_path));
    }

    if let Some(data_dir) = dirs::data_dir() {
        return Ok(data_dir.join("claude-memory"));
    }

    if let Some(home) = std::env::var_os("HOME") {
        return Ok(PathBuf::from(home).join(".claude-memory"));
    }

    Err(Error::Config(
        "could not determine memory store path: no HOME directory or system data directory found"
            .to_string(),
    ))
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return PathBuf::from(home).join(stripped);
    }
    PathBuf::from(path)
}

/// Derive the 8-hex project hash used to namespace a project's storage
/// directory under the memory home. Canonicalizes the path first so that
/// symlinked and relative representations of the same directory collide
/// on the same hash.
pub fn project_hash_from_root(project_root: &str) -> ProjectHash {
    let path = Path::new(project_root);
    let normalized = normalize_path(path);
    let path_str = normalized.to_string_lossy();

    let mut hasher = Sha256::new();
    hasher.update(path_str.as_bytes());
    let full = format!("{:x}", hasher.finalize());
    ProjectHash::new(full[..8].to_string())
}

/// Normalize a path for hashing/comparison: canonicalize if possible,
/// otherwise make absolute against the current working directory.
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        }
    })
}

pub fn paths_equal(path1: &Path, path2: &Path) -> bool {
    normalize_path(path1) == normalize_path(path2)
}

/// Discover the project root for the current invocation, in priority order:
/// explicit flag, `CLAUDE_MEMORY_PROJECT_ROOT` env var, current directory.
pub fn discover_project_root(explicit_project_root: Option<&str>) -> Result<PathBuf> {
    if let Some(root) = explicit_project_root {
        return Ok(PathBuf::from(root));
    }

    if let Ok(env_root) = std::env::var("CLAUDE_MEMORY_PROJECT_ROOT") {
        return Ok(PathBuf::from(env_root));
    }

    Ok(std::env::current_dir()?)
}
