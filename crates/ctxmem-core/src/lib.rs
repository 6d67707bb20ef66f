//! Canonical keying and filesystem/path resolution shared by every crate
//! that touches the on-disk memory store.

pub mod canon;
pub mod error;
pub mod path;

pub use canon::{canonical_key, dedupe_key, same_canonical, CanonContext};
pub use error::{Error, Result};
pub use path::{
    discover_project_root, expand_tilde, normalize_path, paths_equal, project_hash_from_root,
    resolve_workspace_path, ProjectHash,
};
