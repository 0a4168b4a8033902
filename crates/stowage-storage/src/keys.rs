//! Shared key and path construction for storage backends.
//!
//! Remote objects are keyed `{directory}/{filename}`. URLs for an empty
//! filename point at the directory prefix itself. Local paths are built
//! component-wise under the storage root.

use crate::traits::{StorageError, StorageResult};
use std::path::{Component, Path, PathBuf};

/// Object key used for writes and deletes.
pub fn object_key(directory: &str, filename: &str) -> String {
    format!("{}/{}", directory, filename)
}

/// Object key used for URLs; an empty filename addresses the prefix.
pub fn url_key(directory: &str, filename: &str) -> String {
    if filename.is_empty() {
        directory.to_string()
    } else {
        object_key(directory, filename)
    }
}

/// Resolve `directory/filename` below `root`.
///
/// Root and `.` components are dropped the way a lexical join would; `..`
/// is rejected so the result can never leave `root`.
pub fn local_path(root: &Path, directory: &str, filename: &str) -> StorageResult<PathBuf> {
    let mut path = root.to_path_buf();
    push_components(&mut path, directory)?;
    push_components(&mut path, filename)?;
    Ok(path)
}

fn push_components(path: &mut PathBuf, part: &str) -> StorageResult<()> {
    for component in Path::new(part).components() {
        match component {
            Component::Normal(segment) => path.push(segment),
            Component::CurDir | Component::RootDir => {}
            Component::ParentDir | Component::Prefix(_) => {
                return Err(StorageError::InvalidKey(format!(
                    "{:?} escapes the storage root",
                    part
                )));
            }
        }
    }
    Ok(())
}
