// src/fs/mod.rs

//! Path-resolution collaborator.
//!
//! Task launching only needs three questions answered about the filesystem:
//! where are we, does a path exist, and is it a directory. They sit behind a
//! trait so tests can supply a [`mock::MockPathResolver`].

use std::fmt::Debug;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub mod mock;

/// Abstract path-resolution interface.
pub trait PathResolver: Send + Sync + Debug {
    fn current_dir(&self) -> Result<PathBuf>;
    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
}

/// Implementation that uses `std::env` and `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealPathResolver;

impl PathResolver for RealPathResolver {
    fn current_dir(&self) -> Result<PathBuf> {
        std::env::current_dir().context("reading current working directory")
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }
}

/// Working directory for a task created "at" `path`.
///
/// An existing directory is used as-is; anything else (a file, or a path that
/// does not exist yet) falls back to its parent directory. A relative `path`
/// is taken relative to the resolver's current directory.
pub fn working_dir_for(resolver: &dyn PathResolver, path: &Path) -> Result<PathBuf> {
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        resolver.current_dir()?.join(path)
    };

    if resolver.exists(&path) && resolver.is_dir(&path) {
        return Ok(path);
    }

    match path.parent() {
        Some(parent) => Ok(parent.to_path_buf()),
        None => Ok(path),
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockPathResolver;
    use super::*;

    #[test]
    fn directory_is_used_directly() {
        let fs = MockPathResolver::new("/work");
        fs.add_dir("/work/project");

        let dir = working_dir_for(&fs, Path::new("/work/project")).unwrap();
        assert_eq!(dir, PathBuf::from("/work/project"));
    }

    #[test]
    fn file_falls_back_to_parent() {
        let fs = MockPathResolver::new("/work");
        fs.add_file("/work/project/build.sh");

        let dir = working_dir_for(&fs, Path::new("project/build.sh")).unwrap();
        assert_eq!(dir, PathBuf::from("/work/project"));
    }

    #[test]
    fn missing_path_falls_back_to_parent() {
        let fs = MockPathResolver::new("/work");

        let dir = working_dir_for(&fs, Path::new("/work/nope")).unwrap();
        assert_eq!(dir, PathBuf::from("/work"));
    }
}
