//! Standard directories used by the dust map programs.
//!
//! All three directories hang off a single root:
//!
//! | Directory | Path |
//! |-----------|------|
//! | data | `<root>/data` |
//! | test | `<root>/test` |
//! | output | `<root>/output` |
//!
//! The root is `$DUSTMAPS_DIR` when set, otherwise the package directory.

use crate::{DustMapError, DustMapResult};
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

/// Environment variable that overrides the root directory.
pub const DUSTMAPS_DIR_ENV: &str = "DUSTMAPS_DIR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StdPaths {
    root: PathBuf,
    data_dir: PathBuf,
    test_dir: PathBuf,
    output_dir: PathBuf,
}

impl StdPaths {
    /// Builds the directory set under `root`.
    ///
    /// Relative roots are resolved against the current working directory and
    /// `..` components are folded, so every returned path is absolute and
    /// normalized.
    pub fn from_root(root: impl AsRef<Path>) -> Self {
        let root = absolutize(root.as_ref());
        Self {
            data_dir: root.join("data"),
            test_dir: root.join("test"),
            output_dir: root.join("output"),
            root,
        }
    }

    /// Resolves the root from `$DUSTMAPS_DIR`, falling back to the package
    /// directory.
    pub fn discover() -> Self {
        Self::resolve(std::env::var_os(DUSTMAPS_DIR_ENV).as_deref())
    }

    /// Same as [`discover`](Self::discover) with an explicit override value.
    /// An empty override is treated as unset.
    pub fn resolve(override_root: Option<&OsStr>) -> Self {
        match override_root {
            Some(root) if !root.is_empty() => Self::from_root(root),
            _ => Self::from_root(env!("CARGO_MANIFEST_DIR")),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn test_dir(&self) -> &Path {
        &self.test_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Creates the output directory (and parents) if it does not exist.
    pub fn ensure_output_dir(&self) -> DustMapResult<&Path> {
        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| DustMapError::io(&self.output_dir, e))?;
        Ok(&self.output_dir)
    }
}

impl Default for StdPaths {
    fn default() -> Self {
        Self::discover()
    }
}

/// Existing paths are resolved through symlinks. Paths that do not exist
/// yet are joined onto the working directory with `.` and `..` folded away.
fn absolutize(path: &Path) -> PathBuf {
    if let Ok(resolved) = path.canonicalize() {
        return resolved;
    }
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_root_layout() {
        let paths = StdPaths::from_root("/srv/dustmaps");
        assert_eq!(paths.root(), Path::new("/srv/dustmaps"));
        assert_eq!(paths.data_dir(), Path::new("/srv/dustmaps/data"));
        assert_eq!(paths.test_dir(), Path::new("/srv/dustmaps/test"));
        assert_eq!(paths.output_dir(), Path::new("/srv/dustmaps/output"));
    }

    #[test]
    fn test_relative_root_is_absolute() {
        let paths = StdPaths::from_root("maps");
        assert!(paths.root().is_absolute());
        assert!(paths.output_dir().ends_with("maps/output"));
    }

    #[test]
    fn test_root_folds_parent_components() {
        let paths = StdPaths::from_root("/srv/dustmaps/../maps/./current/..");
        assert_eq!(paths.root(), Path::new("/srv/maps"));
        assert_eq!(paths.data_dir(), Path::new("/srv/maps/data"));

        let relative = StdPaths::from_root("missing-dir/../maps");
        assert!(relative.root().is_absolute());
        assert!(relative.root().ends_with("maps"));
        assert!(!relative
            .root()
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::CurDir)));
    }

    #[test]
    fn test_existing_root_is_canonical() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("a")).unwrap();
        let paths = StdPaths::from_root(tmp.path().join("a").join(".."));
        assert_eq!(paths.root(), tmp.path().canonicalize().unwrap());
    }

    #[test]
    fn test_resolve_override() {
        let paths = StdPaths::resolve(Some(OsStr::new("/tmp/dust")));
        assert_eq!(paths.data_dir(), Path::new("/tmp/dust/data"));
    }

    #[test]
    fn test_resolve_falls_back_to_package_dir() {
        let expected = Path::new(env!("CARGO_MANIFEST_DIR")).canonicalize().unwrap();
        assert_eq!(StdPaths::resolve(None).root(), expected);
        assert_eq!(StdPaths::resolve(Some(OsStr::new(""))).root(), expected);
    }

    #[test]
    fn test_ensure_output_dir_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = StdPaths::from_root(tmp.path().join("nested"));
        assert!(!paths.output_dir().exists());

        let out = paths.ensure_output_dir().unwrap();
        assert!(out.is_dir());

        // Second call is a no-op.
        paths.ensure_output_dir().unwrap();
    }
}
