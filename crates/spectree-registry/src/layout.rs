//! On-disk layout
//!
//! ```text
//! <root>/docstrings/<hash>.txt
//! <root>/dependencies/<hash>/<child_hash>
//! <root>/dependents/<hash>/<parent_hash>
//! ```
//!
//! Edge markers are empty files; their names carry the edge.

use spectree_docstring::ContentHash;
use std::path::{Path, PathBuf};

pub(crate) const DOCSTRINGS_DIR: &str = "docstrings";
pub(crate) const DEPENDENCIES_DIR: &str = "dependencies";
pub(crate) const DEPENDENTS_DIR: &str = "dependents";
pub(crate) const DOCSTRING_EXT: &str = "txt";

/// Path arithmetic for a registry rooted at one directory
#[derive(Debug, Clone)]
pub struct RegistryLayout {
    root: PathBuf,
}

impl RegistryLayout {
    /// Layout rooted at `root`
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Registry root directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding all stored docstrings
    #[must_use]
    pub fn docstrings_dir(&self) -> PathBuf {
        self.root.join(DOCSTRINGS_DIR)
    }

    /// Stored text for `id`
    #[must_use]
    pub fn docstring_path(&self, id: &ContentHash) -> PathBuf {
        self.docstrings_dir()
            .join(format!("{id}.{DOCSTRING_EXT}"))
    }

    /// Directory of child markers for `id`
    #[must_use]
    pub fn dependencies_dir(&self, id: &ContentHash) -> PathBuf {
        self.root.join(DEPENDENCIES_DIR).join(id.to_string())
    }

    /// Directory of parent markers for `id`
    #[must_use]
    pub fn dependents_dir(&self, id: &ContentHash) -> PathBuf {
        self.root.join(DEPENDENTS_DIR).join(id.to_string())
    }

    /// Marker recording that `parent` depends on `child`
    #[must_use]
    pub fn dependency_marker(&self, parent: &ContentHash, child: &ContentHash) -> PathBuf {
        self.dependencies_dir(parent).join(child.to_string())
    }

    /// Marker recording that `parent` is a dependent of `child`
    #[must_use]
    pub fn dependent_marker(&self, child: &ContentHash, parent: &ContentHash) -> PathBuf {
        self.dependents_dir(child).join(parent.to_string())
    }

    /// The three top-level directories
    #[must_use]
    pub fn top_level_dirs(&self) -> [PathBuf; 3] {
        [
            self.docstrings_dir(),
            self.root.join(DEPENDENCIES_DIR),
            self.root.join(DEPENDENTS_DIR),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_follow_layout() {
        let layout = RegistryLayout::new("/reg");
        let a = ContentHash::of_text("a");
        let b = ContentHash::of_text("b");

        assert_eq!(
            layout.docstring_path(&a),
            PathBuf::from(format!("/reg/docstrings/{a}.txt"))
        );
        assert_eq!(
            layout.dependency_marker(&a, &b),
            PathBuf::from(format!("/reg/dependencies/{a}/{b}"))
        );
        assert_eq!(
            layout.dependent_marker(&b, &a),
            PathBuf::from(format!("/reg/dependents/{b}/{a}"))
        );
    }
}
