//! Content-addressed docstring registry
//!
//! Stores each docstring once under its hash and keeps dependency and
//! dependent edges as marker files. There is no lock: every operation is
//! idempotent on its own, so concurrent expansions writing the same node or
//! the same edge converge on the same state.

use crate::cache::TextCache;
use crate::error::{RegistryError, RegistryResult};
use crate::graph::DependencyGraph;
use crate::layout::{RegistryLayout, DOCSTRING_EXT};
use serde::{Deserialize, Serialize};
use spectree_docstring::{ContentHash, Docstring};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use ulid::Ulid;

/// Registry location and cache sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Registry root directory
    pub root: PathBuf,
    /// Maximum cached docstrings
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
}

fn default_cache_capacity() -> u64 {
    10_000
}

impl RegistryConfig {
    /// Config for `root` with default cache capacity
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache_capacity: default_cache_capacity(),
        }
    }

    /// With cache capacity
    #[inline]
    #[must_use]
    pub fn with_cache_capacity(mut self, capacity: u64) -> Self {
        self.cache_capacity = capacity;
        self
    }
}

/// On-disk registry of docstrings and their edges
#[derive(Debug, Clone)]
pub struct Registry {
    layout: RegistryLayout,
    cache: TextCache,
}

impl Registry {
    /// Open (creating if needed) a registry at `root`
    ///
    /// # Errors
    /// - `RegistryError::Io` if the top-level directories cannot be created
    pub async fn open(root: impl Into<PathBuf>) -> RegistryResult<Self> {
        Self::open_with_config(&RegistryConfig::new(root)).await
    }

    /// Open a registry described by `config`
    ///
    /// # Errors
    /// - `RegistryError::Io` if the top-level directories cannot be created
    pub async fn open_with_config(config: &RegistryConfig) -> RegistryResult<Self> {
        let layout = RegistryLayout::new(&config.root);
        for dir in layout.top_level_dirs() {
            create_dir_all(&dir).await?;
        }

        tracing::debug!("Opened registry at {}", config.root.display());

        Ok(Self {
            layout,
            cache: TextCache::new(config.cache_capacity),
        })
    }

    /// Registry root directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    /// Path arithmetic for this registry
    #[inline]
    #[must_use]
    pub fn layout(&self) -> &RegistryLayout {
        &self.layout
    }

    /// Store a docstring under its content hash
    ///
    /// Idempotent: storing the same text again leaves the file untouched.
    /// New files are written to a unique temp name and renamed into place,
    /// so racing writers of one text never expose a partial file.
    ///
    /// # Errors
    /// - `RegistryError::Io` if the write or rename fails
    pub async fn put(&self, docstring: &Docstring) -> RegistryResult<ContentHash> {
        let id = docstring.id();
        let path = self.layout.docstring_path(&id);

        if try_exists(&path).await? {
            self.cache.insert(docstring.clone()).await;
            return Ok(id);
        }

        let tmp = self
            .layout
            .docstrings_dir()
            .join(format!(".{id}.{}.tmp", Ulid::new()));
        tokio::fs::write(&tmp, docstring.text().as_bytes())
            .await
            .map_err(|e| RegistryError::from_io(&tmp, e))?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(RegistryError::from_io(&path, e));
        }

        self.cache.insert(docstring.clone()).await;
        tracing::debug!("Stored docstring {}", id.short());

        Ok(id)
    }

    /// Load a stored docstring
    ///
    /// # Errors
    /// - `RegistryError::NotFound` if nothing is stored under `id`
    /// - `RegistryError::InvalidText` if the file is not UTF-8
    pub async fn get(&self, id: &ContentHash) -> RegistryResult<Docstring> {
        let path = self.layout.docstring_path(id);
        self.cache
            .try_get_or_load(*id, || async move {
                let bytes = tokio::fs::read(&path)
                    .await
                    .map_err(|e| RegistryError::from_io(&path, e))?;
                let text =
                    String::from_utf8(bytes).map_err(|_| RegistryError::InvalidText { path })?;
                Ok(Docstring::new(text))
            })
            .await
    }

    /// Whether a docstring is stored under `id`
    ///
    /// # Errors
    /// - `RegistryError::Io` if existence cannot be determined
    pub async fn contains(&self, id: &ContentHash) -> RegistryResult<bool> {
        try_exists(&self.layout.docstring_path(id)).await
    }

    /// Ids of every stored docstring, sorted
    ///
    /// Files whose name is not a hash are logged and skipped.
    ///
    /// # Errors
    /// - `RegistryError::Io` if the docstrings directory cannot be listed
    pub async fn ids(&self) -> RegistryResult<Vec<ContentHash>> {
        let dir = self.layout.docstrings_dir();
        let mut ids = Vec::new();
        for (name, path) in list_dir(&dir).await? {
            let Some(stem) = name.strip_suffix(&format!(".{DOCSTRING_EXT}")) else {
                continue;
            };
            if stem.starts_with('.') {
                continue;
            }
            match stem.parse::<ContentHash>() {
                Ok(id) => ids.push(id),
                Err(err) => tracing::warn!("Skipping {}: {err}", path.display()),
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Record that `parent` depends on `child`, in both directions
    ///
    /// Safe to call concurrently; existing markers and directories count as
    /// success.
    ///
    /// # Errors
    /// - `RegistryError::Io` if a marker cannot be created
    pub async fn add_dependency(&self, parent: &ContentHash, child: &ContentHash) -> RegistryResult<()> {
        touch(&self.layout.dependency_marker(parent, child)).await?;
        touch(&self.layout.dependent_marker(child, parent)).await
    }

    /// Record the child-to-parent half of an edge only
    ///
    /// Written before the child expands, so a crash leaves every stored node
    /// linked back to its parent even if the parent's child list is
    /// incomplete. [`Registry::add_dependency`] later completes the mirror.
    ///
    /// # Errors
    /// - `RegistryError::Io` if the marker cannot be created
    pub async fn add_dependent(&self, child: &ContentHash, parent: &ContentHash) -> RegistryResult<()> {
        touch(&self.layout.dependent_marker(child, parent)).await
    }

    /// Children of `id`; a node that never got a child list has none
    ///
    /// # Errors
    /// - `RegistryError::InvalidEntry` if a marker is not a hash
    pub async fn dependencies(&self, id: &ContentHash) -> RegistryResult<BTreeSet<ContentHash>> {
        read_edges(&self.layout.dependencies_dir(id)).await
    }

    /// Parents of `id`
    ///
    /// # Errors
    /// - `RegistryError::InvalidEntry` if a marker is not a hash
    pub async fn dependents(&self, id: &ContentHash) -> RegistryResult<BTreeSet<ContentHash>> {
        read_edges(&self.layout.dependents_dir(id)).await
    }

    /// Delete the stored text and both edge directories of `id`
    ///
    /// Already-missing pieces are skipped, so removal can be repeated.
    ///
    /// # Errors
    /// - `RegistryError::Io` on failures other than absence
    pub async fn remove_node(&self, id: &ContentHash) -> RegistryResult<()> {
        remove_file_if_exists(&self.layout.docstring_path(id)).await?;
        remove_dir_if_exists(&self.layout.dependencies_dir(id)).await?;
        remove_dir_if_exists(&self.layout.dependents_dir(id)).await?;
        self.cache.invalidate(id).await;

        tracing::debug!("Removed node {}", id.short());
        Ok(())
    }

    /// Point every dependent of `old` at `new` instead
    ///
    /// Returns the dependents that were moved. A dependent equal to `new`
    /// only loses its edge, since a node cannot depend on itself.
    ///
    /// # Errors
    /// - `RegistryError::NotFound` if a dependent lacks its `d -> old` marker
    pub async fn rewire_dependents(&self, old: &ContentHash, new: &ContentHash) -> RegistryResult<Vec<ContentHash>> {
        let dependents = self.dependents(old).await?;
        let mut rewired = Vec::with_capacity(dependents.len());

        for dependent in dependents {
            let stale = self.layout.dependency_marker(&dependent, old);
            tokio::fs::remove_file(&stale)
                .await
                .map_err(|e| RegistryError::from_io(&stale, e))?;

            if dependent != *new {
                self.add_dependency(&dependent, new).await?;
            }
            remove_file_if_exists(&self.layout.dependent_marker(old, &dependent)).await?;

            tracing::debug!(
                "Rewired {} from {} to {}",
                dependent.short(),
                old.short(),
                new.short()
            );
            rewired.push(dependent);
        }

        Ok(rewired)
    }

    /// Remove `id` as a self-reference: drop every edge touching it, then the node
    ///
    /// Edges pointing at `id` are void rather than moved.
    ///
    /// # Errors
    /// - `RegistryError::Io` on failures other than absence
    pub async fn prune_node(&self, id: &ContentHash) -> RegistryResult<()> {
        for dependent in self.dependents(id).await? {
            remove_file_if_exists(&self.layout.dependency_marker(&dependent, id)).await?;
        }
        self.detach_children(id).await?;
        self.remove_node(id).await
    }

    /// Fold `old` into `new`: move dependents over, then remove `old`
    ///
    /// # Errors
    /// - `RegistryError::NotFound` if a dependent lacks its marker
    pub async fn merge_node(&self, old: &ContentHash, new: &ContentHash) -> RegistryResult<()> {
        self.rewire_dependents(old, new).await?;
        self.detach_children(old).await?;
        self.remove_node(old).await
    }

    /// Materialize everything reachable from `root` over dependency markers
    ///
    /// Each node's directory is read once, so shared children and cycles
    /// cost nothing extra.
    ///
    /// # Errors
    /// - `RegistryError::InvalidEntry` if a marker is not a hash
    pub async fn dependency_graph(&self, root: &ContentHash) -> RegistryResult<DependencyGraph> {
        let mut edges = BTreeMap::new();
        let mut queue = VecDeque::from([*root]);

        while let Some(id) = queue.pop_front() {
            if edges.contains_key(&id) {
                continue;
            }
            let children = self.dependencies(&id).await?;
            queue.extend(children.iter().filter(|c| !edges.contains_key(*c)).copied());
            edges.insert(id, children);
        }

        Ok(DependencyGraph::new(*root, edges))
    }

    /// Get cache statistics
    #[inline]
    #[must_use]
    pub fn cache_stats(&self) -> crate::cache::CacheStats {
        self.cache.stats()
    }

    async fn detach_children(&self, id: &ContentHash) -> RegistryResult<()> {
        for child in self.dependencies(id).await? {
            remove_file_if_exists(&self.layout.dependent_marker(&child, id)).await?;
        }
        Ok(())
    }
}

async fn create_dir_all(dir: &Path) -> RegistryResult<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| RegistryError::from_io(dir, e))
}

async fn try_exists(path: &Path) -> RegistryResult<bool> {
    tokio::fs::try_exists(path)
        .await
        .map_err(|e| RegistryError::from_io(path, e))
}

async fn touch(path: &Path) -> RegistryResult<()> {
    if let Some(dir) = path.parent() {
        create_dir_all(dir).await?;
    }
    tokio::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
        .await
        .map(drop)
        .map_err(|e| RegistryError::from_io(path, e))
}

async fn remove_file_if_exists(path: &Path) -> RegistryResult<()> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(RegistryError::from_io(path, e)),
        _ => Ok(()),
    }
}

async fn remove_dir_if_exists(path: &Path) -> RegistryResult<()> {
    match tokio::fs::remove_dir_all(path).await {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(RegistryError::from_io(path, e)),
        _ => Ok(()),
    }
}

/// File names and paths in `dir`; a missing directory lists as empty
async fn list_dir(dir: &Path) -> RegistryResult<Vec<(String, PathBuf)>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(RegistryError::from_io(dir, e)),
    };

    let mut listed = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| RegistryError::from_io(dir, e))?
    {
        let name = entry.file_name().to_string_lossy().into_owned();
        listed.push((name, entry.path()));
    }
    Ok(listed)
}

async fn read_edges(dir: &Path) -> RegistryResult<BTreeSet<ContentHash>> {
    list_dir(dir)
        .await?
        .into_iter()
        .map(|(name, path)| {
            name.parse()
                .map_err(|source| RegistryError::InvalidEntry { path, source })
        })
        .collect()
}
