//! Tool configuration file
//!
//! ```toml
//! [registry]
//! root = "/var/lib/spectree"
//! cache_capacity = 1000
//!
//! [decompose]
//! neighbor_count = 8
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use spectree_core::DecomposeConfig;
use spectree_registry::RegistryConfig;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub(crate) struct ToolConfig {
    pub(crate) registry: Option<RegistryConfig>,
    #[serde(default)]
    pub(crate) decompose: DecomposeConfig,
}

impl ToolConfig {
    pub(crate) fn parse(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).context("invalid config file")?;
        config.decompose.validate()?;
        Ok(config)
    }

    pub(crate) fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        Self::parse(&text)
    }

    /// Resolve the registry from an explicit root or the config file
    pub(crate) fn resolve(config: Option<&Path>, root: Option<PathBuf>) -> Result<(RegistryConfig, DecomposeConfig)> {
        let file = config.map(Self::load).transpose()?;
        let decompose = file.as_ref().map(|f| f.decompose.clone()).unwrap_or_default();

        let registry = match (root, file.and_then(|f| f.registry)) {
            (Some(root), Some(from_file)) => from_file_with_root(from_file, root),
            (Some(root), None) => RegistryConfig::new(root),
            (None, Some(from_file)) => from_file,
            (None, None) => bail!("no registry given; pass --registry or a config with [registry]"),
        };
        Ok((registry, decompose))
    }
}

fn from_file_with_root(mut config: RegistryConfig, root: PathBuf) -> RegistryConfig {
    config.root = root;
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_sections() {
        let config = ToolConfig::parse(
            r#"
            [registry]
            root = "/tmp/reg"
            cache_capacity = 5

            [decompose]
            neighbor_count = 8
            "#,
        )
        .unwrap();

        let registry = config.registry.unwrap();
        assert_eq!(registry.root, PathBuf::from("/tmp/reg"));
        assert_eq!(registry.cache_capacity, 5);
        assert_eq!(config.decompose.neighbor_count, 8);
    }

    #[test]
    fn flag_overrides_file_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spectree.toml");
        std::fs::write(&path, "[registry]\nroot = \"/tmp/a\"\ncache_capacity = 7\n").unwrap();

        let (registry, decompose) =
            ToolConfig::resolve(Some(path.as_path()), Some(PathBuf::from("/tmp/b"))).unwrap();
        assert_eq!(registry.root, PathBuf::from("/tmp/b"));
        assert_eq!(registry.cache_capacity, 7);
        assert_eq!(decompose.neighbor_count, 5);
    }

    #[test]
    fn registry_is_required() {
        assert!(ToolConfig::resolve(None, None).is_err());
    }

    #[test]
    fn invalid_decompose_section_is_rejected() {
        assert!(ToolConfig::parse("[decompose]\nneighbor_count = 0\n").is_err());
    }
}
