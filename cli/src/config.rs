//! Project configuration file.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use adtql_core::ExtendOptions;
use serde::{Deserialize, Serialize};

use crate::summary::OutputFormat;

/// YAML project file naming the SDL sources of a schema.
///
/// ```yaml
/// base:
///   - schema/base.graphql
/// extensions:
///   - schema/billing.graphql
/// options:
///   assume_valid_sdl: false
/// format: text
/// ```
///
/// Relative paths are resolved against the directory holding the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub base: Vec<PathBuf>,
    pub extensions: Vec<PathBuf>,
    pub options: ExtendOptions,
    pub format: Option<OutputFormat>,
    /// List builtin and introspection types in summaries.
    pub include_builtins: bool,
}

impl ProjectConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|err| format!("Failed to open config '{}': {err}", path.display()))?;
        let mut config: Self = serde_yaml::from_reader(BufReader::new(file))
            .map_err(|err| format!("Failed to parse config '{}': {err}", path.display()))?;

        if let Some(root) = path.parent() {
            config.base = resolve_all(root, config.base);
            config.extensions = resolve_all(root, config.extensions);
        }
        Ok(config)
    }
}

fn resolve_all(root: &Path, paths: Vec<PathBuf>) -> Vec<PathBuf> {
    paths
        .into_iter()
        .map(|path| if path.is_absolute() { path } else { root.join(path) })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adtql.yaml");
        fs::write(
            &path,
            "base:\n  - base.graphql\nextensions:\n  - /abs/ext.graphql\noptions:\n  assume_valid_sdl: true\nformat: yaml\n",
        )
        .unwrap();

        let config = ProjectConfig::load(&path).unwrap();
        assert_eq!(config.base, vec![dir.path().join("base.graphql")]);
        assert_eq!(config.extensions, vec![PathBuf::from("/abs/ext.graphql")]);
        assert!(config.options.assume_valid_sdl);
        assert_eq!(config.format, Some(OutputFormat::Yaml));
        assert!(!config.include_builtins);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = ProjectConfig::load("/definitely/not/here.yaml").unwrap_err();
        assert!(err.starts_with("Failed to open config"));
    }
}
