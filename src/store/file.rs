use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::CatalogSource;
use crate::data::loader::load_file;
use crate::data::model::{LineCatalog, SourceInfo};
use crate::error::LineError;

/// Bundled line lists and the file each one lives in.
pub const DEFAULT_REGISTRY: &[(&str, &str)] = &[
    ("hitran", "hitran_simplified.csv"),
    ("iraf_sky_lines", "iraf_sky_lines.csv"),
    ("VALD3", "vald3.csv"),
    ("chianti", "chianti.csv"),
    ("arcturus", "arcturus_optical.csv"),
];

/// Line lists stored as files in one directory.
///
/// The registry maps a source short name to a file name relative to the
/// directory; any format [`load_file`] understands is accepted.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    registry: BTreeMap<String, String>,
}

impl FileStore {
    /// Store over `dir` using [`DEFAULT_REGISTRY`].
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let registry = DEFAULT_REGISTRY
            .iter()
            .map(|(name, file)| (name.to_string(), file.to_string()))
            .collect();
        Self::with_registry(dir, registry)
    }

    pub fn with_registry(dir: impl Into<PathBuf>, registry: BTreeMap<String, String>) -> Self {
        FileStore {
            dir: dir.into(),
            registry,
        }
    }

    /// Read the registry from a JSON object `{ "short_name": "file.csv", ... }`.
    pub fn from_registry_file(dir: impl Into<PathBuf>, registry: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(registry)
            .with_context(|| format!("reading registry {}", registry.display()))?;
        let map: BTreeMap<String, String> = serde_json::from_str(&text)
            .with_context(|| format!("parsing registry {}", registry.display()))?;
        Ok(Self::with_registry(dir, map))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl CatalogSource for FileStore {
    fn sources(&self) -> Result<Vec<SourceInfo>> {
        Ok(self
            .registry
            .iter()
            .enumerate()
            .map(|(i, (name, file))| SourceInfo {
                source_id: i as i64 + 1,
                short_name: name.clone(),
                display_name: name.clone(),
                url: None,
                description: Some(file.clone()),
            })
            .collect())
    }

    fn load(&self, source: &str) -> Result<LineCatalog> {
        let file = self
            .registry
            .get(source)
            .ok_or_else(|| LineError::UnknownSource(source.to_string()))?;
        load_file(&self.dir.join(file))
    }
}
