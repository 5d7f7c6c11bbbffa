//! Catalog stores: where line lists come from.
//!
//! Every backend answers the same two questions through [`CatalogSource`]:
//! which sources exist, and what is the catalog of one of them. The
//! selection code never touches a store directly; callers load a
//! [`LineCatalog`] once and query it as often as they like.

use std::collections::BTreeMap;

use anyhow::Result;

use crate::data::model::{LineCatalog, QueryWindow, SourceInfo};
use crate::data::select::select;
use crate::error::LineError;

pub mod file;
pub mod sqlite;

pub use file::FileStore;
pub use sqlite::SqliteStore;

pub trait CatalogSource {
    /// Registered sources, ordered by id.
    fn sources(&self) -> Result<Vec<SourceInfo>>;

    /// Full catalog of one source.
    fn load(&self, source: &str) -> Result<LineCatalog>;

    /// Lines of one source inside `window`. Backends that can filter at
    /// the storage level override this.
    fn load_window(&self, source: &str, window: QueryWindow) -> Result<LineCatalog> {
        let catalog = self.load(source)?;
        Ok(LineCatalog::from_records(select(&catalog, window, None)?))
    }
}

// ---------------------------------------------------------------------------
// In-memory fixture store
// ---------------------------------------------------------------------------

/// Catalogs held in memory, keyed by short name.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    catalogs: BTreeMap<String, (SourceInfo, LineCatalog)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a catalog under `short_name`, replacing any previous one.
    pub fn insert(&mut self, short_name: &str, catalog: LineCatalog) -> &SourceInfo {
        let source_id = self
            .catalogs
            .get(short_name)
            .map(|(info, _)| info.source_id)
            .unwrap_or(self.catalogs.len() as i64 + 1);
        let info = SourceInfo {
            source_id,
            short_name: short_name.to_string(),
            display_name: short_name.to_string(),
            url: None,
            description: None,
        };
        self.catalogs.insert(short_name.to_string(), (info, catalog));
        &self.catalogs[short_name].0
    }
}

impl CatalogSource for MemoryStore {
    fn sources(&self) -> Result<Vec<SourceInfo>> {
        let mut sources: Vec<SourceInfo> = self.catalogs.values().map(|(info, _)| info.clone()).collect();
        sources.sort_by_key(|s| s.source_id);
        Ok(sources)
    }

    fn load(&self, source: &str) -> Result<LineCatalog> {
        self.catalogs
            .get(source)
            .map(|(_, catalog)| catalog.clone())
            .ok_or_else(|| LineError::UnknownSource(source.to_string()).into())
    }
}
