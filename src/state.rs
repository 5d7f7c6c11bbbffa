use anyhow::Result;

use crate::data::filter::{self, SpeciesFilter, init_species_filter};
use crate::data::model::{LineCatalog, LineRecord, QueryWindow};
use crate::data::select::{LineOrder, LineQuery};
use crate::error::LineError;
use crate::store::CatalogSource;

// ---------------------------------------------------------------------------
// Browser state
// ---------------------------------------------------------------------------

/// The state of one line-browsing session, independent of rendering.
///
/// A front end owns one of these, feeds it window/limit/species changes and
/// draws `visible` after each change.
pub struct LineBrowser {
    /// Loaded catalog (None until a source is loaded).
    pub catalog: Option<LineCatalog>,

    /// Short name of the loaded source.
    pub source: Option<String>,

    /// Current wavelength window.
    pub window: QueryWindow,

    /// Display budget: how many of the strongest lines to show.
    pub limit: Option<i64>,

    /// Selected species.
    pub species: SpeciesFilter,

    /// Display order used when paging through species.
    pub species_order: Vec<String>,

    /// Requested ordering of `visible`.
    pub order: LineOrder,

    /// Lines passing the current query (cached).
    pub visible: Vec<LineRecord>,

    /// Status / error message for the front end.
    pub status_message: Option<String>,
}

impl Default for LineBrowser {
    fn default() -> Self {
        Self {
            catalog: None,
            source: None,
            window: QueryWindow::new(3800.0, 4100.0),
            limit: Some(25),
            species: SpeciesFilter::new(),
            species_order: Vec::new(),
            order: LineOrder::Catalog,
            visible: Vec::new(),
            status_message: None,
        }
    }
}

impl LineBrowser {
    pub fn new(window: QueryWindow, limit: Option<i64>) -> Self {
        Self {
            window,
            limit,
            ..Self::default()
        }
    }

    /// Load `source` from `store` and make it the active catalog.
    pub fn load_source(&mut self, store: &dyn CatalogSource, source: &str) -> Result<()> {
        match store.load(source) {
            Ok(catalog) => {
                self.set_catalog(source, catalog);
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to load source {source}: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
                Err(e)
            }
        }
    }

    /// Ingest a catalog, select all its species and recompute.
    pub fn set_catalog(&mut self, source: &str, catalog: LineCatalog) {
        self.species = init_species_filter(&catalog);
        self.species_order = self.species.iter().cloned().collect();
        self.source = Some(source.to_string());
        self.catalog = Some(catalog);
        self.status_message = None;
        self.refilter();
    }

    /// Run the current query against the loaded catalog.
    pub fn query(&self) -> Result<Vec<LineRecord>, LineError> {
        let Some(catalog) = &self.catalog else {
            return Ok(Vec::new());
        };
        LineQuery::new(self.window)
            .limit(self.limit)
            .species(self.species.clone())
            .order(self.order)
            .run(catalog)
    }

    /// Recompute `visible` after any change.
    pub fn refilter(&mut self) {
        if self.catalog.is_none() {
            return;
        }
        match self.query() {
            Ok(lines) => {
                self.visible = lines;
                self.status_message = None;
            }
            Err(e) => {
                log::warn!("Line query failed: {e}");
                self.visible.clear();
                self.status_message = Some(format!("Error: {e}"));
            }
        }
        if self.window_exceeds_catalog() {
            log::warn!(
                "window [{}, {}] extends beyond the wavelength range of {}",
                self.window.min,
                self.window.max,
                self.source.as_deref().unwrap_or("the catalog")
            );
        }
    }

    /// Whether the current window reaches outside the catalog's wavelengths.
    pub fn window_exceeds_catalog(&self) -> bool {
        let Some((lo, hi)) = self.catalog.as_ref().and_then(|c| c.wavelength_bounds()) else {
            return false;
        };
        self.window.min < lo || self.window.max > hi
    }

    pub fn set_window(&mut self, window: QueryWindow) {
        self.window = window;
        self.refilter();
    }

    pub fn set_limit(&mut self, limit: Option<i64>) {
        self.limit = limit;
        self.refilter();
    }

    pub fn set_order(&mut self, order: LineOrder) {
        self.order = order;
        self.refilter();
    }

    /// Replace the species selection.
    pub fn set_species(&mut self, species: SpeciesFilter) {
        self.species = species;
        self.refilter();
    }

    /// Toggle a single species in the selection.
    pub fn toggle_species(&mut self, species: &str) {
        if !self.species.remove(species) {
            self.species.insert(species.to_string());
        }
        self.refilter();
    }

    /// Select every species of the catalog.
    pub fn select_all_species(&mut self) {
        self.species = self.species_order.iter().cloned().collect();
        self.refilter();
    }

    /// Deselect all species.
    pub fn select_no_species(&mut self) {
        self.species.clear();
        self.refilter();
    }

    /// Select the first `n` species of `species_order`.
    pub fn first_n_species(&mut self, n: usize) {
        self.species = filter::first_n_species(&self.species_order, n).into_iter().collect();
        self.refilter();
    }

    /// Page to the next `n` species of `species_order`.
    pub fn next_n_species(&mut self, n: usize) {
        let current: Vec<String> = self
            .species_order
            .iter()
            .filter(|s| self.species.contains(*s))
            .cloned()
            .collect();
        self.species = filter::next_n_species(&self.species_order, &current, n)
            .into_iter()
            .collect();
        self.refilter();
    }
}
