use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::filter::{self, SpeciesFilter};
use super::model::{LineCatalog, LineRecord, QueryWindow};
use crate::error::LineError;

// ---------------------------------------------------------------------------
// Line selection: window filter + top-N-by-strength
// ---------------------------------------------------------------------------

/// Requested ordering of a selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineOrder {
    /// Catalog order for unranked results, strength order for ranked ones.
    #[default]
    Catalog,
    /// Ascending wavelength.
    Wavelength,
    /// Descending strength, stable on ties.
    StrengthDescending,
}

/// A line query: window, optional display budget, optional species filter.
#[derive(Debug, Clone, PartialEq)]
pub struct LineQuery {
    pub window: QueryWindow,
    pub limit: Option<i64>,
    pub species: Option<SpeciesFilter>,
    pub order: LineOrder,
}

impl LineQuery {
    pub fn new(window: QueryWindow) -> Self {
        LineQuery {
            window,
            limit: None,
            species: None,
            order: LineOrder::Catalog,
        }
    }

    pub fn limit(mut self, limit: Option<i64>) -> Self {
        self.limit = limit;
        self
    }

    pub fn species(mut self, species: SpeciesFilter) -> Self {
        self.species = Some(species);
        self
    }

    pub fn order(mut self, order: LineOrder) -> Self {
        self.order = order;
        self
    }

    /// Run the query against a catalog.
    ///
    /// Lines inside the window (inclusive) that pass the species filter are
    /// kept. When `limit` is smaller than that count, the cutoff is the
    /// `limit`-th largest strength and every line at or above it is returned,
    /// so ties at the cutoff can push the result past `limit`.
    pub fn run(&self, catalog: &LineCatalog) -> Result<Vec<LineRecord>, LineError> {
        let window = self.window;
        if !window.is_finite() {
            return Err(LineError::InvalidWindow {
                min: window.min,
                max: window.max,
            });
        }
        let limit = match self.limit {
            Some(k) => Some(usize::try_from(k).map_err(|_| LineError::InvalidLimit(k))?),
            None => None,
        };
        if window.is_inverted() {
            return Ok(Vec::new());
        }

        let in_window: Vec<&LineRecord> = catalog
            .iter()
            .filter(|r| window.contains(r.wavelength))
            .filter(|r| filter::passes(self.species.as_ref(), r))
            .collect();

        let mut lines = match limit {
            Some(k) if k < in_window.len() => strongest(in_window, k),
            _ => {
                let mut lines = in_window;
                if self.order == LineOrder::StrengthDescending {
                    lines.sort_by(|a, b| by_strength_descending(a, b));
                }
                lines
            }
        };

        if self.order == LineOrder::Wavelength {
            lines.sort_by(|a, b| a.wavelength.total_cmp(&b.wavelength));
        }

        log::debug!(
            "selected {} of {} lines in [{}, {}] (limit {:?})",
            lines.len(),
            catalog.len(),
            window.min,
            window.max,
            self.limit
        );

        Ok(lines.into_iter().cloned().collect())
    }
}

fn by_strength_descending(a: &LineRecord, b: &LineRecord) -> Ordering {
    b.strength.total_cmp(&a.strength)
}

/// Keep every line whose strength reaches the `k`-th largest, strongest first.
fn strongest(mut lines: Vec<&LineRecord>, k: usize) -> Vec<&LineRecord> {
    if k == 0 {
        return Vec::new();
    }
    lines.sort_by(|a, b| by_strength_descending(a, b));
    let threshold = lines[k - 1].strength;
    lines.retain(|r| r.strength >= threshold);
    lines
}

/// Select lines of `catalog` inside `window`, capped to the `limit` strongest
/// (ties at the cutoff inclusive).
pub fn select(
    catalog: &LineCatalog,
    window: QueryWindow,
    limit: Option<i64>,
) -> Result<Vec<LineRecord>, LineError> {
    LineQuery::new(window).limit(limit).run(catalog)
}

/// Min-max scale strengths into `[0, 1]`, e.g. for marker opacity.
/// Equal strengths all map to `1.0`.
pub fn normalized_strengths(lines: &[LineRecord]) -> Vec<f64> {
    let min = lines.iter().map(|r| r.strength).fold(f64::INFINITY, f64::min);
    let max = lines.iter().map(|r| r.strength).fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range.abs() < f64::EPSILON {
        vec![1.0; lines.len()]
    } else {
        lines.iter().map(|r| (r.strength - min) / range).collect()
    }
}
