use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LineError;

// ---------------------------------------------------------------------------
// LineRecord – one spectral transition
// ---------------------------------------------------------------------------

/// A single transition line: where it sits, what produces it, how strong it is.
///
/// Serialized with the column names the loaders look for (`wavelength`,
/// `species`, `priority`); deserializing goes through [`LineRecord::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLineRecord")]
pub struct LineRecord {
    /// Wavelength in angstrom.
    pub wavelength: f64,
    /// Element / ion / molecule label, e.g. `"Fe I"`.
    pub species: String,
    /// Relative strength (priority). Only meaningful within one catalog.
    #[serde(rename = "priority")]
    pub strength: f64,
}

#[derive(Deserialize)]
struct RawLineRecord {
    wavelength: f64,
    species: String,
    priority: f64,
}

impl TryFrom<RawLineRecord> for LineRecord {
    type Error = LineError;

    fn try_from(raw: RawLineRecord) -> Result<Self, Self::Error> {
        LineRecord::new(raw.wavelength, raw.species, raw.priority)
    }
}

impl LineRecord {
    /// Build a validated record.
    ///
    /// Wavelength must be finite and non-negative, species non-empty, and
    /// strength a finite real number of any sign.
    pub fn new(wavelength: f64, species: impl Into<String>, strength: f64) -> Result<Self, LineError> {
        let species = species.into().trim().to_string();
        if !wavelength.is_finite() || wavelength < 0.0 {
            return Err(LineError::InvalidRecord(format!(
                "wavelength {wavelength} must be finite and non-negative"
            )));
        }
        if species.is_empty() {
            return Err(LineError::InvalidRecord(format!(
                "empty species label at wavelength {wavelength}"
            )));
        }
        if !strength.is_finite() {
            return Err(LineError::InvalidRecord(format!(
                "strength {strength} of {species} {wavelength} must be finite"
            )));
        }
        Ok(LineRecord {
            wavelength,
            species,
            strength,
        })
    }
}

impl fmt::Display for LineRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4} {} ({})", self.wavelength, self.species, self.strength)
    }
}

// ---------------------------------------------------------------------------
// QueryWindow – wavelength range of interest
// ---------------------------------------------------------------------------

/// Inclusive wavelength range. An inverted window (`min > max`) is legal and
/// simply selects nothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueryWindow {
    pub min: f64,
    pub max: f64,
}

impl QueryWindow {
    pub fn new(min: f64, max: f64) -> Self {
        QueryWindow { min, max }
    }

    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    pub fn is_inverted(&self) -> bool {
        self.min > self.max
    }

    /// Inclusive on both ends.
    pub fn contains(&self, wavelength: f64) -> bool {
        self.min <= wavelength && wavelength <= self.max
    }
}

// ---------------------------------------------------------------------------
// LineCatalog – the loaded line list
// ---------------------------------------------------------------------------

/// An ordered, read-only collection of lines.
///
/// Built once by a loader or store and never mutated afterwards, so it can be
/// shared between threads behind an `Arc` without locking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineCatalog {
    records: Vec<LineRecord>,
}

impl LineCatalog {
    pub fn from_records(records: Vec<LineRecord>) -> Self {
        LineCatalog { records }
    }

    pub fn records(&self) -> &[LineRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LineRecord> {
        self.records.iter()
    }

    pub fn into_records(self) -> Vec<LineRecord> {
        self.records
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Shortest and longest wavelength in the catalog.
    pub fn wavelength_bounds(&self) -> Option<(f64, f64)> {
        self.records.iter().fold(None, |acc, r| match acc {
            None => Some((r.wavelength, r.wavelength)),
            Some((lo, hi)) => Some((lo.min(r.wavelength), hi.max(r.wavelength))),
        })
    }

    /// Sorted set of species labels present.
    pub fn species(&self) -> BTreeSet<String> {
        self.records.iter().map(|r| r.species.clone()).collect()
    }
}

impl FromIterator<LineRecord> for LineCatalog {
    fn from_iter<I: IntoIterator<Item = LineRecord>>(iter: I) -> Self {
        LineCatalog::from_records(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a LineCatalog {
    type Item = &'a LineRecord;
    type IntoIter = std::slice::Iter<'a, LineRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

// ---------------------------------------------------------------------------
// SourceInfo – provenance of a catalog
// ---------------------------------------------------------------------------

/// A named line-list source (e.g. a published line database).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub source_id: i64,
    pub short_name: String,
    pub display_name: String,
    pub url: Option<String>,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_validation() {
        assert!(LineRecord::new(5000.0, "Fe", -2.3).is_ok());
        assert!(LineRecord::new(0.0, "H", 1.0).is_ok());
        assert!(matches!(
            LineRecord::new(-1.0, "Fe", 1.0),
            Err(LineError::InvalidRecord(_))
        ));
        assert!(LineRecord::new(f64::INFINITY, "Fe", 1.0).is_err());
        assert!(LineRecord::new(5000.0, "   ", 1.0).is_err());
        assert!(LineRecord::new(5000.0, "Fe", f64::NAN).is_err());
        assert!(LineRecord::new(5000.0, "Fe", f64::INFINITY).is_err());
        assert!(LineRecord::new(5000.0, "Fe", f64::NEG_INFINITY).is_err());
    }

    #[test]
    fn deserializing_validates() {
        let ok: LineRecord =
            serde_json::from_str(r#"{"wavelength": 5000.0, "species": "Fe", "priority": -1.5}"#).unwrap();
        assert_eq!(ok, LineRecord::new(5000.0, "Fe", -1.5).unwrap());

        for bad in [
            r#"{"wavelength": -5.0, "species": "Fe", "priority": 1.0}"#,
            r#"{"wavelength": 5000.0, "species": "", "priority": 1.0}"#,
            r#"{"wavelength": 5000.0, "species": "Fe", "strength": 1.0}"#,
        ] {
            assert!(serde_json::from_str::<LineRecord>(bad).is_err(), "{bad}");
        }

        let catalog = serde_json::from_str::<LineCatalog>(
            r#"{"records": [{"wavelength": 1.0, "species": " ", "priority": 1.0}]}"#,
        );
        assert!(catalog.is_err());
    }

    #[test]
    fn serialized_keys_match_loader_columns() {
        let json = serde_json::to_string(&LineRecord::new(5000.0, "Fe", 2.0).unwrap()).unwrap();
        assert_eq!(json, r#"{"wavelength":5000.0,"species":"Fe","priority":2.0}"#);
    }

    #[test]
    fn species_label_is_trimmed() {
        let r = LineRecord::new(5000.0, " Na I ", 1.0).unwrap();
        assert_eq!(r.species, "Na I");
    }

    #[test]
    fn window_is_inclusive() {
        let w = QueryWindow::new(5000.0, 5010.0);
        assert!(w.contains(5000.0));
        assert!(w.contains(5010.0));
        assert!(!w.contains(5010.0001));
        assert!(QueryWindow::new(2.0, 1.0).is_inverted());
        assert!(!QueryWindow::new(f64::NAN, 1.0).is_finite());
    }

    #[test]
    fn catalog_bounds_and_species() {
        let cat: LineCatalog = vec![
            LineRecord::new(5005.0, "Fe", 5.0).unwrap(),
            LineRecord::new(4990.0, "Na", 1.0).unwrap(),
            LineRecord::new(5100.0, "Fe", 2.0).unwrap(),
        ]
        .into_iter()
        .collect();
        assert_eq!(cat.wavelength_bounds(), Some((4990.0, 5100.0)));
        assert_eq!(cat.species().into_iter().collect::<Vec<_>>(), vec!["Fe", "Na"]);
        assert_eq!(LineCatalog::default().wavelength_bounds(), None);
    }
}
