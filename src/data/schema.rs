use crate::error::LineError;

// ---------------------------------------------------------------------------
// Column identification for loosely structured tables
// ---------------------------------------------------------------------------

/// Substring identifying the wavelength column (`wave`, `Wavelength`, `wavelengths`, ...).
pub const WAVELENGTH_TOKEN: &str = "wave";
/// Substring identifying the species column.
pub const SPECIES_TOKEN: &str = "species";
/// Substring identifying the strength column (`priority`, `Priorities`, ...).
pub const STRENGTH_TOKEN: &str = "priorit";

/// Positions of the three line-list columns within a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub wavelength: usize,
    pub species: usize,
    pub strength: usize,
}

impl ColumnMap {
    /// Identify columns by case-insensitive substring match on the header
    /// names. Each token must match exactly one column.
    pub fn from_tokens<S: AsRef<str>>(headers: &[S]) -> Result<Self, LineError> {
        Ok(ColumnMap {
            wavelength: find_unique(headers, WAVELENGTH_TOKEN, |h| {
                h.to_lowercase().contains(WAVELENGTH_TOKEN)
            })?,
            species: find_unique(headers, SPECIES_TOKEN, |h| {
                h.to_lowercase().contains(SPECIES_TOKEN)
            })?,
            strength: find_unique(headers, STRENGTH_TOKEN, |h| {
                h.to_lowercase().contains(STRENGTH_TOKEN)
            })?,
        })
    }

    /// Identify columns by exact header name, in wavelength, species,
    /// strength order.
    pub fn from_names<S: AsRef<str>>(headers: &[S], names: [&str; 3]) -> Result<Self, LineError> {
        let [wavelength, species, strength] = names.map(|name| {
            find_unique(headers, name, |h| h.trim() == name)
        });
        Ok(ColumnMap {
            wavelength: wavelength?,
            species: species?,
            strength: strength?,
        })
    }

    /// Widest column index referenced; rows must have more fields than this.
    pub fn max_index(&self) -> usize {
        self.wavelength.max(self.species).max(self.strength)
    }
}

fn find_unique<S: AsRef<str>>(
    headers: &[S],
    token: &str,
    matches: impl Fn(&str) -> bool,
) -> Result<usize, LineError> {
    let hits: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| matches(h.as_ref()))
        .map(|(i, _)| i)
        .collect();
    match hits.as_slice() {
        [] => Err(LineError::MissingSchema {
            token: token.to_string(),
        }),
        [only] => Ok(*only),
        _ => Err(LineError::AmbiguousSchema {
            token: token.to_string(),
            columns: hits.iter().map(|&i| headers[i].as_ref().to_string()).collect(),
        }),
    }
}
