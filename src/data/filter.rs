use std::collections::BTreeSet;

use super::model::{LineCatalog, LineRecord};

// ---------------------------------------------------------------------------
// Species filter: which species labels are selected
// ---------------------------------------------------------------------------

/// Set of selected species labels.
///
/// A record passes when its species is in the set. An empty set means
/// nothing is selected, so nothing passes; "no filter" is expressed by not
/// attaching a filter to the query at all.
pub type SpeciesFilter = BTreeSet<String>;

/// Initialise a [`SpeciesFilter`] with every species of the catalog selected.
pub fn init_species_filter(catalog: &LineCatalog) -> SpeciesFilter {
    catalog.species()
}

/// Whether a record passes an optional species filter.
pub fn passes(filter: Option<&SpeciesFilter>, record: &LineRecord) -> bool {
    match filter {
        None => true,
        Some(selected) => selected.contains(&record.species),
    }
}

/// Return the first `n` species of `order`.
pub fn first_n_species(order: &[String], n: usize) -> Vec<String> {
    order.iter().take(n).cloned().collect()
}

/// Page forward through `order`: the `n` species starting at the position of
/// the last currently selected one. Starts from the top when nothing is
/// selected or the last selection is not part of `order`.
pub fn next_n_species(order: &[String], current: &[String], n: usize) -> Vec<String> {
    let start = current
        .last()
        .and_then(|last| order.iter().position(|s| s == last))
        .unwrap_or(0);
    order.iter().skip(start).take(n).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_filter_passes_nothing() {
        let r = LineRecord::new(5000.0, "Fe", 1.0).unwrap();
        assert!(passes(None, &r));
        assert!(!passes(Some(&SpeciesFilter::new()), &r));
        let sel: SpeciesFilter = ["Fe".to_string()].into_iter().collect();
        assert!(passes(Some(&sel), &r));
    }

    #[test]
    fn species_paging() {
        let order = labels(&["H", "He", "O", "C", "Ne", "Fe"]);
        let first = first_n_species(&order, 2);
        assert_eq!(first, labels(&["H", "He"]));
        // paging restarts at the last selected element
        assert_eq!(next_n_species(&order, &first, 3), labels(&["He", "O", "C"]));
        assert_eq!(next_n_species(&order, &[], 2), labels(&["H", "He"]));
        assert_eq!(next_n_species(&order, &labels(&["Fe"]), 4), labels(&["Fe"]));
    }
}
