//! Spectral line lists: load them, store them, and pick the lines worth
//! drawing on top of a spectrum.
//!
//! ```no_run
//! use std::path::Path;
//!
//! use rusty_lines::data::model::QueryWindow;
//! use rusty_lines::data::select::select;
//! use rusty_lines::store::{CatalogSource, SqliteStore};
//!
//! # fn main() -> anyhow::Result<()> {
//! let store = SqliteStore::open(Path::new("linelist.db"))?;
//! let catalog = store.load("VALD3")?;
//! for line in select(&catalog, QueryWindow::new(3000.0, 4000.0), Some(20))? {
//!     println!("{line}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod data;
pub mod error;
pub mod import;
pub mod state;
pub mod store;

pub use data::model::{LineCatalog, LineRecord, QueryWindow, SourceInfo};
pub use data::select::{LineOrder, LineQuery, select};
pub use error::LineError;
