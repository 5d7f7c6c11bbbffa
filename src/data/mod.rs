//! Data layer: core types, loading, and line selection.
//!
//! Architecture:
//! ```text
//!  .csv / .txt / .json / .parquet
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse file, find columns via `schema`
//!   └──────────┘
//!        │
//!        ▼
//!   ┌─────────────┐
//!   │ LineCatalog  │  Vec<LineRecord>, read-only after load
//!   └─────────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  select   │  window + species `filter` → top-N by strength
//!   └──────────┘
//! ```

pub mod filter;
pub mod loader;
pub mod model;
pub mod schema;
pub mod select;
