use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};

use super::CatalogSource;
use crate::data::model::{LineCatalog, LineRecord, QueryWindow, SourceInfo};
use crate::error::LineError;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sources (
    source_id    INTEGER PRIMARY KEY,
    display_name TEXT,
    short_name   TEXT NOT NULL UNIQUE,
    url          TEXT,
    description  TEXT
);
CREATE TABLE IF NOT EXISTS data (
    source_id  INTEGER NOT NULL,
    wavelength REAL NOT NULL,
    species    TEXT NOT NULL,
    priority   REAL NOT NULL,
    FOREIGN KEY (source_id) REFERENCES sources(source_id)
);
CREATE INDEX IF NOT EXISTS data_source_wavelength ON data (source_id, wavelength);
";

/// Line lists in an embedded SQLite database: one `sources` table with
/// provenance and one `data` table holding every line keyed by source.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("Creating line database {}", path.display());
        }
        let conn = Connection::open(path)
            .with_context(|| format!("opening line database {}", path.display()))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory().context("opening in-memory database")?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA).context("creating line database tables")?;
        Ok(SqliteStore { conn })
    }

    /// Register a new source. Short names are unique.
    pub fn add_source(
        &self,
        short_name: &str,
        display_name: &str,
        url: Option<&str>,
        description: Option<&str>,
    ) -> Result<SourceInfo> {
        if self.source(short_name)?.is_some() {
            return Err(LineError::DuplicateSource(short_name.to_string()).into());
        }
        self.conn
            .execute(
                "INSERT INTO sources (display_name, short_name, url, description) VALUES (?1, ?2, ?3, ?4)",
                params![display_name, short_name, url, description],
            )
            .with_context(|| format!("inserting source '{short_name}'"))?;
        log::info!("Added source {short_name}");
        Ok(SourceInfo {
            source_id: self.conn.last_insert_rowid(),
            short_name: short_name.to_string(),
            display_name: display_name.to_string(),
            url: url.map(str::to_string),
            description: description.map(str::to_string),
        })
    }

    /// Look up a source by short name.
    pub fn source(&self, short_name: &str) -> Result<Option<SourceInfo>> {
        self.conn
            .query_row(
                "SELECT source_id, short_name, display_name, url, description
                 FROM sources WHERE short_name = ?1",
                params![short_name],
                row_to_source,
            )
            .optional()
            .with_context(|| format!("looking up source '{short_name}'"))
    }

    /// Like [`SqliteStore::source`], but an unregistered name is an error.
    pub fn require_source(&self, short_name: &str) -> Result<SourceInfo> {
        self.source(short_name)?
            .ok_or_else(|| LineError::UnknownSource(short_name.to_string()).into())
    }

    /// Append lines to a source in one transaction. Returns the row count.
    pub fn insert_lines(&mut self, source_id: i64, lines: &[LineRecord]) -> Result<usize> {
        let tx = self.conn.transaction().context("starting transaction")?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO data (source_id, wavelength, species, priority) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for line in lines {
                stmt.execute(params![source_id, line.wavelength, line.species, line.strength])
                    .with_context(|| format!("inserting line {line}"))?;
            }
        }
        tx.commit().context("committing lines")?;
        Ok(lines.len())
    }

    fn query_lines(&self, sql: &str, params: impl rusqlite::Params, source: &str) -> Result<LineCatalog> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt.query_map(params, |row| {
            Ok((row.get::<_, f64>(0)?, row.get::<_, String>(1)?, row.get::<_, f64>(2)?))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (wavelength, species, strength) = row.with_context(|| format!("reading lines of '{source}'"))?;
            records.push(
                LineRecord::new(wavelength, species, strength)
                    .with_context(|| format!("invalid line stored for '{source}'"))?,
            );
        }
        Ok(LineCatalog::from_records(records))
    }
}

fn row_to_source(row: &rusqlite::Row<'_>) -> rusqlite::Result<SourceInfo> {
    Ok(SourceInfo {
        source_id: row.get(0)?,
        short_name: row.get(1)?,
        display_name: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        url: row.get(3)?,
        description: row.get(4)?,
    })
}

impl CatalogSource for SqliteStore {
    fn sources(&self) -> Result<Vec<SourceInfo>> {
        let mut stmt = self.conn.prepare(
            "SELECT source_id, short_name, display_name, url, description FROM sources ORDER BY source_id",
        )?;
        let sources = stmt
            .query_map([], row_to_source)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("listing sources")?;
        Ok(sources)
    }

    fn load(&self, source: &str) -> Result<LineCatalog> {
        let info = self.require_source(source)?;
        let catalog = self.query_lines(
            "SELECT wavelength, species, priority FROM data WHERE source_id = ?1 ORDER BY rowid",
            params![info.source_id],
            source,
        )?;
        log::info!("Loaded {} lines of {source}", catalog.len());
        Ok(catalog)
    }

    /// Window filter runs in SQL against the `(source_id, wavelength)` index.
    fn load_window(&self, source: &str, window: QueryWindow) -> Result<LineCatalog> {
        if !window.is_finite() {
            return Err(LineError::InvalidWindow {
                min: window.min,
                max: window.max,
            }
            .into());
        }
        let info = self.require_source(source)?;
        self.query_lines(
            "SELECT wavelength, species, priority FROM data
             WHERE source_id = ?1 AND wavelength >= ?2 AND wavelength <= ?3
             ORDER BY rowid",
            params![info.source_id, window.min, window.max],
            source,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::select::select;

    fn line(w: f64, s: &str, k: f64) -> LineRecord {
        LineRecord::new(w, s, k).unwrap()
    }

    #[test]
    fn sources_and_lines_round_trip() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let nist = store
            .add_source("NIST", "NIST ASD", Some("https://physics.nist.gov/asd"), None)
            .unwrap();
        let vald = store.add_source("VALD3", "VALD3", None, Some("threshold 0.5")).unwrap();
        assert_ne!(nist.source_id, vald.source_id);

        let lines = vec![line(5000.0, "Fe", 10.0), line(5005.0, "Fe", 5.0), line(5010.0, "Na", 10.0)];
        assert_eq!(store.insert_lines(nist.source_id, &lines).unwrap(), 3);
        store.insert_lines(vald.source_id, &[line(4000.0, "Ti", 1.0)]).unwrap();

        assert_eq!(store.sources().unwrap(), vec![nist.clone(), vald]);
        assert_eq!(store.source("NIST").unwrap(), Some(nist));
        assert_eq!(store.load("NIST").unwrap().records(), lines.as_slice());

        let window = QueryWindow::new(5005.0, 5010.0);
        let in_sql = store.load_window("NIST", window).unwrap();
        let in_memory = select(&store.load("NIST").unwrap(), window, None).unwrap();
        assert_eq!(in_sql.records(), in_memory.as_slice());
        assert!(store.load_window("NIST", QueryWindow::new(9.0, 1.0)).unwrap().is_empty());
    }

    #[test]
    fn duplicate_and_unknown_sources() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.add_source("NIST", "NIST", None, None).unwrap();
        let dup = store.add_source("NIST", "again", None, None).unwrap_err();
        assert_eq!(
            dup.downcast_ref::<LineError>(),
            Some(&LineError::DuplicateSource("NIST".into()))
        );
        let unknown = store.load("hitran").unwrap_err();
        assert_eq!(
            unknown.downcast_ref::<LineError>(),
            Some(&LineError::UnknownSource("hitran".into()))
        );
    }

    #[test]
    fn reopening_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("linelist.db");
        {
            let mut store = SqliteStore::open(&path).unwrap();
            let src = store.add_source("arcturus", "Arcturus optical", None, None).unwrap();
            store.insert_lines(src.source_id, &[line(6562.8, "H", 1.0)]).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.load("arcturus").unwrap().len(), 1);
    }
}
