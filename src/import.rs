use std::path::Path;

use anyhow::{Context, Result};

use crate::data::model::{LineRecord, SourceInfo};
use crate::data::schema::ColumnMap;
use crate::error::LineError;
use crate::store::SqliteStore;

// ---------------------------------------------------------------------------
// Column specification
// ---------------------------------------------------------------------------

/// Which fields hold wavelength, species and priority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSpec {
    /// 0-based field positions; the file has no header row.
    Indices([usize; 3]),
    /// Header names; the first parsed row is the header.
    Names([String; 3]),
}

impl ColumnSpec {
    /// Parse `"0,1,2"` or `"wavelength,species,priority"`.
    ///
    /// Exactly three entries are required. If every entry is an integer they
    /// are column positions, otherwise they are header names.
    pub fn parse(spec: &str) -> Result<Self, LineError> {
        let parts: Vec<&str> = spec.split(',').map(str::trim).collect();
        let [w, s, p] = parts.as_slice() else {
            return Err(LineError::WrongHeaderCount(parts.len()));
        };
        match (w.parse::<usize>(), s.parse::<usize>(), p.parse::<usize>()) {
            (Ok(w), Ok(s), Ok(p)) => Ok(ColumnSpec::Indices([w, s, p])),
            _ => {
                log::debug!("could not read {parts:?} as column indices; assuming header names");
                Ok(ColumnSpec::Names([w.to_string(), s.to_string(), p.to_string()]))
            }
        }
    }

    fn has_header(&self) -> bool {
        matches!(self, ColumnSpec::Names(_))
    }

    fn resolve(&self, header: Option<&[String]>) -> Result<ColumnMap, LineError> {
        match (self, header) {
            (ColumnSpec::Indices([w, s, p]), _) => Ok(ColumnMap {
                wavelength: *w,
                species: *s,
                strength: *p,
            }),
            (ColumnSpec::Names([w, s, p]), Some(header)) => {
                ColumnMap::from_names(header, [w.as_str(), s.as_str(), p.as_str()])
            }
            (ColumnSpec::Names([w, ..]), None) => Err(LineError::MissingSchema { token: w.clone() }),
        }
    }
}

/// Field separator of an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// A single separator byte, parsed with CSV quoting rules.
    Char(u8),
    /// Runs of spaces/tabs; surrounding quotes are stripped from fields.
    Whitespace,
}

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub columns: ColumnSpec,
    pub delimiter: Delimiter,
    /// Leading lines dropped before parsing (banners, units rows).
    pub skip_lines: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        ImportOptions {
            columns: ColumnSpec::Indices([0, 1, 2]),
            delimiter: Delimiter::Char(b','),
            skip_lines: 0,
        }
    }
}

/// Metadata used to register a source that does not exist yet.
#[derive(Debug, Clone, Default)]
pub struct NewSource {
    pub display_name: String,
    pub url: Option<String>,
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse delimited text into line records.
pub fn parse_lines(text: &str, opts: &ImportOptions) -> Result<Vec<LineRecord>> {
    // (1-based line number, fields)
    let rows: Vec<(usize, Vec<String>)> = match opts.delimiter {
        Delimiter::Whitespace => text
            .lines()
            .enumerate()
            .skip(opts.skip_lines)
            .filter(|(_, l)| !l.trim().is_empty())
            .map(|(i, l)| {
                let fields = l
                    .split_whitespace()
                    .map(|f| f.trim_matches(|c| c == '"' || c == '\'').to_string())
                    .collect();
                (i + 1, fields)
            })
            .collect(),
        Delimiter::Char(sep) => {
            let body: String = text
                .lines()
                .skip(opts.skip_lines)
                .map(|l| format!("{l}\n"))
                .collect();
            let mut reader = csv::ReaderBuilder::new()
                .delimiter(sep)
                .has_headers(false)
                .flexible(true)
                .trim(csv::Trim::All)
                .from_reader(body.as_bytes());
            let mut rows = Vec::new();
            for result in reader.records() {
                let record = result.context("reading delimited row")?;
                let line = record.position().map(|p| p.line() as usize).unwrap_or(0) + opts.skip_lines;
                if record.iter().all(str::is_empty) {
                    continue;
                }
                rows.push((line, record.iter().map(str::to_string).collect()));
            }
            rows
        }
    };

    let mut rows = rows.into_iter();
    let header = if opts.columns.has_header() {
        Some(rows.next().map(|(_, h)| h).unwrap_or_default())
    } else {
        None
    };
    let map = opts.columns.resolve(header.as_deref())?;

    rows.map(|(line, fields)| -> Result<LineRecord> {
        let field = |column: usize| {
            fields.get(column).map(String::as_str).ok_or_else(|| LineError::InvalidField {
                line,
                column,
                value: String::new(),
                expected: "field",
            })
        };
        let number = |column: usize| -> Result<f64, LineError> {
            let value = field(column)?;
            value.parse::<f64>().map_err(|_| LineError::InvalidField {
                line,
                column,
                value: value.to_string(),
                expected: "number",
            })
        };
        let record = LineRecord::new(number(map.wavelength)?, field(map.species)?, number(map.strength)?)
            .with_context(|| format!("line {line}"))?;
        Ok(record)
    })
    .collect()
}

// ---------------------------------------------------------------------------
// Import into the store
// ---------------------------------------------------------------------------

/// Find `short_name` in the store, registering it first when `create` is
/// given. Without `create`, an unregistered source is an error.
pub fn resolve_source(store: &SqliteStore, short_name: &str, create: Option<&NewSource>) -> Result<SourceInfo> {
    match (store.source(short_name)?, create) {
        (Some(info), _) => Ok(info),
        (None, Some(new)) => {
            log::info!("Adding source {short_name}...");
            store.add_source(
                short_name,
                &new.display_name,
                new.url.as_deref(),
                new.description.as_deref(),
            )
        }
        (None, None) => Err(LineError::UnknownSource(short_name.to_string()).into()),
    }
}

/// Import one file into `source`. Each file is one transaction; importing the
/// same file twice appends its lines twice.
pub fn import_file(store: &mut SqliteStore, source: &SourceInfo, path: &Path, opts: &ImportOptions) -> Result<usize> {
    log::info!("Processing file {}...", path.display());
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let lines = parse_lines(&text, opts).with_context(|| format!("parsing {}", path.display()))?;
    let added = store.insert_lines(source.source_id, &lines)?;
    log::info!("Added {added} rows to {}", source.short_name);
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CatalogSource;

    #[test]
    fn column_spec_parsing() {
        assert_eq!(ColumnSpec::parse("0,1,2").unwrap(), ColumnSpec::Indices([0, 1, 2]));
        assert_eq!(
            ColumnSpec::parse("wavelengths, species ,strengths").unwrap(),
            ColumnSpec::Names(["wavelengths".into(), "species".into(), "strengths".into()])
        );
        assert_eq!(ColumnSpec::parse("0,1").unwrap_err(), LineError::WrongHeaderCount(2));
        assert_eq!(ColumnSpec::parse("a,b,c,d").unwrap_err(), LineError::WrongHeaderCount(4));
    }

    #[test]
    fn indexed_columns_without_header() {
        let opts = ImportOptions {
            columns: ColumnSpec::Indices([1, 0, 2]),
            ..Default::default()
        };
        let lines = parse_lines("Fe,5000.0,10\nNa, 5889.95 ,7\n\n", &opts).unwrap();
        assert_eq!(
            lines,
            vec![
                LineRecord::new(5000.0, "Fe", 10.0).unwrap(),
                LineRecord::new(5889.95, "Na", 7.0).unwrap(),
            ]
        );
    }

    #[test]
    fn named_columns_with_separator() {
        let opts = ImportOptions {
            columns: ColumnSpec::parse("wavelengths,species,strengths").unwrap(),
            delimiter: Delimiter::Char(b';'),
            skip_lines: 1,
        };
        let text = "VALD3 extract\nspecies;strengths;wavelengths\nTi 1;0.7;3001.0\n";
        let lines = parse_lines(text, &opts).unwrap();
        assert_eq!(lines, vec![LineRecord::new(3001.0, "Ti 1", 0.7).unwrap()]);

        let missing = ImportOptions {
            columns: ColumnSpec::parse("wave,species,strengths").unwrap(),
            ..opts
        };
        let err = parse_lines(text, &missing).unwrap_err();
        assert!(matches!(err.downcast_ref::<LineError>(), Some(LineError::MissingSchema { .. })));
    }

    #[test]
    fn whitespace_with_quotes_and_skipped_lines() {
        let opts = ImportOptions {
            columns: ColumnSpec::Indices([0, 1, 2]),
            delimiter: Delimiter::Whitespace,
            skip_lines: 2,
        };
        let text = "# header\n# units\n 5577.34  'OI'  9.1\n\n6300.30 \"OI\" 5\n";
        let lines = parse_lines(text, &opts).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.species == "OI"));
    }

    #[test]
    fn bad_number_reports_line() {
        let err = parse_lines("5000,Fe,1\nabc,Fe,2\n", &ImportOptions::default()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<LineError>(),
            Some(&LineError::InvalidField {
                line: 2,
                column: 0,
                value: "abc".into(),
                expected: "number",
            })
        );
    }

    #[test]
    fn import_requires_registered_source() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let err = resolve_source(&store, "hitran", None).unwrap_err();
        assert_eq!(
            err.downcast_ref::<LineError>(),
            Some(&LineError::UnknownSource("hitran".into()))
        );

        let new = NewSource {
            display_name: "HITRAN".into(),
            ..Default::default()
        };
        let src = resolve_source(&store, "hitran", Some(&new)).unwrap();
        assert_eq!(resolve_source(&store, "hitran", None).unwrap(), src);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hitran.csv");
        std::fs::write(&path, "1.2,H2O,0.1\n1.3,CO2,0.2\n").unwrap();
        assert_eq!(import_file(&mut store, &src, &path, &ImportOptions::default()).unwrap(), 2);
        // re-import appends
        import_file(&mut store, &src, &path, &ImportOptions::default()).unwrap();
        assert_eq!(store.load("hitran").unwrap().len(), 4);
    }
}
