use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, AsArray, Float32Array, Float64Array, Int32Array, Int64Array, StringArray};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{LineCatalog, LineRecord};
use super::schema::ColumnMap;
use crate::error::LineError;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a line list from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`             – comma-separated, header row, `#` comments
/// * `.txt` / `.dat`    – whitespace-separated, header row, `#` comments
/// * `.json`            – `[{ "wavelength": ..., "species": ..., "priority": ... }, ...]`
/// * `.parquet` / `.pq` – one numeric wavelength, one string species and one
///   numeric priority column
///
/// Columns are identified by [`ColumnMap::from_tokens`] in every format.
pub fn load_file(path: &Path) -> Result<LineCatalog> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let catalog = match ext.as_str() {
        "csv" => load_csv(path),
        "txt" | "dat" => load_whitespace(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading line list {}", path.display()))?;

    log::info!("Loaded {} lines from {}", catalog.len(), path.display());
    Ok(catalog)
}

fn parse_f64(value: &str, line: usize, column: usize) -> Result<f64, LineError> {
    value.trim().parse::<f64>().map_err(|_| LineError::InvalidField {
        line,
        column,
        value: value.to_string(),
        expected: "number",
    })
}

fn record_from_fields(fields: &[&str], map: &ColumnMap, line: usize) -> Result<LineRecord> {
    if fields.len() <= map.max_index() {
        bail!(
            "line {line}: expected at least {} fields, found {}",
            map.max_index() + 1,
            fields.len()
        );
    }
    let wavelength = parse_f64(fields[map.wavelength], line, map.wavelength)?;
    let strength = parse_f64(fields[map.strength], line, map.strength)?;
    let record = LineRecord::new(wavelength, fields[map.species], strength)
        .with_context(|| format!("line {line}"))?;
    Ok(record)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<LineCatalog> {
    let mut reader = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_path(path)
        .context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();
    let map = ColumnMap::from_tokens(&headers)?;

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result.context("reading CSV row")?;
        let line = row.position().map(|p| p.line() as usize).unwrap_or(0);
        let fields: Vec<&str> = row.iter().collect();
        records.push(record_from_fields(&fields, &map, line)?);
    }

    Ok(LineCatalog::from_records(records))
}

// ---------------------------------------------------------------------------
// Whitespace-delimited loader
// ---------------------------------------------------------------------------

/// Header row followed by data rows, fields split on runs of whitespace.
/// This is the layout of the VALD-style threshold lists.
fn load_whitespace(path: &Path) -> Result<LineCatalog> {
    let text = std::fs::read_to_string(path).context("reading text file")?;
    parse_whitespace(&text)
}

pub(crate) fn parse_whitespace(text: &str) -> Result<LineCatalog> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty() && !l.starts_with('#'));

    let (_, header) = lines.next().context("file has no header row")?;
    let headers: Vec<&str> = header.split_whitespace().collect();
    let map = ColumnMap::from_tokens(&headers)?;

    let records = lines
        .map(|(line, l)| {
            let fields: Vec<&str> = l.split_whitespace().collect();
            record_from_fields(&fields, &map, line)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(LineCatalog::from_records(records))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "wavelength": 5889.95, "species": "Na I", "priority": 0.9 },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<LineCatalog> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    parse_json(&text)
}

pub(crate) fn parse_json(text: &str) -> Result<LineCatalog> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;

    let rows = root.as_array().context("Expected top-level JSON array")?;

    let mut records = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let obj = row
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        let keys: Vec<&String> = obj.keys().collect();
        let map = ColumnMap::from_tokens(&keys).with_context(|| format!("Row {i}"))?;

        let wavelength = obj[keys[map.wavelength]]
            .as_f64()
            .with_context(|| format!("Row {i}: '{}' is not a number", keys[map.wavelength]))?;
        let strength = obj[keys[map.strength]]
            .as_f64()
            .with_context(|| format!("Row {i}: '{}' is not a number", keys[map.strength]))?;
        let species = match &obj[keys[map.species]] {
            JsonValue::String(s) => s.clone(),
            JsonValue::Number(n) => n.to_string(),
            _ => bail!("Row {i}: species is not a string"),
        };

        records.push(LineRecord::new(wavelength, species, strength).with_context(|| format!("Row {i}"))?);
    }

    Ok(LineCatalog::from_records(records))
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet line list.
///
/// Numeric columns may be Float64, Float32, Int64 or Int32; the species
/// column must be Utf8 or LargeUtf8.
fn load_parquet(path: &Path) -> Result<LineCatalog> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();
        let names: Vec<&String> = schema.fields().iter().map(|f| f.name()).collect();
        let map = ColumnMap::from_tokens(&names)?;

        let wavelength_col = batch.column(map.wavelength);
        let species_col = batch.column(map.species);
        let strength_col = batch.column(map.strength);

        for row in 0..batch.num_rows() {
            let wavelength = extract_f64(wavelength_col, row)
                .with_context(|| format!("Row {row}: failed to read '{}'", names[map.wavelength]))?;
            let strength = extract_f64(strength_col, row)
                .with_context(|| format!("Row {row}: failed to read '{}'", names[map.strength]))?;
            let species = extract_string(species_col, row)
                .with_context(|| format!("Row {row}: failed to read '{}'", names[map.species]))?;

            records.push(
                LineRecord::new(wavelength, species, strength).with_context(|| format!("Row {row}"))?,
            );
        }
    }

    Ok(LineCatalog::from_records(records))
}

// -- Parquet / Arrow helpers --

fn extract_f64(col: &Arc<dyn Array>, row: usize) -> Result<f64> {
    if col.is_null(row) {
        bail!("null value in numeric column");
    }
    let any = col.as_any();
    let value = match col.data_type() {
        DataType::Float64 => any.downcast_ref::<Float64Array>().map(|a| a.value(row)),
        DataType::Float32 => any.downcast_ref::<Float32Array>().map(|a| a.value(row) as f64),
        DataType::Int64 => any.downcast_ref::<Int64Array>().map(|a| a.value(row) as f64),
        DataType::Int32 => any.downcast_ref::<Int32Array>().map(|a| a.value(row) as f64),
        other => bail!("Expected a numeric column, got {other:?}"),
    };
    value.context("column array does not match its data type")
}

fn extract_string(col: &Arc<dyn Array>, row: usize) -> Result<String> {
    if col.is_null(row) {
        bail!("null value in species column");
    }
    match col.data_type() {
        DataType::Utf8 => {
            let arr = col
                .as_any()
                .downcast_ref::<StringArray>()
                .context("expected StringArray")?;
            Ok(arr.value(row).to_string())
        }
        DataType::LargeUtf8 => Ok(col.as_string::<i64>().value(row).to_string()),
        other => bail!("Expected a string column, got {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn csv_with_token_headers() {
        let file = write_temp(
            ".csv",
            "# arcturus optical\nSpecies,Wavelength,Priority\nFe I, 5000.0, 10\nNa I,5889.95,7.5\n",
        );
        let cat = load_file(file.path()).unwrap();
        assert_eq!(
            cat.records(),
            &[
                LineRecord::new(5000.0, "Fe I", 10.0).unwrap(),
                LineRecord::new(5889.95, "Na I", 7.5).unwrap(),
            ]
        );
    }

    #[test]
    fn csv_bad_number_reports_field() {
        let file = write_temp(".csv", "wave,species,priority\n5000,Fe,strong\n");
        let err = load_file(file.path()).unwrap_err();
        let kind = err.downcast_ref::<LineError>().unwrap();
        assert!(matches!(kind, LineError::InvalidField { column: 2, .. }), "{kind:?}");
    }

    #[test]
    fn csv_missing_column_is_missing_schema() {
        let file = write_temp(".csv", "wave,species,strength\n5000,Fe,1\n");
        let err = load_file(file.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LineError>(),
            Some(LineError::MissingSchema { .. })
        ));
    }

    #[test]
    fn whitespace_table() {
        let cat = parse_whitespace(
            "# threshold list\nwavelengths  species priority\n\n3000.1 Fe1 0.5\n3001.0\tTi2   0.7\n",
        )
        .unwrap();
        assert_eq!(cat.len(), 2);
        assert_eq!(cat.records()[1].species, "Ti2");

        let short = parse_whitespace("wavelengths species priority\n3000.1 Fe1\n");
        assert!(short.is_err());
    }

    #[test]
    fn json_records() {
        let cat = parse_json(
            r#"[{"wavelength": 6562.8, "species": "H", "priority": 1},
                {"wavelength": 4861.3, "species": "H", "priority": 0.5}]"#,
        )
        .unwrap();
        assert_eq!(cat.len(), 2);
        assert_eq!(cat.wavelength_bounds(), Some((4861.3, 6562.8)));

        assert!(parse_json(r#"{"wavelength": 1}"#).is_err());
    }

    #[test]
    fn json_species_must_be_a_label() {
        for species in ["null", r#"{"el": "Fe"}"#, r#"["Fe"]"#, "true"] {
            let text = format!(r#"[{{"wavelength": 5000, "species": {species}, "priority": 1}}]"#);
            let err = parse_json(&text).unwrap_err();
            assert!(format!("{err:#}").contains("species is not a string"), "{species}: {err:#}");
        }
    }

    #[test]
    fn exported_selection_loads_back() {
        use crate::data::model::QueryWindow;
        use crate::data::select::select;

        let catalog = LineCatalog::from_records(vec![
            LineRecord::new(5000.0, "Fe I", 10.0).unwrap(),
            LineRecord::new(5005.0, "Fe I", 5.0).unwrap(),
            LineRecord::new(5010.0, "Na I", -1.25).unwrap(),
        ]);
        let lines = select(&catalog, QueryWindow::new(5000.0, 5010.0), Some(2)).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let csv_path = dir.path().join("selection.csv");
        let mut writer = csv::Writer::from_path(&csv_path).unwrap();
        for line in &lines {
            writer.serialize(line).unwrap();
        }
        writer.flush().unwrap();
        assert_eq!(load_file(&csv_path).unwrap().records(), lines.as_slice());

        let json_path = dir.path().join("selection.json");
        std::fs::write(&json_path, serde_json::to_string(&lines).unwrap()).unwrap();
        assert_eq!(load_file(&json_path).unwrap().records(), lines.as_slice());
    }

    #[test]
    fn parquet_with_mixed_column_types() {
        use arrow::array::{ArrayRef, LargeStringArray};
        use arrow::datatypes::{Field, Schema};
        use arrow::record_batch::RecordBatch;
        use parquet::arrow::ArrowWriter;

        fn write_parquet(path: &Path, species: ArrayRef, species_type: DataType) {
            let schema = Arc::new(Schema::new(vec![
                Field::new("Wavelength", DataType::Float32, false),
                Field::new("species", species_type, true),
                Field::new("priority", DataType::Int64, false),
            ]));
            let batch = RecordBatch::try_new(
                schema.clone(),
                vec![
                    Arc::new(Float32Array::from(vec![6562.5_f32, 4861.25])) as ArrayRef,
                    species,
                    Arc::new(Int64Array::from(vec![3, -1])) as ArrayRef,
                ],
            )
            .unwrap();
            let file = std::fs::File::create(path).unwrap();
            let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
            writer.write(&batch).unwrap();
            writer.close().unwrap();
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("balmer.parquet");
        write_parquet(
            &path,
            Arc::new(LargeStringArray::from(vec!["H I", "H I"])),
            DataType::LargeUtf8,
        );
        let cat = load_file(&path).unwrap();
        assert_eq!(
            cat.records(),
            &[
                LineRecord::new(6562.5, "H I", 3.0).unwrap(),
                LineRecord::new(4861.25, "H I", -1.0).unwrap(),
            ]
        );

        let with_null = dir.path().join("null_species.parquet");
        write_parquet(
            &with_null,
            Arc::new(StringArray::from(vec![Some("H I"), None])),
            DataType::Utf8,
        );
        let err = load_file(&with_null).unwrap_err();
        assert!(format!("{err:#}").contains("null value in species column"), "{err:#}");
    }

    #[test]
    fn unsupported_extension() {
        let file = write_temp(".fits", "");
        assert!(load_file(file.path()).is_err());
    }
}
