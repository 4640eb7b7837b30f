//! In-memory tabular dataset over delimited text and JSON tables.
//!
//! Tables are loaded eagerly with an explicit per-column type declaration
//! and an explicit missing-value sentinel. Supports column statistics,
//! grouping, per-row derived values, single-column rewrite, and round-trip
//! save back to CSV with the original header order.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use tracing::debug;

use crate::errors::{Error, Result};

/// Declared type of a column. Cells that fail to parse as the declared
/// type make the load fail; empty fields become [`CellValue::Missing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Float,
    Date,
}

/// A single typed cell. `Missing` is distinct from an empty string or zero.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Date(NaiveDate),
    Missing,
}

impl CellValue {
    /// Renders the cell for CSV output. `Missing` renders as an empty field.
    pub fn render(&self, date_format: &str) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Integer(n) => n.to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::Date(d) => d.format(date_format).to_string(),
            CellValue::Missing => String::new(),
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            CellValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Missing)
    }
}

/// Orders two cells of the same variant. `None` for mixed or
/// non-comparable variants; `Missing` compares with nothing.
fn compare_cells(a: &CellValue, b: &CellValue) -> Option<Ordering> {
    match (a, b) {
        (CellValue::Text(x), CellValue::Text(y)) => Some(x.cmp(y)),
        (CellValue::Integer(x), CellValue::Integer(y)) => Some(x.cmp(y)),
        (CellValue::Float(x), CellValue::Float(y)) => x.partial_cmp(y),
        (CellValue::Date(x), CellValue::Date(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Source format of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    /// Delimited text with a configurable separator.
    Csv { delimiter: u8 },
    /// A JSON array of objects, flattened to rows by dotted key path.
    Json,
}

/// Load-time declarations for one table.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub format: TableFormat,
    /// Explicit column names for header-less delimited files.
    pub column_names: Option<Vec<String>>,
    /// Restricts the loaded columns to this set, in this order. Every
    /// listed column must exist; all missing ones are enumerated in the
    /// error.
    pub columns: Option<Vec<String>>,
    /// Per-column type declarations. Undeclared columns load as text.
    pub types: HashMap<String, ColumnType>,
    /// Format string for `ColumnType::Date` cells, both ways.
    pub date_format: String,
}

impl LoadOptions {
    pub fn csv(delimiter: u8) -> Self {
        LoadOptions {
            format: TableFormat::Csv { delimiter },
            column_names: None,
            columns: None,
            types: HashMap::new(),
            date_format: "%Y%m%d".to_string(),
        }
    }

    pub fn json() -> Self {
        LoadOptions {
            format: TableFormat::Json,
            ..LoadOptions::csv(b',')
        }
    }

    pub fn select(mut self, columns: &[&str]) -> Self {
        self.columns = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn with_type(mut self, column: &str, ty: ColumnType) -> Self {
        self.types.insert(column.to_string(), ty);
        self
    }

    pub fn with_column_names(mut self, names: &[&str]) -> Self {
        self.column_names = Some(names.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn with_date_format(mut self, format: &str) -> Self {
        self.date_format = format.to_string();
        self
    }
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions::csv(b',')
    }
}

/// One row of a dataset, restricted to the columns a callback may see.
pub struct RowView<'a> {
    names: &'a [String],
    cells: Vec<&'a CellValue>,
}

impl<'a> RowView<'a> {
    pub fn get(&self, column: &str) -> Option<&'a CellValue> {
        let idx = self.names.iter().position(|n| n == column)?;
        self.cells.get(idx).copied()
    }
}

/// An in-memory table with a fixed column set.
#[derive(Debug)]
pub struct Dataset {
    name: String,
    headers: Vec<String>,
    rows: Vec<Vec<CellValue>>,
    delimiter: u8,
    date_format: String,
}

impl Dataset {
    /// Loads a table from any reader. `name` labels the table in errors.
    pub fn load<R: Read>(reader: R, name: &str, options: &LoadOptions) -> Result<Dataset> {
        let (headers, raw_rows) = match options.format {
            TableFormat::Csv { delimiter } => read_delimited(reader, name, delimiter, options)?,
            TableFormat::Json => read_json(reader, name)?,
        };

        let delimiter = match options.format {
            TableFormat::Csv { delimiter } => delimiter,
            TableFormat::Json => b',',
        };

        // Resolve the column selection against the header, enumerating
        // every missing column in one error.
        let (headers, keep): (Vec<String>, Vec<usize>) = match &options.columns {
            Some(wanted) => {
                let mut keep = Vec::with_capacity(wanted.len());
                let mut missing = Vec::new();
                for column in wanted {
                    match headers.iter().position(|h| h == column) {
                        Some(idx) => keep.push(idx),
                        None => missing.push(column.as_str()),
                    }
                }
                if !missing.is_empty() {
                    return Err(Error::invalid_file(
                        name,
                        format!("missing columns: {}", missing.join(", ")),
                    ));
                }
                (wanted.clone(), keep)
            }
            None => {
                let keep = (0..headers.len()).collect();
                (headers, keep)
            }
        };

        let mut rows = Vec::with_capacity(raw_rows.len());
        for (row_idx, raw) in raw_rows.iter().enumerate() {
            let mut row = Vec::with_capacity(keep.len());
            for (&src_idx, header) in keep.iter().zip(headers.iter()) {
                let raw_cell = raw.get(src_idx).cloned().unwrap_or(RawCell::Empty);
                let ty = options.types.get(header).copied().unwrap_or(ColumnType::Text);
                let cell = parse_cell(raw_cell, ty, &options.date_format).map_err(|reason| {
                    Error::invalid_file(
                        name,
                        format!("row {}, column '{}': {}", row_idx + 1, header, reason),
                    )
                })?;
                row.push(cell);
            }
            rows.push(row);
        }

        debug!(table = name, rows = rows.len(), columns = headers.len(), "Table loaded");

        Ok(Dataset {
            name: name.to_string(),
            headers,
            rows,
            delimiter,
            date_format: options.date_format.clone(),
        })
    }

    /// Loads a table from a file on disk.
    pub fn load_path(path: &Path, options: &LoadOptions) -> Result<Dataset> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("<unnamed>")
            .to_string();
        let file = File::open(path)
            .map_err(|e| Error::invalid_file(&name, format!("cannot open: {}", e)))?;
        Dataset::load(file, &name, options)
    }

    /// Loads a table directly from a member of a zip archive. The entry is
    /// streamed through the reader; nothing is extracted to disk.
    pub fn load_zip_member(archive: &Path, member: &str, options: &LoadOptions) -> Result<Dataset> {
        let display = archive.display().to_string();
        let file = File::open(archive)
            .map_err(|e| Error::invalid_file(&display, format!("cannot open: {}", e)))?;
        let mut zip = zip::ZipArchive::new(file)
            .map_err(|e| Error::invalid_file(&display, format!("not a valid zip archive: {}", e)))?;
        let entry = zip
            .by_name(member)
            .map_err(|_| Error::invalid_file(member, format!("not a member of '{}'", display)))?;
        Dataset::load(entry, member, options)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns one cell, if both the row and the column exist.
    pub fn cell(&self, row: usize, column: &str) -> Option<&CellValue> {
        let idx = self.column_index(column).ok()?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// Iterates over full-width row views.
    pub fn rows(&self) -> impl Iterator<Item = RowView<'_>> {
        self.rows.iter().map(|row| RowView {
            names: &self.headers,
            cells: row.iter().collect(),
        })
    }

    /// Smallest comparable value in `column`, skipping missing cells.
    pub fn min(&self, column: &str) -> Result<CellValue> {
        self.extremum(column, Ordering::Less)
    }

    /// Largest comparable value in `column`, skipping missing cells.
    pub fn max(&self, column: &str) -> Result<CellValue> {
        self.extremum(column, Ordering::Greater)
    }

    fn extremum(&self, column: &str, keep: Ordering) -> Result<CellValue> {
        let idx = self.column_index(column)?;
        let mut best: Option<&CellValue> = None;
        for row in &self.rows {
            let cell = &row[idx];
            if cell.is_missing() {
                continue;
            }
            match best {
                None => best = Some(cell),
                Some(current) => {
                    let ord = compare_cells(cell, current).ok_or_else(|| {
                        Error::invalid_file(
                            &self.name,
                            format!("column '{}' holds values of mixed types", column),
                        )
                    })?;
                    if ord == keep {
                        best = Some(cell);
                    }
                }
            }
        }
        best.cloned().ok_or_else(|| {
            Error::invalid_file(
                &self.name,
                format!("column '{}' has no comparable values", column),
            )
        })
    }

    /// Counts non-missing `count_column` cells per distinct combination of
    /// `group_columns` values.
    pub fn group_count_by(
        &self,
        group_columns: &[&str],
        count_column: &str,
    ) -> Result<HashMap<Vec<String>, usize>> {
        let group_idx: Vec<usize> = group_columns
            .iter()
            .map(|c| self.column_index(c))
            .collect::<Result<_>>()?;
        let count_idx = self.column_index(count_column)?;

        let mut counts: HashMap<Vec<String>, usize> = HashMap::new();
        for row in &self.rows {
            let key: Vec<String> = group_idx
                .iter()
                .map(|&i| row[i].render(&self.date_format))
                .collect();
            let entry = counts.entry(key).or_insert(0);
            if !row[count_idx].is_missing() {
                *entry += 1;
            }
        }
        Ok(counts)
    }

    /// Applies `f` to each row restricted to `input_columns`, producing one
    /// `(key, derived)` pair per row keyed by `key_column`'s rendered value.
    pub fn derive_by_key<F>(
        &self,
        key_column: &str,
        input_columns: &[&str],
        mut f: F,
    ) -> Result<Vec<(String, CellValue)>>
    where
        F: FnMut(&RowView<'_>) -> CellValue,
    {
        let key_idx = self.column_index(key_column)?;
        let input_idx: Vec<usize> = input_columns
            .iter()
            .map(|c| self.column_index(c))
            .collect::<Result<_>>()?;
        let input_names: Vec<String> = input_columns.iter().map(|c| c.to_string()).collect();

        let mut derived = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let view = RowView {
                names: &input_names,
                cells: input_idx.iter().map(|&i| &row[i]).collect(),
            };
            let key = row[key_idx].render(&self.date_format);
            derived.push((key, f(&view)));
        }
        Ok(derived)
    }

    /// Rewrites one column's value row by row. Row order and all other
    /// columns are untouched.
    pub fn apply_in_place<F>(&mut self, column: &str, mut f: F) -> Result<()>
    where
        F: FnMut(&RowView<'_>) -> CellValue,
    {
        let idx = self.column_index(column)?;
        for row in &mut self.rows {
            let view = RowView {
                names: &self.headers,
                cells: row.iter().collect(),
            };
            let value = f(&view);
            row[idx] = value;
        }
        Ok(())
    }

    /// Writes the current in-memory state back to CSV with the original
    /// header order and delimiter.
    pub fn save_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_path(path)?;
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            let record: Vec<String> = row.iter().map(|c| c.render(&self.date_format)).collect();
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn column_index(&self, column: &str) -> Result<usize> {
        self.headers.iter().position(|h| h == column).ok_or_else(|| {
            Error::invalid_file(&self.name, format!("missing columns: {}", column))
        })
    }
}

/// A field as read from the source, before typing.
#[derive(Debug, Clone)]
enum RawCell {
    Empty,
    Text(String),
    Integer(i64),
    Float(f64),
}

fn parse_cell(
    raw: RawCell,
    ty: ColumnType,
    date_format: &str,
) -> std::result::Result<CellValue, String> {
    let text = match raw {
        RawCell::Empty => return Ok(CellValue::Missing),
        RawCell::Integer(n) => match ty {
            ColumnType::Integer | ColumnType::Text => return Ok(CellValue::Integer(n)),
            ColumnType::Float => return Ok(CellValue::Float(n as f64)),
            ColumnType::Date => n.to_string(),
        },
        RawCell::Float(f) => match ty {
            ColumnType::Float | ColumnType::Text => return Ok(CellValue::Float(f)),
            _ => return Err(format!("cannot read number {} as declared type", f)),
        },
        RawCell::Text(s) => s,
    };

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(CellValue::Missing);
    }
    match ty {
        ColumnType::Text => Ok(CellValue::Text(trimmed.to_string())),
        ColumnType::Integer => trimmed
            .parse::<i64>()
            .map(CellValue::Integer)
            .map_err(|_| format!("'{}' is not an integer", trimmed)),
        ColumnType::Float => trimmed
            .parse::<f64>()
            .map(CellValue::Float)
            .map_err(|_| format!("'{}' is not a number", trimmed)),
        ColumnType::Date => NaiveDate::parse_from_str(trimmed, date_format)
            .map(CellValue::Date)
            .map_err(|_| format!("'{}' is not a date in format {}", trimmed, date_format)),
    }
}

fn read_delimited<R: Read>(
    reader: R,
    name: &str,
    delimiter: u8,
    options: &LoadOptions,
) -> Result<(Vec<String>, Vec<Vec<RawCell>>)> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut records = rdr.records();

    let headers: Vec<String> = match &options.column_names {
        Some(names) => names.clone(),
        None => {
            let header_record = records
                .next()
                .ok_or_else(|| Error::invalid_file(name, "empty table"))?
                .map_err(|e| Error::invalid_file(name, format!("cannot parse: {}", e)))?;
            header_record.iter().map(|h| h.trim().to_string()).collect()
        }
    };

    let mut rows = Vec::new();
    for record in records {
        let record =
            record.map_err(|e| Error::invalid_file(name, format!("cannot parse: {}", e)))?;
        let row: Vec<RawCell> = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    RawCell::Empty
                } else {
                    RawCell::Text(field.to_string())
                }
            })
            .collect();
        rows.push(row);
    }

    Ok((headers, rows))
}

fn read_json<R: Read>(reader: R, name: &str) -> Result<(Vec<String>, Vec<Vec<RawCell>>)> {
    let value: serde_json::Value = serde_json::from_reader(reader)
        .map_err(|e| Error::invalid_file(name, format!("cannot parse as JSON: {}", e)))?;
    let items = value
        .as_array()
        .ok_or_else(|| Error::invalid_file(name, "JSON table must be an array of objects"))?;

    // Headers in first-appearance order across all rows.
    let mut headers: Vec<String> = Vec::new();
    let mut flattened: Vec<HashMap<String, RawCell>> = Vec::with_capacity(items.len());
    for item in items {
        let object = item
            .as_object()
            .ok_or_else(|| Error::invalid_file(name, "JSON table must be an array of objects"))?;
        let mut flat = HashMap::new();
        flatten_object(object, "", &mut flat, &mut headers);
        flattened.push(flat);
    }

    let rows = flattened
        .into_iter()
        .map(|mut flat| {
            headers
                .iter()
                .map(|h| flat.remove(h).unwrap_or(RawCell::Empty))
                .collect()
        })
        .collect();

    Ok((headers, rows))
}

fn flatten_object(
    object: &serde_json::Map<String, serde_json::Value>,
    prefix: &str,
    out: &mut HashMap<String, RawCell>,
    headers: &mut Vec<String>,
) {
    for (key, value) in object {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            serde_json::Value::Object(nested) => flatten_object(nested, &path, out, headers),
            other => {
                let cell = match other {
                    serde_json::Value::Null => RawCell::Empty,
                    serde_json::Value::Bool(b) => RawCell::Text(b.to_string()),
                    serde_json::Value::Number(n) => {
                        if let Some(i) = n.as_i64() {
                            RawCell::Integer(i)
                        } else {
                            RawCell::Float(n.as_f64().unwrap_or(f64::NAN))
                        }
                    }
                    serde_json::Value::String(s) => RawCell::Text(s.clone()),
                    other => RawCell::Text(other.to_string()),
                };
                if !headers.contains(&path) {
                    headers.push(path.clone());
                }
                out.insert(path, cell);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gtfs_calendar() -> Dataset {
        let csv = "service_id,start_date,end_date\n\
                   wk,20180101,20180131\n\
                   we,20180106,20180127\n";
        let options = LoadOptions::csv(b',')
            .select(&["service_id", "start_date", "end_date"])
            .with_type("start_date", ColumnType::Date)
            .with_type("end_date", ColumnType::Date);
        Dataset::load(csv.as_bytes(), "calendar.txt", &options).unwrap()
    }

    #[test]
    fn test_load_counts_rows() {
        let ds = gtfs_calendar();
        assert_eq!(ds.row_count(), 2);
        assert_eq!(ds.headers(), &["service_id", "start_date", "end_date"]);
    }

    #[test]
    fn test_missing_columns_are_enumerated() {
        let csv = "a,b\n1,2\n";
        let options = LoadOptions::csv(b',').select(&["a", "x", "y"]);
        let err = Dataset::load(csv.as_bytes(), "t.txt", &options).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("t.txt"));
        assert!(msg.contains("missing columns: x, y"));
    }

    #[test]
    fn test_min_max_dates() {
        let ds = gtfs_calendar();
        assert_eq!(
            ds.min("start_date").unwrap().as_date(),
            NaiveDate::from_ymd_opt(2018, 1, 1)
        );
        assert_eq!(
            ds.max("end_date").unwrap().as_date(),
            NaiveDate::from_ymd_opt(2018, 1, 31)
        );
    }

    #[test]
    fn test_min_skips_missing_cells() {
        let csv = "v\n\n3\n2\n";
        let options = LoadOptions::csv(b',').with_type("v", ColumnType::Integer);
        let ds = Dataset::load(csv.as_bytes(), "t.txt", &options).unwrap();
        assert_eq!(ds.min("v").unwrap().as_integer(), Some(2));
    }

    #[test]
    fn test_min_fails_on_all_missing() {
        let csv = "v\n\n\n";
        let ds = Dataset::load(csv.as_bytes(), "t.txt", &LoadOptions::csv(b',')).unwrap();
        assert!(ds.min("v").is_err());
    }

    #[test]
    fn test_unparsable_date_fails_load() {
        let csv = "d\nnot-a-date\n";
        let options = LoadOptions::csv(b',').with_type("d", ColumnType::Date);
        let err = Dataset::load(csv.as_bytes(), "t.txt", &options).unwrap_err();
        assert!(err.to_string().contains("not-a-date"));
    }

    #[test]
    fn test_empty_field_is_missing_not_empty_string() {
        let csv = "a,b\n1,\n";
        let ds = Dataset::load(csv.as_bytes(), "t.txt", &LoadOptions::csv(b',')).unwrap();
        assert!(ds.cell(0, "b").unwrap().is_missing());
        assert_eq!(ds.cell(0, "a"), Some(&CellValue::Text("1".to_string())));
    }

    #[test]
    fn test_headerless_with_explicit_names() {
        let csv = "1;20/01/2018;25/01/2018\n2;10/01/2018;30/01/2018\n";
        let options = LoadOptions::csv(b';')
            .with_column_names(&["version_id", "begin_date", "end_date"])
            .with_type("begin_date", ColumnType::Date)
            .with_type("end_date", ColumnType::Date)
            .with_date_format("%d/%m/%Y");
        let ds = Dataset::load(csv.as_bytes(), "versions.txt", &options).unwrap();
        assert_eq!(ds.row_count(), 2);
        assert_eq!(
            ds.min("begin_date").unwrap().as_date(),
            NaiveDate::from_ymd_opt(2018, 1, 10)
        );
    }

    #[test]
    fn test_group_count_by() {
        let csv = "trip_id,stop_id\nt1,s1\nt1,s2\nt2,s1\nt2,\n";
        let ds = Dataset::load(csv.as_bytes(), "stop_times.txt", &LoadOptions::csv(b',')).unwrap();
        let counts = ds.group_count_by(&["trip_id"], "stop_id").unwrap();
        assert_eq!(counts[&vec!["t1".to_string()]], 2);
        // missing stop_id is not counted
        assert_eq!(counts[&vec!["t2".to_string()]], 1);
    }

    #[test]
    fn test_derive_by_key_sees_only_input_columns() {
        let csv = "trip_id,route_id,shape_id\nt1,r1,sh1\nt2,r2,sh2\n";
        let ds = Dataset::load(csv.as_bytes(), "trips.txt", &LoadOptions::csv(b',')).unwrap();
        let derived = ds
            .derive_by_key("trip_id", &["route_id"], |row| {
                assert!(row.get("shape_id").is_none());
                row.get("route_id").cloned().unwrap_or(CellValue::Missing)
            })
            .unwrap();
        assert_eq!(derived.len(), 2);
        assert_eq!(derived[0].0, "t1");
        assert_eq!(derived[0].1, CellValue::Text("r1".to_string()));
    }

    #[test]
    fn test_apply_in_place_touches_only_one_column() {
        let csv = "trip_id,direction_id\nt1,0\nt2,1\n";
        let mut ds = Dataset::load(csv.as_bytes(), "trips.txt", &LoadOptions::csv(b',')).unwrap();
        ds.apply_in_place("direction_id", |_| CellValue::Text("1".to_string()))
            .unwrap();
        assert_eq!(ds.cell(0, "direction_id"), Some(&CellValue::Text("1".to_string())));
        assert_eq!(ds.cell(0, "trip_id"), Some(&CellValue::Text("t1".to_string())));
    }

    #[test]
    fn test_save_csv_round_trip() {
        let csv = "a,b\n1,2\n3,\n";
        let ds = Dataset::load(csv.as_bytes(), "t.txt", &LoadOptions::csv(b',')).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        ds.save_csv(&path).unwrap();

        let reloaded = Dataset::load_path(&path, &LoadOptions::csv(b',')).unwrap();
        assert_eq!(reloaded.headers(), ds.headers());
        assert_eq!(reloaded.row_count(), 2);
        assert!(reloaded.cell(1, "b").unwrap().is_missing());
    }

    #[test]
    fn test_json_flattened_by_dotted_path() {
        let json = r#"[
            {"route": {"id": "r1"}, "stops": 3},
            {"route": {"id": "r2"}, "stops": null}
        ]"#;
        let ds = Dataset::load(json.as_bytes(), "routes.json", &LoadOptions::json()).unwrap();
        assert_eq!(ds.headers(), &["route.id", "stops"]);
        assert_eq!(ds.cell(0, "route.id"), Some(&CellValue::Text("r1".to_string())));
        assert_eq!(ds.cell(0, "stops"), Some(&CellValue::Integer(3)));
        assert!(ds.cell(1, "stops").unwrap().is_missing());
    }

    #[test]
    fn test_json_non_array_fails() {
        let json = r#"{"not": "an array"}"#;
        assert!(Dataset::load(json.as_bytes(), "t.json", &LoadOptions::json()).is_err());
    }
}
