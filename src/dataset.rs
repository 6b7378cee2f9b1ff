//! Dataset types for hojear.
//!
//! Provides the [`Dataset`] container and its loaders for JSON, CSV and
//! XLSX sources. A dataset is an ordered, immutable sequence of
//! [`Record`]s with a fixed column set and a unique integer id per
//! record, fully materialized in memory for the lifetime of the process.

use std::{collections::HashMap, io::Read, path::Path};

use calamine::{open_workbook_auto, Data, Reader};
use serde_json::{Map, Number, Value};

use crate::{
    error::{Error, Result},
    record::{Record, ID_FIELD},
};

/// An ordered, in-memory collection of records with a fixed column set.
///
/// Invariants established at construction:
/// - every record carries an integer `id`, unique within the dataset
///   (assigned from 1-based position when the source has no id column);
/// - the column set is the union of all record fields, in
///   first-appearance order;
/// - record order matches source order and never changes.
///
/// # Example
///
/// ```
/// use hojear::Dataset;
///
/// let dataset = Dataset::from_json_str(
///     r#"[{"legal_name": "Acme Freight", "entity_type": "CARRIER"}]"#,
/// ).unwrap();
///
/// assert_eq!(dataset.len(), 1);
/// assert!(dataset.get_by_id(1).is_some());
/// ```
#[derive(Debug, Clone)]
pub struct Dataset {
    records: Vec<Record>,
    columns: Vec<String>,
    index: HashMap<i64, usize>,
}

impl Dataset {
    /// Creates a dataset from loaded records, establishing the id and
    /// column invariants.
    ///
    /// When the source carries an `id` column, every record must have an
    /// integer id; otherwise ids are assigned from 1-based position.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateId`] when two records share an id, or
    /// [`Error::InvalidId`] when an id column exists but a record's id is
    /// missing or not an integer.
    pub fn new(records: Vec<Record>) -> Result<Self> {
        let mut columns: Vec<String> = Vec::new();
        for record in &records {
            for field in record.fields() {
                if !columns.iter().any(|c| c == field) {
                    columns.push(field.to_string());
                }
            }
        }

        let has_id_column = columns.iter().any(|c| c == ID_FIELD);
        let mut records = records;

        if has_id_column {
            for (row, record) in records.iter().enumerate() {
                if record.id().is_none() {
                    return Err(Error::invalid_id(format!(
                        "row {} has a missing or non-integer id",
                        row + 1
                    )));
                }
            }
        } else {
            // No id column in the source: assign 1-based positions,
            // with the id leading each record.
            for (row, record) in records.iter_mut().enumerate() {
                let mut fields = Map::new();
                fields.insert(ID_FIELD.to_string(), Value::from(row as i64 + 1));
                fields.append(record.fields_mut());
                *record = Record::new(fields);
            }
            columns.insert(0, ID_FIELD.to_string());
        }

        let mut index = HashMap::with_capacity(records.len());
        for (row, record) in records.iter().enumerate() {
            let id = record.id().ok_or_else(|| {
                Error::invalid_id(format!("row {} has a missing or non-integer id", row + 1))
            })?;
            if index.insert(id, row).is_some() {
                return Err(Error::DuplicateId { id });
            }
        }

        Ok(Self {
            records,
            columns,
            index,
        })
    }

    /// Loads a dataset from a JSON file.
    ///
    /// Accepts either a top-level array of objects or JSON Lines (one
    /// object per line).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// records violate the id invariants.
    pub fn from_json(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| Error::io(e, path))?;
        Self::from_json_str(&data)
    }

    /// Loads a dataset from a JSON string (array of objects or JSONL).
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or the records violate the id
    /// invariants.
    pub fn from_json_str(data: &str) -> Result<Self> {
        let trimmed = data.trim_start();
        let records: Vec<Record> = if trimmed.starts_with('[') {
            serde_json::from_str(trimmed)?
        } else {
            trimmed
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(serde_json::from_str)
                .collect::<std::result::Result<_, _>>()?
        };
        Self::new(records)
    }

    /// Loads a dataset from a CSV file with a header row.
    ///
    /// Cell values are inferred: empty cells become null, numeric cells
    /// become numbers, everything else stays a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsed.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| Error::io(e, path))?;
        Self::from_csv_reader(std::io::BufReader::new(file))
    }

    /// Loads a dataset from a CSV string with a header row.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails.
    pub fn from_csv_str(data: &str) -> Result<Self> {
        Self::from_csv_reader(data.as_bytes())
    }

    fn from_csv_reader(reader: impl Read) -> Result<Self> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let headers: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(ToString::to_string)
            .collect();

        let mut records = Vec::new();
        for row in csv_reader.records() {
            let row = row?;
            let mut fields = Map::new();
            for (header, cell) in headers.iter().zip(row.iter()) {
                fields.insert(header.clone(), infer_cell(cell));
            }
            records.push(Record::new(fields));
        }
        Self::new(records)
    }

    /// Loads a dataset from the first sheet of an XLSX/XLS workbook.
    ///
    /// The first row is taken as the header row.
    ///
    /// # Errors
    ///
    /// Returns an error if the workbook cannot be opened, has no sheets,
    /// or the records violate the id invariants.
    pub fn from_xlsx(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut workbook = open_workbook_auto(path)?;
        let sheet = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or(Error::Spreadsheet(calamine::Error::Msg(
                "workbook has no sheets",
            )))?;
        let range = workbook.worksheet_range(&sheet)?;

        let mut rows = range.rows();
        let Some(header_row) = rows.next() else {
            return Self::new(Vec::new());
        };
        let headers: Vec<String> = header_row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let text = cell_text(cell);
                if text.is_empty() {
                    format!("column_{}", i + 1)
                } else {
                    text
                }
            })
            .collect();

        let mut records = Vec::new();
        for row in rows {
            let mut fields = Map::new();
            for (header, cell) in headers.iter().zip(row.iter()) {
                fields.insert(header.clone(), cell_value(cell));
            }
            records.push(Record::new(fields));
        }
        Self::new(records)
    }

    /// Loads a dataset from a path, dispatching on the file extension.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFormat`] for unrecognized extensions,
    /// or any loader error.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            "json" | "jsonl" => Self::from_json(path),
            "csv" => Self::from_csv(path),
            "xlsx" | "xlsm" | "xls" => Self::from_xlsx(path),
            ext => Err(Error::unsupported_format(ext)),
        }
    }

    /// Returns the total number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the dataset contains no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the column names in first-appearance order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns true if the dataset has the named column.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Returns all records in source order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Returns the record at a position, if in bounds.
    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    /// Returns the record with the given id, if any.
    pub fn get_by_id(&self, id: i64) -> Option<&Record> {
        self.index.get(&id).and_then(|&row| self.records.get(row))
    }

    /// Returns an iterator over all records in source order.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }
}

/// Infers a JSON value from a CSV cell.
fn infer_cell(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = cell.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = cell.parse::<f64>() {
        if let Some(n) = Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    Value::String(cell.to_string())
}

/// Converts a spreadsheet cell to a JSON value.
fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(f.to_string())),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(d) => Value::String(d.to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::String(s.clone()),
    }
}

/// Converts a spreadsheet cell to its display string (header row).
fn cell_text(cell: &Data) -> String {
    match cell_value(cell) {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}
