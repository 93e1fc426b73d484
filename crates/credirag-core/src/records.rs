//! Dataset readers producing [`Record`]s from CSV or JSON Lines files.
//!
//! Readers are lazy; a row that cannot be turned into a record yields an
//! `Error::Schema` for that row only and iteration continues.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::config::IngestSettings;
use crate::error::{Error, Result};
use crate::metadata::RawMetadata;
use crate::types::Record;

pub type RecordIter = Box<dyn Iterator<Item = Result<Record>> + Send>;

/// Names of the dataset columns the pipeline reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordColumns {
    pub id: String,
    pub category: String,
    pub narrative: String,
    pub extra: Vec<String>,
}

impl RecordColumns {
    pub fn from_settings(s: &IngestSettings) -> Self {
        Self {
            id: s.id_column.clone(),
            category: s.category_column.clone(),
            narrative: s.narrative_column.clone(),
            extra: s.metadata_columns.clone(),
        }
    }
}

impl Default for RecordColumns {
    fn default() -> Self { Self::from_settings(&IngestSettings::default()) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Csv,
    JsonLines,
}

fn format_of(path: &Path) -> Option<Format> {
    match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
        Some("csv") => Some(Format::Csv),
        Some("jsonl") | Some("ndjson") => Some(Format::JsonLines),
        _ => None,
    }
}

/// A single dataset file, or every `.csv`/`.jsonl` file below a directory in path order.
pub fn discover_inputs(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        if format_of(path).is_none() {
            return Err(Error::Configuration(format!("unsupported dataset format: {}", path.display())));
        }
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(Error::Configuration(format!("dataset not found: {}", path.display())));
    }
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && format_of(e.path()).is_some())
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    Ok(files)
}

/// Open every dataset file under `path` and chain their records.
pub fn read_dataset(path: &Path, columns: &RecordColumns) -> Result<RecordIter> {
    let files = discover_inputs(path)?;
    if files.is_empty() {
        tracing::warn!(path = %path.display(), "no dataset files found");
    }
    let mut readers = Vec::with_capacity(files.len());
    for (file_index, file) in files.iter().enumerate() {
        tracing::info!(file = %file.display(), "reading dataset file");
        readers.push(open_file(file, file_index, columns)?);
    }
    Ok(Box::new(readers.into_iter().flatten()))
}

pub fn read_file(path: &Path, columns: &RecordColumns) -> Result<RecordIter> {
    open_file(path, 0, columns)
}

/// Id given to a record whose id cell is blank.
///
/// The `row-` prefix keeps it apart from real (numeric) complaint ids and the
/// file position keeps rows of different files of one dataset apart.
pub fn fallback_id(file_index: usize, row: usize) -> String { format!("row-{file_index}-{row}") }

fn open_file(path: &Path, file_index: usize, columns: &RecordColumns) -> Result<RecordIter> {
    match format_of(path) {
        Some(Format::Csv) => read_csv(path, file_index, columns),
        Some(Format::JsonLines) => read_jsonl(path, file_index, columns),
        None => Err(Error::Configuration(format!("unsupported dataset format: {}", path.display()))),
    }
}

fn read_csv(path: &Path, file_index: usize, columns: &RecordColumns) -> Result<RecordIter> {
    let source = path.display().to_string();
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(File::open(path)?);
    let headers = reader.headers().map_err(|e| Error::schema(&source, e.to_string()))?.clone();
    let position = |name: &str| headers.iter().position(|h| h.trim() == name);
    let id_at = position(&columns.id);
    let category_at = position(&columns.category);
    let narrative_at = position(&columns.narrative);
    let extra_at: Vec<(String, Option<usize>)> = columns.extra.iter().map(|c| (c.clone(), position(c))).collect();
    let columns = columns.clone();

    let rows = reader.into_records().enumerate().map(move |(row, result)| {
        let label = format!("{source}#{row}");
        let fields = result.map_err(|e| Error::schema(&label, e.to_string()))?;
        let cell = |at: Option<usize>| at.and_then(|i| fields.get(i)).map(str::trim);

        let id = match cell(id_at) {
            None => return Err(Error::schema(&label, format!("missing column '{}'", columns.id))),
            Some("") => fallback_id(file_index, row),
            Some(v) => v.to_string(),
        };
        let category = match cell(category_at) {
            None => return Err(Error::schema(&label, format!("missing column '{}'", columns.category))),
            Some("") => return Err(Error::schema(&label, "empty category")),
            Some(v) => v.to_string(),
        };
        let narrative = cell(narrative_at).filter(|v| !v.is_empty()).map(str::to_string);
        let mut extra = RawMetadata::new();
        for (name, at) in &extra_at {
            let value = match cell(*at) {
                Some(v) if !v.is_empty() => Value::String(v.to_string()),
                _ => Value::Null,
            };
            extra.insert(name.clone(), value);
        }
        Ok(Record { id, category, narrative, extra })
    });
    Ok(Box::new(rows))
}

fn read_jsonl(path: &Path, file_index: usize, columns: &RecordColumns) -> Result<RecordIter> {
    let source = path.display().to_string();
    let reader = BufReader::new(File::open(path)?);
    let columns = columns.clone();
    let rows = reader
        .lines()
        .enumerate()
        .filter(|(_, line)| line.as_ref().map(|l| !l.trim().is_empty()).unwrap_or(true))
        .map(move |(line_no, line)| {
            let label = format!("{source}:{}", line_no + 1);
            // undecodable bytes spoil this line only; other read failures end the file
            let line = line.map_err(|e| match e.kind() {
                std::io::ErrorKind::InvalidData => Error::schema(&label, e.to_string()),
                _ => Error::Io(e),
            })?;
            let value: Value = serde_json::from_str(&line).map_err(|e| Error::schema(&label, e.to_string()))?;
            let Value::Object(mut obj) = value else {
                return Err(Error::schema(&label, "expected a JSON object"));
            };
            record_from_object(&mut obj, &columns, fallback_id(file_index, line_no), &label)
        });
    Ok(Box::new(rows))
}

fn record_from_object(obj: &mut RawMetadata, columns: &RecordColumns, fallback: String, label: &str) -> Result<Record> {
    let id = match obj.get(&columns.id) {
        None => return Err(Error::schema(label, format!("missing field '{}'", columns.id))),
        Some(Value::Null) => fallback,
        Some(Value::String(s)) if s.trim().is_empty() => fallback,
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => return Err(Error::schema(label, format!("unusable id value {other}"))),
    };
    let category = match obj.get(&columns.category) {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(_) => return Err(Error::schema(label, format!("field '{}' must be a non-empty string", columns.category))),
        None => return Err(Error::schema(label, format!("missing field '{}'", columns.category))),
    };
    let narrative = match obj.get(&columns.narrative) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()).filter(|s| !s.trim().is_empty()),
        Some(_) => return Err(Error::schema(label, format!("field '{}' must be a string", columns.narrative))),
    };
    let mut extra = RawMetadata::new();
    for name in &columns.extra {
        extra.insert(name.clone(), obj.remove(name).unwrap_or(Value::Null));
    }
    Ok(Record { id, category, narrative, extra })
}
