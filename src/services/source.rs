//! Local JSON sources for the PostgreSQL dialect, decoded the way
//! `COPY … FORMAT AS JSON` decodes object-storage files.

use crate::config::StorageConfig;
use crate::db::models::{NewStagingEvent, NewStagingSong};
use crate::error::EtlError;
use crate::tables::STAGING_EVENTS;
use log::{debug, info};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub fn is_object_store_uri(path: &str) -> bool {
    path.to_ascii_lowercase().starts_with("s3://")
}

/// Positional field mapping: entry `i` names the JSON key loaded into column `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPaths {
    pub keys: Vec<String>,
}

#[derive(Deserialize)]
struct JsonPathsDocument {
    jsonpaths: Vec<String>,
}

impl JsonPaths {
    pub fn from_file(path: &Path) -> Result<Self, EtlError> {
        let text = std::fs::read_to_string(path).map_err(|e| source_error(path, e))?;
        Self::parse(&text).map_err(|e| source_error(path, e))
    }

    pub fn parse(text: &str) -> Result<Self, String> {
        let doc: JsonPathsDocument = serde_json::from_str(text).map_err(|e| format!("invalid jsonpaths file: {}", e))?;
        let keys = doc
            .jsonpaths
            .iter()
            .map(|expr| path_key(expr))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(JsonPaths { keys })
    }
}

/// Top-level key of a jsonpath expression: `$['key']`, `$["key"]` or `$.key`.
fn path_key(expr: &str) -> Result<String, String> {
    let expr = expr.trim();
    let key = if let Some(rest) = expr.strip_prefix("$[") {
        let inner = rest
            .strip_suffix(']')
            .ok_or_else(|| format!("unterminated bracket in jsonpath `{}`", expr))?;
        inner
            .strip_prefix('\'')
            .and_then(|s| s.strip_suffix('\''))
            .or_else(|| inner.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
            .ok_or_else(|| format!("jsonpath `{}` must quote its key", expr))?
    } else if let Some(rest) = expr.strip_prefix("$.") {
        rest
    } else {
        return Err(format!("unsupported jsonpath `{}`", expr));
    };

    if key.is_empty() || key.contains(['[', ']']) || (expr.starts_with("$.") && key.contains('.')) {
        return Err(format!("only top-level keys are supported, got `{}`", expr));
    }
    Ok(key.to_string())
}

/// `root` itself when it is a file, otherwise every `*.json` file below it in
/// path order.
pub fn json_files(root: &Path) -> Result<Vec<PathBuf>, EtlError> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    if !root.is_dir() {
        return Err(source_error(root, "no such file or directory"));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| source_error(root, e))?;
        let is_json = entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if entry.file_type().is_file() && is_json {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Every JSON object in `path`. Objects may be newline-delimited or simply
/// concatenated; anything that is not an object is an error.
pub fn read_objects(path: &Path) -> Result<Vec<Map<String, Value>>, EtlError> {
    let file = File::open(path).map_err(|e| source_error(path, e))?;
    let stream = serde_json::Deserializer::from_reader(BufReader::new(file)).into_iter::<Value>();

    let mut objects = Vec::new();
    for (index, value) in stream.enumerate() {
        match value.map_err(|e| source_error(path, format!("record {}: {}", index + 1, e)))? {
            Value::Object(map) => objects.push(map),
            other => {
                return Err(source_error(
                    path,
                    format!("record {} is not a JSON object (found {})", index + 1, kind(&other)),
                ));
            }
        }
    }
    Ok(objects)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub fn decode_event(record: &Map<String, Value>, paths: &JsonPaths) -> Result<NewStagingEvent, String> {
    let mut row = Map::new();
    for (column, key) in STAGING_EVENTS.columns.iter().zip(&paths.keys) {
        row.insert(column.name.to_string(), record.get(key).cloned().unwrap_or(Value::Null));
    }
    serde_path_to_error::deserialize(Value::Object(row)).map_err(|e| format!("{}: {}", e.path(), e.inner()))
}

pub fn decode_song(record: Map<String, Value>) -> Result<NewStagingSong, String> {
    serde_path_to_error::deserialize(Value::Object(record)).map_err(|e| format!("{}: {}", e.path(), e.inner()))
}

pub fn read_events(storage: &StorageConfig) -> Result<Vec<NewStagingEvent>, EtlError> {
    let paths = JsonPaths::from_file(Path::new(&storage.log_jsonpath))?;
    if paths.keys.len() != STAGING_EVENTS.columns.len() {
        return Err(EtlError::Load {
            table: STAGING_EVENTS.name.to_string(),
            message: format!(
                "jsonpaths file maps {} field(s) but staging_events has {} column(s)",
                paths.keys.len(),
                STAGING_EVENTS.columns.len()
            ),
        });
    }

    let mut rows = Vec::new();
    for file in json_files(Path::new(&storage.log_data))? {
        let objects = read_objects(&file)?;
        debug!("Read {} event record(s) from {}", objects.len(), file.display());
        for (index, object) in objects.iter().enumerate() {
            let row = decode_event(object, &paths)
                .map_err(|e| source_error(&file, format!("record {}: {}", index + 1, e)))?;
            rows.push(row);
        }
    }
    info!("Decoded {} event record(s) from {}", rows.len(), storage.log_data);
    Ok(rows)
}

pub fn read_songs(storage: &StorageConfig) -> Result<Vec<NewStagingSong>, EtlError> {
    let mut rows = Vec::new();
    for file in json_files(Path::new(&storage.song_data))? {
        let objects = read_objects(&file)?;
        debug!("Read {} song record(s) from {}", objects.len(), file.display());
        for (index, object) in objects.into_iter().enumerate() {
            let row = decode_song(object).map_err(|e| source_error(&file, format!("record {}: {}", index + 1, e)))?;
            rows.push(row);
        }
    }
    info!("Decoded {} song record(s) from {}", rows.len(), storage.song_data);
    Ok(rows)
}

fn source_error(path: &Path, message: impl ToString) -> EtlError {
    EtlError::Source {
        path: path.display().to_string(),
        message: message.to_string(),
    }
}
