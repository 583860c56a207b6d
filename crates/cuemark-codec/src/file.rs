//! Filesystem access: import path guards and JSON read/write.

use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::CodecError;

/// Check that `path` names an existing `.json` file.
///
/// The extension check is case-insensitive.
pub fn check_import_path(path: &Path) -> Result<(), CodecError> {
    if path.as_os_str().is_empty() {
        return Err(CodecError::NoFile);
    }
    if !path.exists() {
        return Err(CodecError::MissingFile(path.to_path_buf()));
    }
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if !is_json {
        return Err(CodecError::NotJson(path.to_path_buf()));
    }
    Ok(())
}

/// Guard, read and parse a JSON file.
pub fn read_json(path: &Path) -> Result<JsonValue, CodecError> {
    check_import_path(path)?;
    let text = fs::read_to_string(path).map_err(|source| CodecError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = text.len(), "read JSON file");
    serde_json::from_str(&text).map_err(|source| CodecError::InvalidJson {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `document` as pretty-printed JSON (two-space indent).
pub fn write_json<T: Serialize>(path: &Path, document: &T) -> Result<(), CodecError> {
    let text = serde_json::to_string_pretty(document)?;
    fs::write(path, text).map_err(|source| CodecError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "wrote JSON file");
    Ok(())
}
