//! Sidecar files the extractor writes next to each voice line.
//!
//! `<id>-criteria.txt` and `<id>-weight.txt` are UTF-16 text. Files without a BOM
//! are read as little-endian; files that are valid UTF-8 without a BOM are accepted too.

use std::fs;
use std::path::{Path, PathBuf};

use crate::quotes::error::GenerateError;

pub const CRITERIA_SUFFIX: &str = "-criteria.txt";
pub const WEIGHT_SUFFIX: &str = "-weight.txt";

pub fn criteria_path(dir: &Path, file_id: &str) -> PathBuf {
    dir.join(format!("{file_id}{CRITERIA_SUFFIX}"))
}

pub fn weight_path(dir: &Path, file_id: &str) -> PathBuf {
    dir.join(format!("{file_id}{WEIGHT_SUFFIX}"))
}

/// True for sidecars, which must not be treated as voice lines.
pub fn is_sidecar(file_name: &str) -> bool {
    file_name.ends_with(CRITERIA_SUFFIX) || file_name.ends_with(WEIGHT_SUFFIX)
}

pub fn decode_utf16(bytes: &[u8]) -> String {
    let (body, big_endian) = match bytes {
        [0xFE, 0xFF, rest @ ..] => (rest, true),
        [0xFF, 0xFE, rest @ ..] => (rest, false),
        _ => (bytes, false),
    };
    let units = body.chunks_exact(2).map(|pair| {
        if big_endian {
            u16::from_be_bytes([pair[0], pair[1]])
        } else {
            u16::from_le_bytes([pair[0], pair[1]])
        }
    });
    char::decode_utf16(units)
        .map(|unit| unit.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

/// Decode sidecar bytes: UTF-16 when a BOM is present or the bytes are not UTF-8.
pub fn decode_text(bytes: &[u8]) -> String {
    if bytes.starts_with(&[0xFF, 0xFE]) || bytes.starts_with(&[0xFE, 0xFF]) {
        return decode_utf16(bytes);
    }
    match std::str::from_utf8(bytes) {
        Ok(text) if !text.contains('\0') => text.to_string(),
        _ => decode_utf16(bytes),
    }
}

/// Read and decode a sidecar; `Ok(None)` when it does not exist.
pub fn read_sidecar(path: &Path) -> Result<Option<String>, GenerateError> {
    if !path.is_file() {
        return Ok(None);
    }
    let bytes = fs::read(path).map_err(|source| GenerateError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(Some(decode_text(&bytes)))
}

pub fn read_weight(path: &Path) -> Result<Option<f64>, GenerateError> {
    let Some(text) = read_sidecar(path)? else {
        return Ok(None);
    };
    let value = text.trim();
    value
        .parse::<f64>()
        .map(Some)
        .map_err(|_| GenerateError::InvalidWeight {
            path: path.display().to_string(),
            value: value.to_string(),
        })
}
