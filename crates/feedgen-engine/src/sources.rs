//! Readers for the Connexity collaborator files and small filesystem helpers
//! shared by the regeneration pipeline.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use feedgen_core::{MerchantInfo, MultiplierRow};
use serde::Deserialize;

use crate::error::FeedError;

const PLACEMENT_COLUMN: &str = "placementId";
const KEY_COLUMN: &str = "ecpcMultiplierKey";
const MULTIPLIER_COLUMN: &str = "ecpcMultiplier";

/// A JSON value that the exports write either as a string or as a number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum Scalar {
    Text(String),
    Number(serde_json::Number),
}

impl Scalar {
    pub(crate) fn into_string(self) -> String {
        match self {
            Scalar::Text(s) => s,
            Scalar::Number(n) => n.to_string(),
        }
    }

    pub(crate) fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Text(s) => s.trim().parse().ok(),
            Scalar::Number(n) => n.as_f64(),
        }
    }

    pub(crate) fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Text(s) => s.trim().parse().ok(),
            Scalar::Number(n) => n.as_i64(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MerchantsFile {
    #[serde(default)]
    merchant: Vec<MerchantEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MerchantEntry {
    mid: Scalar,
    #[serde(default)]
    merchant_info: MerchantDetails,
}

#[derive(Debug, Default, Deserialize)]
struct MerchantDetails {
    #[serde(default)]
    name: String,
}

/// Reads `merchants.json` into a map keyed by merchant ID.
///
/// # Errors
///
/// Returns [`FeedError::Io`] if the file cannot be read or
/// [`FeedError::Deserialize`] if it is not a merchants export.
pub fn load_merchants(path: &Path) -> Result<HashMap<String, MerchantInfo>, FeedError> {
    let file = File::open(path).map_err(|e| FeedError::io(path, e))?;
    parse_merchants(BufReader::new(file), &path.display().to_string())
}

/// Parses a merchants export from any reader.
///
/// # Errors
///
/// Returns [`FeedError::Deserialize`] if the document does not match the
/// export layout.
pub fn parse_merchants<R: Read>(
    reader: R,
    context: &str,
) -> Result<HashMap<String, MerchantInfo>, FeedError> {
    let parsed: MerchantsFile =
        serde_json::from_reader(reader).map_err(|source| FeedError::Deserialize {
            context: context.to_string(),
            source,
        })?;

    Ok(parsed
        .merchant
        .into_iter()
        .map(|entry| {
            let id = entry.mid.into_string();
            let info = MerchantInfo {
                id: id.clone(),
                name: entry.merchant_info.name,
            };
            (id, info)
        })
        .collect())
}

/// Reads the tab-delimited eCPC multiplier table.
///
/// # Errors
///
/// See [`parse_multiplier_rows`]; also [`FeedError::Io`] when the file
/// cannot be opened.
pub fn load_multiplier_rows(path: &Path) -> Result<Vec<MultiplierRow>, FeedError> {
    let file = File::open(path).map_err(|e| FeedError::io(path, e))?;
    parse_multiplier_rows(file, &path.display().to_string())
}

/// Parses multiplier rows, locating columns by header name.
///
/// Rows without a placement ID or with a multiplier that is not a number are
/// skipped with a warning. A missing key cell reads as an empty key.
///
/// # Errors
///
/// Returns [`FeedError::MissingColumn`] if the header lacks a required
/// column, or [`FeedError::SourceRead`] on malformed input.
pub fn parse_multiplier_rows<R: Read>(
    reader: R,
    context: &str,
) -> Result<Vec<MultiplierRow>, FeedError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let source_err = |source| FeedError::SourceRead {
        context: context.to_string(),
        source,
    };

    let headers = reader.headers().map_err(source_err)?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| FeedError::MissingColumn {
                context: context.to_string(),
                column: name.to_string(),
            })
    };
    let placement_idx = column(PLACEMENT_COLUMN)?;
    let key_idx = column(KEY_COLUMN)?;
    let multiplier_idx = column(MULTIPLIER_COLUMN)?;

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for record in reader.records() {
        let record = record.map_err(source_err)?;
        let placement_id = record.get(placement_idx).unwrap_or_default();
        if placement_id.is_empty() {
            skipped += 1;
            continue;
        }
        let raw_multiplier = record.get(multiplier_idx).unwrap_or_default();
        let Ok(ecpc_multiplier) = raw_multiplier.parse::<f64>() else {
            tracing::warn!(
                placement_id,
                value = raw_multiplier,
                "skipping multiplier row with non-numeric multiplier"
            );
            skipped += 1;
            continue;
        };
        rows.push(MultiplierRow {
            placement_id: placement_id.to_string(),
            ecpc_multiplier_key: record.get(key_idx).unwrap_or_default().to_string(),
            ecpc_multiplier,
        });
    }

    tracing::debug!(rows = rows.len(), skipped, "loaded multiplier table");
    Ok(rows)
}

/// Concatenates PLA part files into `destination`, keeping only the first
/// part's header line. Any existing destination is replaced.
///
/// Returns the number of parts combined.
///
/// # Errors
///
/// Returns [`FeedError::Io`] if a part cannot be read or the destination
/// cannot be written.
pub fn combine_pla_feeds(parts: &[PathBuf], destination: &Path) -> Result<usize, FeedError> {
    let out = File::create(destination).map_err(|e| FeedError::io(destination, e))?;
    let mut out = BufWriter::new(out);

    for (index, part) in parts.iter().enumerate() {
        let file = File::open(part).map_err(|e| FeedError::io(part, e))?;
        let mut reader = BufReader::new(file);

        if index > 0 {
            let mut header = String::new();
            reader
                .read_line(&mut header)
                .map_err(|e| FeedError::io(part, e))?;
        }
        std::io::copy(&mut reader, &mut out).map_err(|e| FeedError::io(destination, e))?;
        tracing::debug!(part = %part.display(), "combined PLA part");
    }

    out.flush().map_err(|e| FeedError::io(destination, e))?;
    Ok(parts.len())
}

/// Ensures `<root>/feeds` exists, optionally wiping `root` first.
///
/// # Errors
///
/// Returns [`FeedError::Io`] if the purge or directory creation fails.
pub fn prepare_feed_directories(root: &Path, purge: bool) -> Result<PathBuf, FeedError> {
    if purge {
        match fs::remove_dir_all(root) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(FeedError::io(root, e)),
        }
    }
    let feeds = root.join("feeds");
    fs::create_dir_all(&feeds).map_err(|e| FeedError::io(&feeds, e))?;
    Ok(feeds)
}

/// Appends one line per item to `path`, creating it and its parent
/// directory when needed.
///
/// # Errors
///
/// Returns [`FeedError::Io`] on any filesystem failure.
pub fn append_lines<S: AsRef<str>>(path: &Path, lines: &[S]) -> Result<(), FeedError> {
    if lines.is_empty() {
        return Ok(());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| FeedError::io(parent, e))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| FeedError::io(path, e))?;
    let mut out = BufWriter::new(file);
    for line in lines {
        writeln!(out, "{}", line.as_ref()).map_err(|e| FeedError::io(path, e))?;
    }
    out.flush().map_err(|e| FeedError::io(path, e))
}
