//! CSV dataset storage
//!
//! Datasets live under `{base}/{instrument}/` and are named
//! `{instrument}_{granularity}_{YYYYMMDD}_{YYYYMMDD}.csv`. Each file starts
//! with `# key: value` metadata lines followed by a regular CSV table with
//! columns `time, open, high, low, close, volume, complete`.
//!
//! Files are never edited in place: saving and appending rewrite the whole
//! file.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::data::parse_date;
use crate::error::{FxError, FxResult};
use crate::{Candle, Granularity};

/// Column order of stored datasets
pub const COLUMNS: [&str; 7] = ["time", "open", "high", "low", "close", "volume", "complete"];

const METADATA_MARKER: u8 = b'#';

/// A dataset found on disk
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetInfo {
    pub instrument: String,
    pub granularity: String,
    /// `YYYYMMDD`, as encoded in the file name
    pub from_date: String,
    pub to_date: String,
    pub path: PathBuf,
    pub record_count: usize,
}

/// Fields encoded in a dataset file name
#[derive(Debug, Clone, PartialEq)]
struct DatasetName {
    instrument: String,
    granularity: String,
    from_date: String,
    to_date: String,
}

impl DatasetName {
    fn parse(path: &Path) -> Option<Self> {
        let stem = path.file_stem()?.to_str()?;
        let parts: Vec<&str> = stem.split('_').collect();
        if parts.len() < 4 {
            return None;
        }

        let n = parts.len();
        Some(DatasetName {
            instrument: parts[..n - 3].join("_"),
            granularity: parts[n - 3].to_string(),
            from_date: parts[n - 2].to_string(),
            to_date: parts[n - 1].to_string(),
        })
    }
}

/// Reads and writes candle datasets below a base directory
#[derive(Debug, Clone)]
pub struct DataStorage {
    base_path: PathBuf,
}

impl DataStorage {
    /// Open (and create if needed) the storage directory
    pub fn new(base_path: impl AsRef<Path>) -> FxResult<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        info!("Data storage initialized at: {}", base_path.display());
        Ok(DataStorage { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Path a dataset with these parameters is stored at
    pub fn dataset_path(
        &self,
        instrument: &str,
        granularity: Granularity,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> PathBuf {
        let filename = format!(
            "{}_{}_{}_{}.csv",
            instrument,
            granularity,
            from.format("%Y%m%d"),
            to.format("%Y%m%d")
        );
        self.base_path.join(instrument).join(filename)
    }

    /// Write a series with its metadata header.
    ///
    /// Refuses to replace an existing file unless `overwrite` is set.
    pub fn save_to_csv(
        &self,
        candles: &[Candle],
        instrument: &str,
        granularity: Granularity,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        overwrite: bool,
    ) -> FxResult<PathBuf> {
        if candles.is_empty() {
            return Err(FxError::no_data(format!(
                "refusing to save empty {} {} series",
                instrument, granularity
            )));
        }

        let path = self.dataset_path(instrument, granularity, from, to);
        if path.exists() && !overwrite {
            return Err(FxError::AlreadyExists(path.display().to_string()));
        }

        let metadata = metadata_lines(
            candles,
            instrument,
            granularity.code(),
            &from.format("%Y-%m-%d").to_string(),
            &to.format("%Y-%m-%d").to_string(),
        );
        write_dataset(&path, candles, &metadata)?;

        info!("Saved {} records to: {}", candles.len(), path.display());
        Ok(path)
    }

    /// Load a dataset, skipping its metadata lines
    pub fn load_from_csv(&self, path: impl AsRef<Path>) -> FxResult<Vec<Candle>> {
        let path = path.as_ref();
        let candles = read_dataset(path)?;
        info!("Loaded {} records from: {}", candles.len(), path.display());
        Ok(candles)
    }

    /// Merge new candles into an existing dataset and rewrite it.
    ///
    /// On a shared timestamp the new candle replaces the stored one.
    pub fn append_to_existing(
        &self,
        candles: &[Candle],
        path: impl AsRef<Path>,
    ) -> FxResult<PathBuf> {
        let path = path.as_ref();
        let existing = read_dataset(path)?;
        let before = existing.len() + candles.len();

        let mut merged: BTreeMap<DateTime<Utc>, Candle> = BTreeMap::new();
        for candle in existing.into_iter().chain(candles.iter().cloned()) {
            merged.insert(candle.time, candle);
        }
        let combined: Vec<Candle> = merged.into_values().collect();

        let removed = before - combined.len();
        if removed > 0 {
            info!("Removed {} duplicate records", removed);
        }

        let metadata = match DatasetName::parse(path) {
            Some(name) => metadata_lines(
                &combined,
                &name.instrument,
                &name.granularity,
                &name.from_date,
                &name.to_date,
            ),
            None => Vec::new(),
        };
        write_dataset(path, &combined, &metadata)?;

        info!("Updated {} with {} records", path.display(), combined.len());
        Ok(path.to_path_buf())
    }

    /// First and last timestamps stored in a dataset
    pub fn get_existing_data_range(
        &self,
        path: impl AsRef<Path>,
    ) -> FxResult<(DateTime<Utc>, DateTime<Utc>)> {
        let path = path.as_ref();
        let candles = read_dataset(path)?;

        match (candles.first(), candles.last()) {
            (Some(first), Some(last)) => Ok((first.time, last.time)),
            _ => Err(FxError::no_data(format!(
                "{} has no candle rows",
                path.display()
            ))),
        }
    }

    /// Datasets on disk, optionally for a single instrument.
    ///
    /// Unreadable files are logged and left out.
    pub fn list_available_data(&self, instrument: Option<&str>) -> FxResult<Vec<DatasetInfo>> {
        let dirs: Vec<PathBuf> = match instrument {
            Some(name) => vec![self.base_path.join(name)],
            None => fs::read_dir(&self.base_path)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_dir())
                .collect(),
        };

        let mut datasets = Vec::new();
        for dir in dirs.iter().filter(|d| d.exists()) {
            for entry in fs::read_dir(dir)? {
                let path = entry?.path();
                if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                    continue;
                }
                let Some(name) = DatasetName::parse(&path) else {
                    continue;
                };

                match read_dataset(&path) {
                    Ok(candles) => datasets.push(DatasetInfo {
                        instrument: name.instrument,
                        granularity: name.granularity,
                        from_date: name.from_date,
                        to_date: name.to_date,
                        record_count: candles.len(),
                        path,
                    }),
                    Err(e) => warn!("Error reading {}: {}", path.display(), e),
                }
            }
        }

        datasets.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(datasets)
    }
}

fn metadata_lines(
    candles: &[Candle],
    instrument: &str,
    granularity: &str,
    from_label: &str,
    to_label: &str,
) -> Vec<String> {
    vec![
        format!("Instrument: {}", instrument),
        format!("Granularity: {}", granularity),
        format!("Date Range: {} to {}", from_label, to_label),
        format!("Records: {}", candles.len()),
        format!("Retrieved: {}", Utc::now().format("%Y-%m-%d %H:%M:%S UTC")),
        format!("Columns: {}", COLUMNS.join(", ")),
    ]
}

fn write_dataset(path: &Path, candles: &[Candle], metadata: &[String]) -> FxResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = File::create(path)?;
    for line in metadata {
        writeln!(file, "# {}", line)?;
    }

    // Candle field order matches COLUMNS, so the header comes from serde
    let mut writer = csv::Writer::from_writer(file);
    for candle in candles {
        writer.serialize(candle)?;
    }
    writer.flush()?;
    Ok(())
}

fn read_dataset(path: &Path) -> FxResult<Vec<Candle>> {
    let mut reader = csv::ReaderBuilder::new()
        .comment(Some(METADATA_MARKER))
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| FxError::no_data(format!("{}: missing '{}' column", path.display(), name)))
    };
    let time_idx = column("time")?;
    let open_idx = column("open")?;
    let high_idx = column("high")?;
    let low_idx = column("low")?;
    let close_idx = column("close")?;
    let volume_idx = column("volume")?;
    let complete_idx = column("complete").ok();

    let mut candles = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        let row = row_idx + 1;
        let record = match result {
            Ok(record) => record,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                return Err(FxError::no_data(format!(
                    "{} row {}: {}",
                    path.display(),
                    row,
                    e
                )))
            }
        };
        let field = |idx: usize| record.get(idx).unwrap_or("").trim();
        let bad_row = |what: &str, value: &str| {
            FxError::no_data(format!(
                "{} row {}: invalid {} '{}'",
                path.display(),
                row,
                what,
                value
            ))
        };
        let price = |idx: usize, name: &str| -> FxResult<f64> {
            let raw = field(idx);
            raw.parse::<f64>().map_err(|_| bad_row(name, raw))
        };

        let raw_time = field(time_idx);
        let time = parse_stored_time(raw_time).ok_or_else(|| bad_row("time", raw_time))?;

        let raw_volume = field(volume_idx);
        let volume = raw_volume
            .parse::<u64>()
            .or_else(|_| raw_volume.parse::<f64>().map(|v| v.max(0.0) as u64))
            .map_err(|_| bad_row("volume", raw_volume))?;

        let complete = match complete_idx.map(field) {
            None | Some("") => true,
            Some(raw) => match raw.to_lowercase().as_str() {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => return Err(bad_row("complete", raw)),
            },
        };

        let candle = Candle::new(
            time,
            price(open_idx, "open")?,
            price(high_idx, "high")?,
            price(low_idx, "low")?,
            price(close_idx, "close")?,
            volume,
            complete,
        )
        .map_err(|e| FxError::no_data(format!("{} row {}: {}", path.display(), row, e)))?;

        candles.push(candle);
    }

    candles.sort_by_key(|c| c.time);
    Ok(candles)
}

fn parse_stored_time(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = parse_date(s) {
        return Some(dt);
    }
    // "2024-01-01 00:00:00+00:00"
    DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z")
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|ndt| ndt.and_utc())
        })
}
