use chrono::{DateTime, Local};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::session::{RecordError, Sample, SessionRecord};

/// Header used for the time column of multi-channel files
pub const TIME_HEADER: &str = "time";

/// Header used for the time column of single-channel files
pub const SINGLE_CHANNEL_TIME_HEADER: &str = "time_s";

const FILE_PREFIX: &str = "session_";
const FILE_EXTENSION: &str = "csv";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path}: {reason}")]
    Format { path: PathBuf, reason: String },

    #[error("{path}: {source}")]
    Record {
        path: PathBuf,
        #[source]
        source: RecordError,
    },

    #[error("cannot save an empty session record")]
    EmptyRecord,

    #[error("expected {expected} channel names, got {actual}")]
    ChannelNames { expected: usize, actual: usize },
}

/// Default channel names: `force_adc` for one sensor, `F1..FN` otherwise
pub fn default_channel_names(channel_count: usize) -> Vec<String> {
    if channel_count == 1 {
        vec!["force_adc".to_string()]
    } else {
        (1..=channel_count).map(|i| format!("F{}", i)).collect()
    }
}

/// A session file read back from disk
#[derive(Debug, Clone, PartialEq)]
pub struct SessionFile {
    pub path: PathBuf,
    pub channel_names: Vec<String>,
    pub record: SessionRecord,
}

/// Directory of recorded session files
///
/// Files are CSV with a `time` column (`time_s` for single-channel
/// sessions) followed by one integer column per channel, and are named
/// `session_YYYYmmdd_HHMMSS.csv` after the moment they were saved.
#[derive(Debug, Clone)]
pub struct SessionStore {
    data_dir: PathBuf,
}

impl SessionStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Save a record under a name stamped with the current local time
    pub fn save(
        &self,
        record: &SessionRecord,
        channel_names: &[String],
    ) -> Result<PathBuf, StorageError> {
        self.save_at(record, channel_names, Local::now())
    }

    /// Save a record under a name stamped with `timestamp`
    ///
    /// If a file with that name already exists, `_1`, `_2`, ... is appended.
    pub fn save_at(
        &self,
        record: &SessionRecord,
        channel_names: &[String],
        timestamp: DateTime<Local>,
    ) -> Result<PathBuf, StorageError> {
        let channel_count = record.channel_count().ok_or(StorageError::EmptyRecord)?;
        if channel_names.len() != channel_count {
            return Err(StorageError::ChannelNames {
                expected: channel_count,
                actual: channel_names.len(),
            });
        }

        fs::create_dir_all(&self.data_dir).map_err(|source| StorageError::Io {
            path: self.data_dir.clone(),
            source,
        })?;

        let stem = timestamp.format("session_%Y%m%d_%H%M%S").to_string();
        let (path, file) = self.create_unique(&stem)?;

        let csv_err = |source| StorageError::Csv {
            path: path.clone(),
            source,
        };

        let mut writer = csv::Writer::from_writer(file);
        let time_header = if channel_count == 1 {
            SINGLE_CHANNEL_TIME_HEADER
        } else {
            TIME_HEADER
        };
        writer
            .write_record(std::iter::once(time_header).chain(channel_names.iter().map(String::as_str)))
            .map_err(csv_err)?;

        for sample in record {
            let row = std::iter::once(sample.elapsed_seconds.to_string())
                .chain(sample.channels.iter().map(|v| v.to_string()));
            writer.write_record(row).map_err(csv_err)?;
        }

        writer.flush().map_err(|source| StorageError::Io {
            path: path.clone(),
            source,
        })?;

        info!("Session saved to {} ({} samples)", path.display(), record.len());

        Ok(path)
    }

    fn create_unique(&self, stem: &str) -> Result<(PathBuf, File), StorageError> {
        let mut suffix = 0u32;
        loop {
            let name = if suffix == 0 {
                format!("{}.{}", stem, FILE_EXTENSION)
            } else {
                format!("{}_{}.{}", stem, suffix, FILE_EXTENSION)
            };
            let path = self.data_dir.join(name);

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    debug!("{} exists, trying next suffix", path.display());
                    suffix += 1;
                }
                Err(source) => return Err(StorageError::Io { path, source }),
            }
        }
    }

    /// Load a session file back into a record
    pub fn load(path: impl AsRef<Path>) -> Result<SessionRecord, StorageError> {
        Ok(Self::load_file(path)?.record)
    }

    /// Load a session file along with its channel names
    pub fn load_file(path: impl AsRef<Path>) -> Result<SessionFile, StorageError> {
        let path = path.as_ref().to_path_buf();
        let csv_err = |source| StorageError::Csv {
            path: path.clone(),
            source,
        };
        let format_err = |reason: String| StorageError::Format {
            path: path.clone(),
            reason,
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(&path)
            .map_err(csv_err)?;

        let headers = reader.headers().map_err(csv_err)?.clone();
        let mut columns = headers.iter();
        match columns.next() {
            Some(TIME_HEADER) | Some(SINGLE_CHANNEL_TIME_HEADER) => {}
            other => {
                return Err(format_err(format!(
                    "first column must be '{}' or '{}', found {:?}",
                    TIME_HEADER, SINGLE_CHANNEL_TIME_HEADER, other
                )))
            }
        }
        let channel_names: Vec<String> = columns.map(str::to_string).collect();
        if channel_names.is_empty() {
            return Err(format_err("no channel columns".to_string()));
        }

        let mut samples = Vec::new();
        for (row, result) in reader.records().enumerate() {
            let fields = result.map_err(csv_err)?;
            let line = row + 2;

            let elapsed_seconds = fields
                .get(0)
                .and_then(|t| t.parse::<f64>().ok())
                .ok_or_else(|| format_err(format!("line {}: invalid time value", line)))?;

            let channels = fields
                .iter()
                .skip(1)
                .map(|v| v.parse::<i64>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| format_err(format!("line {}: invalid channel value: {}", line, e)))?;

            samples.push(Sample {
                elapsed_seconds,
                channels,
            });
        }

        let record = SessionRecord::from_samples(samples).map_err(|source| StorageError::Record {
            path: path.clone(),
            source,
        })?;

        debug!("Loaded {} samples from {}", record.len(), path.display());

        Ok(SessionFile {
            path,
            channel_names,
            record,
        })
    }

    /// Saved session files, oldest first
    pub fn list(&self) -> Result<Vec<PathBuf>, StorageError> {
        let entries = match fs::read_dir(&self.data_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.data_dir.clone(),
                    source,
                })
            }
        };

        let mut files = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|source| StorageError::Io {
                    path: self.data_dir.clone(),
                    source,
                })?
                .path();

            let is_session = path.is_file()
                && path.extension().and_then(|e| e.to_str()) == Some(FILE_EXTENSION)
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(FILE_PREFIX));
            if is_session {
                files.push(path);
            }
        }

        files.sort_by_cached_key(|path| listing_key(path));
        Ok(files)
    }
}

/// Orders `session_<date>_<time>[_N].csv` by timestamp, then by the numeric
/// collision suffix, so `_10` follows `_9`
fn listing_key(path: &Path) -> (String, u64, String) {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();

    // The suffix, if any, follows the third underscore
    match stem.match_indices('_').nth(2) {
        Some((i, _)) => {
            let suffix = stem[i + 1..].parse().unwrap_or(u64::MAX);
            (stem[..i].to_string(), suffix, stem)
        }
        None => (stem.clone(), 0, stem),
    }
}
