use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use super::record::SessionRecord;
use crate::signal::{Classification, ClassificationMetric, Classifier};

/// Descriptive statistics for one channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelStats {
    /// Zero-based channel index
    pub channel: usize,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation, `None` with fewer than two samples
    pub std: Option<f64>,
    pub min: i64,
    pub max: i64,
}

/// Summary of one session record
///
/// Always derived from a record, never updated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionSummary {
    /// The record holds no samples
    NoData { saved_path: Option<PathBuf> },

    Recorded {
        sample_count: usize,
        /// Largest smoothed value on any channel
        max_force: i64,
        /// Truncated mean over every channel value
        mean_force: i64,
        /// In-band percentage or press count, by classification
        metric: ClassificationMetric,
        /// Elapsed time of the last sample
        duration_seconds: f64,
        channels: Vec<ChannelStats>,
        saved_path: Option<PathBuf>,
    },
}

impl SessionSummary {
    /// Compute the summary over the full record
    pub fn compute(record: &SessionRecord, classification: Classification) -> Self {
        let (Some(channel_count), Some(duration_seconds)) =
            (record.channel_count(), record.last_elapsed())
        else {
            return Self::NoData { saved_path: None };
        };

        let mut classifier = Classifier::new(classification);
        let mut max_force = i64::MIN;
        let mut total: i128 = 0;
        let mut values = 0usize;

        for sample in record {
            classifier.classify(&sample.channels);
            for &v in &sample.channels {
                max_force = max_force.max(v);
                total += v as i128;
                values += 1;
            }
        }

        let channels = (0..channel_count)
            .map(|channel| channel_stats(record, channel))
            .collect();

        Self::Recorded {
            sample_count: record.len(),
            max_force,
            mean_force: (total / values as i128) as i64,
            metric: classifier.metric(),
            duration_seconds,
            channels,
            saved_path: None,
        }
    }

    pub fn with_saved_path(mut self, path: impl Into<PathBuf>) -> Self {
        match &mut self {
            Self::NoData { saved_path } | Self::Recorded { saved_path, .. } => {
                *saved_path = Some(path.into());
            }
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::NoData { .. })
    }

    pub fn sample_count(&self) -> usize {
        match self {
            Self::NoData { .. } => 0,
            Self::Recorded { sample_count, .. } => *sample_count,
        }
    }

    pub fn metric(&self) -> Option<ClassificationMetric> {
        match self {
            Self::NoData { .. } => None,
            Self::Recorded { metric, .. } => Some(*metric),
        }
    }

    pub fn saved_path(&self) -> Option<&Path> {
        match self {
            Self::NoData { saved_path } | Self::Recorded { saved_path, .. } => {
                saved_path.as_deref()
            }
        }
    }
}

fn channel_stats(record: &SessionRecord, channel: usize) -> ChannelStats {
    let values: Vec<i64> = record.iter().map(|s| s.channels[channel]).collect();
    let count = values.len();
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / count as f64;
    let std = (count > 1).then(|| {
        let var = values
            .iter()
            .map(|&v| (v as f64 - mean).powi(2))
            .sum::<f64>()
            / (count - 1) as f64;
        var.sqrt()
    });

    ChannelStats {
        channel,
        count,
        mean,
        std,
        min: values.iter().copied().min().unwrap_or_default(),
        max: values.iter().copied().max().unwrap_or_default(),
    }
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoData { .. } => writeln!(f, "No data collected")?,
            Self::Recorded {
                sample_count,
                max_force,
                mean_force,
                metric,
                duration_seconds,
                channels,
                ..
            } => {
                writeln!(f, "Samples:    {}", sample_count)?;
                writeln!(f, "Duration:   {:.1} s", duration_seconds)?;
                writeln!(f, "Max force:  {}", max_force)?;
                writeln!(f, "Mean force: {}", mean_force)?;
                writeln!(f, "Result:     {}", metric)?;
                for stats in channels {
                    writeln!(
                        f,
                        "  F{}: mean {:.1}, std {}, min {}, max {}",
                        stats.channel + 1,
                        stats.mean,
                        stats
                            .std
                            .map(|s| format!("{:.1}", s))
                            .unwrap_or_else(|| "-".to_string()),
                        stats.min,
                        stats.max
                    )?;
                }
            }
        }

        if let Some(path) = self.saved_path() {
            writeln!(f, "Saved to:   {}", path.display())?;
        }
        Ok(())
    }
}
