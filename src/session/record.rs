use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One smoothed reading, timestamped relative to session start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub elapsed_seconds: f64,
    pub channels: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("sample {index} has no channels")]
    NoChannels { index: usize },

    #[error("sample {index} has {actual} channels, expected {expected}")]
    ChannelMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("sample {index} at {elapsed}s precedes the previous sample at {previous}s")]
    OutOfOrder {
        index: usize,
        elapsed: f64,
        previous: f64,
    },
}

/// Time-ordered samples of one session
///
/// Only the session controller appends; once handed out the record is
/// read-only. Every sample has the same channel count and `elapsed_seconds`
/// never decreases.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionRecord {
    samples: Vec<Sample>,
}

impl SessionRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from existing samples, checking its invariants
    pub fn from_samples(samples: Vec<Sample>) -> Result<Self, RecordError> {
        let mut record = Self {
            samples: Vec::with_capacity(samples.len()),
        };
        for sample in samples {
            record.append(sample)?;
        }
        Ok(record)
    }

    pub(crate) fn append(&mut self, sample: Sample) -> Result<(), RecordError> {
        let index = self.samples.len();

        if sample.channels.is_empty() {
            return Err(RecordError::NoChannels { index });
        }

        if let Some(last) = self.samples.last() {
            if sample.channels.len() != last.channels.len() {
                return Err(RecordError::ChannelMismatch {
                    index,
                    expected: last.channels.len(),
                    actual: sample.channels.len(),
                });
            }
            // NaN compares false here too, which rejects it
            if !(sample.elapsed_seconds >= last.elapsed_seconds) {
                return Err(RecordError::OutOfOrder {
                    index,
                    elapsed: sample.elapsed_seconds,
                    previous: last.elapsed_seconds,
                });
            }
        }

        self.samples.push(sample);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    /// `None` for an empty record
    pub fn channel_count(&self) -> Option<usize> {
        self.samples.first().map(|s| s.channels.len())
    }

    pub fn last_elapsed(&self) -> Option<f64> {
        self.samples.last().map(|s| s.elapsed_seconds)
    }
}

impl<'a> IntoIterator for &'a SessionRecord {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}
