use serde::{Deserialize, Serialize};
use std::fmt;

/// Clinician-defined target for a session
///
/// In config files this is either `{ min = .., max = .. }` or
/// `{ threshold = .. }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Classification {
    /// Inclusive force range every channel should stay in
    Band { min: i64, max: i64 },
    /// Force any channel must reach for a press
    Threshold {
        #[serde(rename = "threshold")]
        value: i64,
    },
}

impl Default for Classification {
    fn default() -> Self {
        Self::Threshold { value: 2000 }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Band { min, max } => write!(f, "band [{}, {}]", min, max),
            Self::Threshold { value } => write!(f, "threshold >= {}", value),
        }
    }
}

/// Running result of classifying a stream of smoothed samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassificationMetric {
    InBand { in_band: usize, total: usize },
    Presses { count: usize },
}

impl ClassificationMetric {
    /// In-band share as a percentage rounded to one decimal
    ///
    /// `None` for threshold sessions and before any sample was seen.
    pub fn percent_in_band(&self) -> Option<f64> {
        match *self {
            Self::InBand { total: 0, .. } | Self::Presses { .. } => None,
            Self::InBand { in_band, total } => {
                let pct = in_band as f64 * 100.0 / total as f64;
                Some((pct * 10.0).round() / 10.0)
            }
        }
    }

    pub fn press_count(&self) -> Option<usize> {
        match *self {
            Self::Presses { count } => Some(count),
            Self::InBand { .. } => None,
        }
    }
}

impl fmt::Display for ClassificationMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self, self.percent_in_band()) {
            (Self::InBand { .. }, Some(pct)) => write!(f, "{:.1}% in band", pct),
            (Self::InBand { .. }, None) => f.write_str("no samples in band yet"),
            (Self::Presses { count }, _) => write!(f, "{} press events", count),
        }
    }
}

/// Classifies smoothed samples against the session's band or threshold
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classifier {
    Band {
        min: i64,
        max: i64,
        in_band: usize,
        total: usize,
    },
    /// Level-triggered: every sample at or above the threshold counts,
    /// so a sustained squeeze counts once per sample.
    Threshold {
        value: i64,
        presses: usize,
        total: usize,
    },
}

impl Classifier {
    pub fn new(classification: Classification) -> Self {
        match classification {
            Classification::Band { min, max } => Self::Band {
                min,
                max,
                in_band: 0,
                total: 0,
            },
            Classification::Threshold { value } => Self::Threshold {
                value,
                presses: 0,
                total: 0,
            },
        }
    }

    /// Classify one smoothed sample
    ///
    /// Returns whether it was in band (band variant) or a press (threshold
    /// variant).
    pub fn classify(&mut self, channels: &[i64]) -> bool {
        match self {
            Self::Band {
                min,
                max,
                in_band,
                total,
            } => {
                *total += 1;
                let range = *min..=*max;
                let hit = channels.iter().all(|v| range.contains(v));
                if hit {
                    *in_band += 1;
                }
                hit
            }
            Self::Threshold {
                value,
                presses,
                total,
            } => {
                *total += 1;
                let threshold = *value;
                let hit = channels.iter().any(|&v| v >= threshold);
                if hit {
                    *presses += 1;
                }
                hit
            }
        }
    }

    pub fn samples_seen(&self) -> usize {
        match *self {
            Self::Band { total, .. } | Self::Threshold { total, .. } => total,
        }
    }

    pub fn metric(&self) -> ClassificationMetric {
        match *self {
            Self::Band { in_band, total, .. } => ClassificationMetric::InBand { in_band, total },
            Self::Threshold { presses, .. } => ClassificationMetric::Presses { count: presses },
        }
    }
}
