use thiserror::Error;

/// Shape of one reading on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineFormat {
    /// One integer per line (USB serial firmware)
    Single,
    /// Several integers joined by a delimiter (Wi-Fi firmware)
    Delimited(char),
}

impl LineFormat {
    pub const CSV: Self = Self::Delimited(',');
}

/// Why a line was dropped
///
/// Malformed lines are skipped by the session, never propagated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Malformed {
    #[error("empty line")]
    Empty,

    #[error("field {index} is not an integer: {field:?}")]
    BadField { index: usize, field: String },

    #[error("expected {expected} channels, got {actual}")]
    ChannelMismatch { expected: usize, actual: usize },
}

/// Parse one raw line into channel values.
///
/// Undecodable bytes are replaced rather than rejected, surrounding
/// whitespace is ignored, and `expected_channels` (once known) must match.
pub fn parse_line(
    raw: &[u8],
    format: LineFormat,
    expected_channels: Option<usize>,
) -> Result<Vec<i64>, Malformed> {
    let text = String::from_utf8_lossy(raw);
    let text = text.trim();
    if text.is_empty() {
        return Err(Malformed::Empty);
    }

    let values = match format {
        LineFormat::Single => vec![parse_field(0, text)?],
        LineFormat::Delimited(delimiter) => text
            .split(delimiter)
            .enumerate()
            .map(|(index, field)| parse_field(index, field.trim()))
            .collect::<Result<Vec<_>, _>>()?,
    };

    if let Some(expected) = expected_channels {
        if values.len() != expected {
            return Err(Malformed::ChannelMismatch {
                expected,
                actual: values.len(),
            });
        }
    }

    Ok(values)
}

fn parse_field(index: usize, field: &str) -> Result<i64, Malformed> {
    field.parse::<i64>().map_err(|_| Malformed::BadField {
        index,
        field: field.to_string(),
    })
}

/// Stateful parser that locks the channel count to the first good line
#[derive(Debug, Clone)]
pub struct LineParser {
    format: LineFormat,
    expected_channels: Option<usize>,
}

impl LineParser {
    pub fn new(format: LineFormat) -> Self {
        Self {
            format,
            expected_channels: None,
        }
    }

    /// Channel count established by the first successfully parsed line
    pub fn expected_channels(&self) -> Option<usize> {
        self.expected_channels
    }

    pub fn parse(&mut self, raw: &[u8]) -> Result<Vec<i64>, Malformed> {
        let values = parse_line(raw, self.format, self.expected_channels)?;
        self.expected_channels.get_or_insert(values.len());
        Ok(values)
    }
}
