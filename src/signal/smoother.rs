use std::collections::VecDeque;

/// Per-channel moving average over the last `window` raw values
///
/// Before the window fills, the mean covers whatever has arrived so far.
#[derive(Debug, Clone)]
pub struct Smoother {
    window: usize,
    buffers: Vec<VecDeque<i64>>,
}

impl Smoother {
    /// A window of 0 is treated as 1 (no smoothing).
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            buffers: Vec::new(),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Number of channels seen so far
    pub fn channel_count(&self) -> usize {
        self.buffers.len()
    }

    /// Push one raw value and return the channel's smoothed value
    pub fn push(&mut self, channel_index: usize, raw_value: i64) -> i64 {
        if channel_index >= self.buffers.len() {
            // Buffers grow to at most `window` as values arrive
            self.buffers.resize_with(channel_index + 1, VecDeque::new);
        }

        let buffer = &mut self.buffers[channel_index];
        if buffer.len() >= self.window {
            buffer.pop_front();
        }
        buffer.push_back(raw_value);

        truncated_mean(buffer)
    }

    /// Smooth a whole sample, one value per channel
    pub fn smooth(&mut self, raw: &[i64]) -> Vec<i64> {
        raw.iter()
            .enumerate()
            .map(|(channel, &value)| self.push(channel, value))
            .collect()
    }

    pub fn reset(&mut self) {
        self.buffers.clear();
    }
}

fn truncated_mean(values: &VecDeque<i64>) -> i64 {
    if values.is_empty() {
        return 0;
    }
    let sum: i128 = values.iter().map(|&v| v as i128).sum();
    (sum / values.len() as i128) as i64
}
