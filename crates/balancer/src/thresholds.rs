//! Adaptive overload/underload bounds.
//!
//! Utilization samples go into a fixed-length rolling window. A
//! recalculation sets `overload = mean + k·σ` and
//! `underload = min(ceiling, mean − k·σ)`. The ceiling only caps the
//! underload bound; it can drop below zero, in which case no node is ever
//! classified Underloaded by occupancy.

use std::collections::VecDeque;

use tracing::info;

use crate::types::Thresholds;

/// Fixed-length rolling window of utilization samples.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a sample, evicting the oldest if at capacity.
    pub fn push(&mut self, sample: f64) {
        if self.capacity == 0 {
            return;
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate over samples from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.samples.iter()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
    }

    /// Population standard deviation.
    pub fn stddev(&self) -> Option<f64> {
        let mean = self.mean()?;
        let variance = self.samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
            / self.samples.len() as f64;
        Some(variance.sqrt())
    }
}

#[derive(Debug, Clone)]
pub struct ThresholdAdapter {
    history: HistoryBuffer,
    underload_ceiling: f64,
}

impl ThresholdAdapter {
    pub fn new(history_len: usize, underload_ceiling: f64) -> Self {
        Self {
            history: HistoryBuffer::new(history_len),
            underload_ceiling,
        }
    }

    pub fn record(&mut self, sample: f64) {
        self.history.push(sample);
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    /// Compute new bounds from the window. `None` when no samples exist.
    pub fn recalculate(&self, sensitivity: f64) -> Option<Thresholds> {
        let mean = self.history.mean()?;
        let spread = sensitivity * self.history.stddev()?;
        let thresholds = Thresholds::new(
            mean + spread,
            (mean - spread).min(self.underload_ceiling),
        );
        info!(
            mean,
            spread,
            samples = self.history.len(),
            overload = thresholds.overload_bound,
            underload = thresholds.underload_bound,
            "recalculated load bounds"
        );
        Some(thresholds)
    }
}
