use crate::types::{LoadState, Thresholds};

/// Classify a node's load from its queue occupancy.
///
/// Checks run in a fixed order: an Off node stays Off, a full queue is Full
/// even when it also exceeds the overload bound, then the overload and
/// underload bounds are compared against `capacity × bound`.
pub fn classify(
    occupancy: usize,
    capacity: usize,
    thresholds: &Thresholds,
    current: LoadState,
) -> LoadState {
    if current == LoadState::Off {
        LoadState::Off
    } else if occupancy == capacity {
        LoadState::Full
    } else if occupancy as f64 > capacity as f64 * thresholds.overload_bound {
        LoadState::Overloaded
    } else if (occupancy as f64) < capacity as f64 * thresholds.underload_bound {
        LoadState::Underloaded
    } else {
        LoadState::Balanced
    }
}
