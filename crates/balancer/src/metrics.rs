use serde::Serialize;

/// Fleet counters exposed through snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    /// Tasks relocated between queues.
    pub migrations: u64,
    /// Nodes currently powered off.
    pub off_nodes: usize,
    pub tasks_accepted: u64,
    /// Submissions discarded because the target queue was full.
    pub tasks_lost: u64,
    pub tasks_completed: u64,
}

impl Counters {
    /// Tasks accepted and not yet completed. Migration leaves this unchanged.
    pub fn in_flight(&self) -> u64 {
        self.tasks_accepted - self.tasks_completed
    }

    /// Fraction of submissions that were lost.
    pub fn loss_ratio(&self) -> f64 {
        let submitted = self.tasks_accepted + self.tasks_lost;
        if submitted == 0 {
            0.0
        } else {
            self.tasks_lost as f64 / submitted as f64
        }
    }
}
