use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, warn};

use elastic_balancer::{BalancerError, Counters, Fleet, FleetSnapshot, RebalanceOutcome, Task};
use elastic_core::{BalancerConfig, TaskId};

/// Smallest and largest task size drawn by the workload generator.
pub const MIN_TASK_SIZE: u8 = 2;
pub const MAX_TASK_SIZE: u8 = 101;

/// Totals for one simulation run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub tasks: usize,
    pub seed: u64,
    pub counters: Counters,
    pub rebalance_passes: usize,
    pub recalculations: usize,
    pub power_ons: usize,
    pub snapshot: FleetSnapshot,
}

/// Drives a fleet with a seeded random workload, one task per step.
pub struct Driver {
    config: BalancerConfig,
    fleet: Fleet,
    rng: StdRng,
    seed: u64,
    rebalance_passes: usize,
    recalculations: usize,
    power_ons: usize,
}

impl Driver {
    pub fn new(config: BalancerConfig, seed: u64) -> Result<Self, BalancerError> {
        let fleet = Fleet::new(&config)?;
        Ok(Self {
            config,
            fleet,
            rng: StdRng::seed_from_u64(seed),
            seed,
            rebalance_passes: 0,
            recalculations: 0,
            power_ons: 0,
        })
    }

    /// One step: periodic rebalance, one arrival, one tick, one utilization
    /// sample, periodic threshold recalculation, then power management.
    pub fn step(&mut self, step: usize) -> Result<(), BalancerError> {
        if step % self.config.rebalance_every == 0 {
            self.rebalance()?;
        }

        let size = self.rng.gen_range(MIN_TASK_SIZE..=MAX_TASK_SIZE);
        let task = Task::new(step as TaskId, size);
        if self.fleet.submit_task(task).is_lost() {
            debug!(task = task.id, size, "fleet saturated");
        }

        self.fleet.advance_tick(self.config.tick_value);
        self.fleet.sample_utilization();

        let every = self.config.recalculate_every;
        if every > 0 && step > 0 && step % every == 0 {
            match self.fleet.recalculate_thresholds(self.config.sensitivity) {
                Ok(_) => self.recalculations += 1,
                Err(BalancerError::EmptyHistory) => {}
                Err(e) => return Err(e),
            }
        }

        if self.fleet.maintain_power().is_some() {
            self.power_ons += 1;
        }
        Ok(())
    }

    /// Run `tasks` steps and report the totals.
    pub fn run(mut self, tasks: usize) -> Result<RunReport, BalancerError> {
        for step in 0..tasks {
            self.step(step)?;
        }

        let counters = self.fleet.counters();
        info!(
            tasks,
            lost = counters.tasks_lost,
            completed = counters.tasks_completed,
            migrations = counters.migrations,
            off_nodes = counters.off_nodes,
            "simulation finished"
        );
        let drift = self.fleet.reconcile();
        if !drift.is_empty() {
            warn!(nodes = drift.len(), "completion estimates drifted from queue contents");
        }

        Ok(RunReport {
            tasks,
            seed: self.seed,
            counters,
            rebalance_passes: self.rebalance_passes,
            recalculations: self.recalculations,
            power_ons: self.power_ons,
            snapshot: self.fleet.snapshot(),
        })
    }

    fn rebalance(&mut self) -> Result<(), BalancerError> {
        self.rebalance_passes += 1;
        match self.fleet.run_rebalance_pass()? {
            RebalanceOutcome::NoTarget { source } => {
                debug!(source, "rebalance found no target");
            }
            RebalanceOutcome::Idle => {}
            outcome => debug!(?outcome, "rebalance pass"),
        }
        Ok(())
    }
}
