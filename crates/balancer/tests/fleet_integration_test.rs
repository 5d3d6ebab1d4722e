/// Integration tests driving a whole fleet through long runs of arrivals,
/// ticks, rebalance passes, threshold recalculation and power management.

use elastic_balancer::{Fleet, LoadState, RebalanceOutcome, SubmitOutcome, Task};
use elastic_core::BalancerConfig;

// ============================================================================
// Test Helpers
// ============================================================================

/// Deterministic task sizes in 2..=101 from a linear congruential sequence.
struct Sizes(u64);

impl Sizes {
    fn next(&mut self) -> u8 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (2 + (self.0 >> 33) % 100) as u8
    }
}

fn make_config(node_count: usize, recalculate_every: usize) -> BalancerConfig {
    BalancerConfig {
        node_count,
        recalculate_every,
        ..Default::default()
    }
}

/// Structural invariants that must hold between any two operations.
fn check_invariants(fleet: &Fleet, submitted: u64) {
    assert!(fleet.is_ordered(), "registry out of order");
    assert!(fleet.reconcile().is_empty(), "drift: {:?}", fleet.reconcile());
    assert_eq!(fleet.off_count(), fleet.count_in_state(LoadState::Off));
    assert!(fleet.off_count() < fleet.len(), "every node powered off");

    for node in fleet.nodes_by_load() {
        assert!(node.queue().is_consistent(), "node {} queue inconsistent", node.id());
        assert!(node.occupancy() <= fleet.queue_capacity());
        if node.is_off() {
            assert_eq!(node.occupancy(), 0, "off node {} holds tasks", node.id());
        }
    }

    let counters = fleet.counters();
    assert_eq!(counters.tasks_accepted + counters.tasks_lost, submitted);
    assert_eq!(counters.in_flight() as usize, fleet.total_queued());
    assert_eq!(fleet.task_book().len(), fleet.total_queued());
}

/// One driver step: optional rebalance, one arrival, one tick, one sample,
/// optional recalculation, then power management.
fn drive(fleet: &mut Fleet, config: &BalancerConfig, step: usize, task: Task) -> SubmitOutcome {
    if step % config.rebalance_every == 0 {
        fleet.run_rebalance_pass().unwrap();
    }
    let outcome = fleet.submit_task(task);
    fleet.advance_tick(config.tick_value);
    fleet.sample_utilization();
    if config.recalculate_every > 0 && step > 0 && step % config.recalculate_every == 0 {
        fleet.recalculate_thresholds(config.sensitivity).unwrap();
    }
    fleet.maintain_power();
    outcome
}

// ============================================================================
// Driver Loop
// ============================================================================

#[test]
fn test_thousand_task_run_keeps_invariants() {
    let config = make_config(5, 0);
    let mut fleet = Fleet::new(&config).unwrap();
    let mut sizes = Sizes(7);

    for step in 0..1000 {
        drive(&mut fleet, &config, step, Task::new(step as u32, sizes.next()));
        check_invariants(&fleet, step as u64 + 1);
    }

    let counters = fleet.counters();
    assert_eq!(counters.tasks_accepted + counters.tasks_lost, 1000);
    assert!(counters.tasks_completed > 0);
}

#[test]
fn test_adaptive_thresholds_keep_invariants() {
    let config = make_config(8, 50);
    let mut fleet = Fleet::new(&config).unwrap();
    let mut sizes = Sizes(42);

    for step in 0..1500 {
        drive(&mut fleet, &config, step, Task::new(step as u32, sizes.next()));
        check_invariants(&fleet, step as u64 + 1);
        let t = fleet.thresholds();
        assert!(t.underload_bound <= t.overload_bound);
        assert!(t.underload_bound <= config.underload_ceiling);
    }
}

#[test]
fn test_light_load_consolidates_idle_nodes() {
    let config = make_config(6, 0);
    let mut fleet = Fleet::new(&config).unwrap();

    // tiny tasks complete every tick, so the fleet stays nearly idle
    for step in 0..200 {
        drive(&mut fleet, &config, step, Task::new(step as u32, 2));
        check_invariants(&fleet, step as u64 + 1);
    }

    assert!(fleet.off_count() > 0, "idle fleet never consolidated");
    assert!(fleet.has_reserve(), "consolidation removed the last reserve");
    assert_eq!(fleet.counters().tasks_lost, 0);
}

#[test]
fn test_heavy_load_restores_reserves() {
    let config = make_config(4, 0);
    let mut fleet = Fleet::new(&config).unwrap();

    // idle phase powers nodes off
    for step in 0..100 {
        drive(&mut fleet, &config, step, Task::new(step as u32, 2));
    }
    let off_after_idle = fleet.off_count();
    assert!(off_after_idle > 0);

    // huge tasks pile up faster than they complete
    for step in 100..400 {
        drive(&mut fleet, &config, step, Task::new(step as u32, 101));
        check_invariants(&fleet, step as u64 + 1);
    }
    assert!(fleet.off_count() < off_after_idle, "no node was powered back on");
}

// ============================================================================
// Saturation
// ============================================================================

#[test]
fn test_saturated_fleet_loses_tasks_without_corruption() {
    let config = make_config(2, 0);
    let mut fleet = Fleet::new(&config).unwrap();

    let mut lost = 0;
    for id in 0..150u32 {
        if fleet.submit_task(Task::new(id, 101)).is_lost() {
            lost += 1;
        }
        check_invariants(&fleet, id as u64 + 1);
    }

    assert_eq!(lost, 50);
    assert_eq!(fleet.total_queued(), 100);
    assert_eq!(fleet.count_in_state(LoadState::Full), 2);
    let lowest = fleet.nodes_by_load().next().unwrap().id();
    assert_eq!(
        fleet.run_rebalance_pass().unwrap(),
        RebalanceOutcome::NoTarget { source: lowest }
    );
}

#[test]
fn test_drain_empties_every_queue() {
    let config = make_config(3, 0);
    let mut fleet = Fleet::new(&config).unwrap();
    for id in 0..90u32 {
        fleet.submit_task(Task::new(id, 10));
    }

    let mut completions = 0;
    while fleet.total_queued() > 0 {
        completions += fleet.advance_tick(1_000).len();
    }

    assert_eq!(completions, 90);
    assert!(fleet.task_book().is_empty());
    assert!(fleet.nodes_by_load().all(|n| n.completion_estimate().abs() < 1e-6));
    assert_eq!(fleet.count_in_state(LoadState::Underloaded), 3);
}

#[test]
fn test_tick_scheduler_reports_one_completion_per_node() {
    let config = make_config(3, 0);
    let mut fleet = Fleet::new(&config).unwrap();
    for id in 0..30u32 {
        fleet.submit_task(Task::new(id, 2));
    }

    // 8 units per task, a huge tick still only finishes the head task
    let done = fleet.advance_tick(u64::MAX);
    assert_eq!(done.len(), 3);
    assert_eq!(fleet.total_queued(), 27);
}
