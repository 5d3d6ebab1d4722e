use std::collections::VecDeque;

use elastic_balancer::{Fleet, LoadState, QueueError, Task, TaskQueue};
use elastic_core::BalancerConfig;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum QueueOp {
    Enqueue,
    DequeueFront,
    DequeueTail,
}

fn arb_queue_op() -> impl Strategy<Value = QueueOp> {
    prop_oneof![
        3 => Just(QueueOp::Enqueue),
        1 => Just(QueueOp::DequeueFront),
        1 => Just(QueueOp::DequeueTail),
    ]
}

#[derive(Debug, Clone)]
enum FleetOp {
    Submit(u8),
    Tick(u64),
    Rebalance,
    Move(u32, u32),
    Sample,
    Recalculate,
    Power,
}

fn arb_fleet_op() -> impl Strategy<Value = FleetOp> {
    prop_oneof![
        6 => (2u8..=101).prop_map(FleetOp::Submit),
        3 => (1u64..200_000).prop_map(FleetOp::Tick),
        2 => Just(FleetOp::Rebalance),
        1 => (0u32..6, 0u32..6).prop_map(|(a, b)| FleetOp::Move(a, b)),
        1 => Just(FleetOp::Sample),
        1 => Just(FleetOp::Recalculate),
        1 => Just(FleetOp::Power),
    ]
}

// ── Queue occupancy matches a reference deque ────────────────────────────

proptest! {
    #[test]
    fn queue_matches_reference_model(
        capacity in 1usize..12,
        ops in prop::collection::vec(arb_queue_op(), 0..200),
    ) {
        let mut queue = TaskQueue::new(capacity);
        let mut model: VecDeque<u32> = VecDeque::new();
        let mut next_id = 0u32;

        for op in ops {
            match op {
                QueueOp::Enqueue => {
                    let result = queue.enqueue(next_id);
                    if model.len() == capacity {
                        prop_assert_eq!(result, Err(QueueError::Full));
                    } else {
                        prop_assert_eq!(result, Ok(()));
                        model.push_back(next_id);
                    }
                    next_id += 1;
                }
                QueueOp::DequeueFront => {
                    prop_assert_eq!(queue.dequeue_front().ok(), model.pop_front());
                }
                QueueOp::DequeueTail => {
                    prop_assert_eq!(queue.dequeue_tail().ok(), model.pop_back());
                }
            }

            prop_assert!(queue.is_consistent());
            prop_assert_eq!(queue.len(), model.len());
            prop_assert_eq!(queue.is_empty(), model.is_empty());
            prop_assert_eq!(queue.is_full(), model.len() == capacity);
            prop_assert_eq!(queue.front(), model.front().copied());
            prop_assert_eq!(queue.back(), model.back().copied());
            let contents: Vec<u32> = queue.iter().collect();
            let expected: Vec<u32> = model.iter().copied().collect();
            prop_assert_eq!(contents, expected);
        }
    }
}

// ── Fleet ordering and accounting under arbitrary operations ─────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn fleet_stays_ordered_and_reconciled(
        ops in prop::collection::vec(arb_fleet_op(), 1..300),
    ) {
        let config = BalancerConfig { node_count: 6, queue_capacity: 10, ..Default::default() };
        let powers = [0.5, 0.75, 1.0, 1.25, 1.5, 1.0];
        let mut fleet = Fleet::initialize(&config, |id| powers[id as usize]).unwrap();
        let mut next_id = 0u32;

        for op in ops {
            match op {
                FleetOp::Submit(size) => {
                    fleet.submit_task(Task::new(next_id, size));
                    next_id += 1;
                }
                FleetOp::Tick(tick) => {
                    fleet.advance_tick(tick);
                }
                FleetOp::Rebalance => {
                    prop_assert!(fleet.run_rebalance_pass().is_ok());
                }
                FleetOp::Move(a, b) => {
                    let _ = fleet.move_one_task(a, b);
                }
                FleetOp::Sample => {
                    fleet.sample_utilization();
                }
                FleetOp::Recalculate => {
                    let _ = fleet.recalculate_thresholds(config.sensitivity);
                }
                FleetOp::Power => {
                    fleet.maintain_power();
                }
            }

            prop_assert!(fleet.is_ordered());
            prop_assert!(fleet.reconcile().is_empty());
            prop_assert_eq!(fleet.off_count(), fleet.count_in_state(LoadState::Off));
            prop_assert_eq!(fleet.task_book().len(), fleet.total_queued());
            let counters = fleet.counters();
            prop_assert_eq!(counters.tasks_accepted + counters.tasks_lost, next_id as u64);
            for node in fleet.nodes_by_load() {
                prop_assert!(node.queue().is_consistent());
                prop_assert!(!node.is_off() || node.occupancy() == 0);
            }
        }
    }
}
