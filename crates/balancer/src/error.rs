use thiserror::Error;

use elastic_core::{ElasticError, NodeId, TaskId};

use crate::queue::QueueError;

/// Errors returned by fleet operations.
///
/// `NoTarget` and `EmptyHistory` are expected, recoverable outcomes: the
/// fleet is left unchanged and the caller retries on a later pass.
#[derive(Debug, Error)]
pub enum BalancerError {
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("no eligible migration target for node {source_node}")]
    NoTarget { source_node: NodeId },

    #[error("utilization history is empty")]
    EmptyHistory,

    #[error("node {0} is powered off")]
    NodeOff(NodeId),

    #[error("task {0} is already queued")]
    DuplicateTask(TaskId),

    #[error("node not found: {0}")]
    UnknownNode(NodeId),

    #[error("invalid config: {0}")]
    InvalidConfig(#[from] ElasticError),
}
