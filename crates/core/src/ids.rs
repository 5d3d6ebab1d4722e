pub type NodeId = u32;
pub type TaskId = u32;
