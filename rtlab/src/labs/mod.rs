//! Ready-made wiring of the lab exercises.

pub mod queue_lab;
pub mod sync_lab;

pub use queue_lab::QueueLab;
pub use sync_lab::SyncLab;
