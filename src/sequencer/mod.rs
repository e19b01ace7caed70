mod machine;
mod task;

pub use machine::{Notification, RunReport, TaskSequencer};
pub use task::{ConditionKind, Phase, TaskDefinition};
