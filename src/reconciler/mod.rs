mod deletion_plan;

pub use deletion_plan::DeletionPlan;
