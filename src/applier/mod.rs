//! Applies a deletion plan and a current snapshot to a target directory.

mod applier;
mod apply_report;
mod group_ownership;
mod materialize_mode;
mod path_state;

pub use applier::{Applier, ApplyError};
pub use apply_report::ApplyReport;
pub use group_ownership::{GroupOwnership, group_ownership_for};
pub use materialize_mode::MaterializeMode;
pub use path_state::PathState;
