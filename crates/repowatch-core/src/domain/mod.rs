//! Domain model (tasks, deltas, state, outcomes, errors).

pub mod cost;
pub mod delta;
pub mod errors;
pub mod ids;
pub mod outcome;
pub mod repo_state;
pub mod task;

pub use cost::CostInfo;
pub use delta::{ChangeKind, ChangeRecord, Cursors, Delta, filter_since};
pub use errors::{ConfigError, ErrorKind, PersistError, RunError, TaskError};
pub use ids::RunId;
pub use outcome::{RenderStats, RunReport, TaskOutcome, TaskStatus};
pub use repo_state::{RepoState, StateDocument};
pub use task::{Endpoint, RepoKey, RepoTask, TaskMode, parse_owner_repo};
