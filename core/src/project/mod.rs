//! Project model: the project file shape, duplicate-entry merging and loading.

mod load;
mod merge;
mod types;

pub use load::{load_projects, parse_projects};
pub use merge::ProjectSet;
pub use types::{Project, ProjectSource, ProjectsFile, StackDefinition, AWS_PROFILE_VAR};
