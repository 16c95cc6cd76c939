//! Plan documents on disk.

mod loader;

pub use loader::{PlanLoadError, PlanLoadReport, load_plan_dirs, load_plan_file, load_plan_file_as};
