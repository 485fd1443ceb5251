mod message;
pub mod constants;
pub mod elapsed;
pub mod snapshot;

// re-export for convenient use with `message`
pub use colored::Colorize;
pub use snapshot::{JobStatus, PipelineSnapshot, SnapshotError};
