//! Process and file system helpers shared by the pipelines.

pub mod fs;
pub mod process;

pub use fs::{atomic_write, empty_dir, ensure_dir};
pub use process::{ProcessCommand, ProcessOutput};
