//! CLI subcommand implementations.

pub mod note;
pub mod report;
pub mod run;
pub mod stats;
pub mod status;
pub mod timeline;
pub mod util;
