//! Output module for the mirror tree and run reports
//!
//! This module handles:
//! - Writing the per-package and repository-wide "simple" indexes
//! - Writing the requirement tree report
//! - Recording run statistics

mod index;
mod report;
pub mod stats;

pub use index::{format_flat_index, format_package_index, format_simple_index, IndexWriter};
pub use report::{format_requirement_report, write_requirement_report, RequirementTree};
pub use stats::{print_statistics, MirrorStatistics};
