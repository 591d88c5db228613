//! Run statistics
//!
//! Counters accumulated while the frontier is drained, reported once the
//! crawl has finished.

/// Mirror run statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorStatistics {
    /// Packages whose listing was retrieved
    pub packages_processed: u64,

    /// Packages the upstream does not know (HTTP 404)
    pub packages_unavailable: u64,

    /// Packages abandoned because of an error
    pub packages_failed: u64,

    /// Archives fetched from the upstream during this run
    pub archives_downloaded: u64,

    /// Archives already present in the mirror
    pub archives_present: u64,

    /// Archives that could not be fetched
    pub archives_failed: u64,

    /// Archives whose requirements could not be read
    pub extraction_failures: u64,

    /// Total bytes downloaded
    pub bytes_downloaded: u64,

    /// Distinct normalized package names seen
    pub packages_seen: u64,
}

impl MirrorStatistics {
    /// Total number of archive links handled
    pub fn archives_total(&self) -> u64 {
        self.archives_downloaded + self.archives_present + self.archives_failed
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &MirrorStatistics) {
    println!("=== Mirror Statistics ===\n");

    println!("Packages:");
    println!("  Seen: {}", stats.packages_seen);
    println!("  Mirrored: {}", stats.packages_processed);
    println!("  Unavailable upstream: {}", stats.packages_unavailable);
    println!("  Failed: {}", stats.packages_failed);
    println!();

    println!("Archives ({} listed):", stats.archives_total());
    println!("  Downloaded: {}", stats.archives_downloaded);
    println!("  Already present: {}", stats.archives_present);
    println!("  Failed: {}", stats.archives_failed);
    println!("  Unreadable requirements: {}", stats.extraction_failures);
    println!(
        "  Bytes downloaded: {} ({:.2} MB)",
        stats.bytes_downloaded,
        stats.bytes_downloaded as f64 / 1_000_000.0
    );
}
