//! Output module for presenting crawl results
//!
//! This module handles:
//! - Rendering new objects as short text blocks
//! - Summarizing a crawl run
//! - Reporting what the store knows

pub mod stats;

pub use stats::{load_statistics, print_statistics, StoreStatistics};

use crate::crawler::CrawlReport;
use crate::search::ObjectRecord;
use std::io::{self, Write};

/// Renders one object as `Name`, `Address` and `Url` lines
///
/// Missing values are shown as `-`.
pub fn render_object(object: &ObjectRecord) -> String {
    let name = object.name().unwrap_or("-");
    let address = object.address.as_deref().unwrap_or("-");
    let url = object.url.as_deref().unwrap_or("-");
    format!("Name: {}\nAddress: {}\nUrl: {}", name, address, url)
}

/// Writes every object as a block, separated by blank lines
pub fn write_new_objects<W: Write>(out: &mut W, objects: &[ObjectRecord]) -> io::Result<()> {
    for (i, object) in objects.iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        writeln!(out, "{}", render_object(object))?;
    }
    Ok(())
}

/// One-line summary of a run
pub fn summary_line(report: &CrawlReport) -> String {
    let partition = if report.partition_cached {
        "cached"
    } else {
        "computed"
    };
    let mut line = format!(
        "{} new objects ({} already known, {} dropped) from {} records in {} {} leaves",
        report.accepted,
        report.already_seen,
        report.dropped,
        report.features,
        report.leaves,
        partition
    );
    if report.recovered > 0 {
        line.push_str(&format!("; {} stored under fallback ids", report.recovered));
    }
    line
}

/// Prints new objects and the run summary to stdout
pub fn print_new_objects(objects: &[ObjectRecord], report: &CrawlReport) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if objects.is_empty() {
        writeln!(out, "Nothing new found.")?;
    } else {
        write_new_objects(&mut out, objects)?;
        writeln!(out)?;
    }
    writeln!(out, "{}", summary_line(report))?;
    Ok(())
}
