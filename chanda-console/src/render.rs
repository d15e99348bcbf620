//! Plain-text rendering of records and totals.

use chanda_core::{Amount, CollectionSummary, PaymentRecord, Timestamp};
use chanda_storage::{CacheStats, ListRead};

/// `₹1,00,000`
pub fn rupees(amount: Amount) -> String {
    format!("₹{}", amount.to_indian_grouping())
}

fn describe_screenshot(screenshot: &str) -> String {
    if screenshot.is_empty() {
        "-".to_string()
    } else if screenshot.starts_with("data:") {
        // base64 carries 3 bytes per 4 characters
        let kib = (screenshot.len() * 3 / 4).div_ceil(1024);
        format!("inline {} KiB", kib)
    } else {
        screenshot.to_string()
    }
}

fn format_time(timestamp: Timestamp) -> String {
    timestamp.format("%Y-%m-%d %H:%M").to_string()
}

/// Column-aligned table, newest first.
pub fn records_table(records: &[PaymentRecord]) -> String {
    if records.is_empty() {
        return "No payments yet.".to_string();
    }

    let headers = ["ID", "NAME", "AMOUNT", "BRANCH", "SUBMITTED", "SCREENSHOT"];
    let rows: Vec<[String; 6]> = records
        .iter()
        .map(|r| {
            [
                r.id.to_string(),
                r.name.clone(),
                rupees(r.amount),
                r.branch.clone(),
                format_time(r.timestamp),
                describe_screenshot(&r.screenshot),
            ]
        })
        .collect();

    let mut widths = headers.map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_row(&mut out, &headers.map(String::from), &widths);
    for row in &rows {
        push_row(&mut out, row, &widths);
    }
    out.truncate(out.trim_end().len());
    out
}

fn push_row(out: &mut String, cells: &[String; 6], widths: &[usize; 6]) {
    let mut line = String::new();
    for (cell, width) in cells.iter().zip(widths.iter()) {
        line.push_str(cell);
        let pad = width - cell.chars().count();
        line.push_str(&" ".repeat(pad + 2));
    }
    out.push_str(line.trim_end());
    out.push('\n');
}

/// The list table, prefixed with a warning when the data is stale.
pub fn list_view(read: &ListRead<PaymentRecord>) -> String {
    let table = records_table(read.records());
    match read {
        ListRead::Fresh(_) => table,
        ListRead::Stale {
            cached_at, reason, ..
        } => {
            let age = match cached_at {
                Some(at) => format!("showing snapshot from {}", format_time(*at)),
                None => "no cached data".to_string(),
            };
            format!("warning: store unreachable ({}); {}\n{}", reason, age, table)
        }
    }
}

pub fn summary_view(summary: &CollectionSummary, is_stale: bool) -> String {
    let mut out = format!(
        "Contributors: {}\nTotal collected: {}\n",
        summary.contributors,
        rupees(summary.total)
    );
    for branch in &summary.branches {
        out.push_str(&format!(
            "  {:<8} {:>4}  {}\n",
            branch.branch,
            branch.contributors,
            rupees(branch.total)
        ));
    }
    if is_stale {
        out.push_str("warning: totals computed from cached data\n");
    }
    out.truncate(out.trim_end().len());
    out
}

pub fn stats_view(stats: &CacheStats) -> String {
    format!(
        "cached records: {}\nhits: {}  misses: {}  refreshes: {}  fallbacks: {}\nhit rate: {:.0}%",
        stats.entry_count,
        stats.hits,
        stats.misses,
        stats.refreshes,
        stats.fallbacks,
        stats.hit_rate() * 100.0
    )
}
