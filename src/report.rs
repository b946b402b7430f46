use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use unicode_width::UnicodeWidthStr;

use crate::pipeline::{Outcome, Report, SectionStatus};

const COMMENT_WIDTH: usize = 48;
const BAR_WIDTH: usize = 30;

pub fn write_json(report: &Report, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("report: serialize")?;
    fs::write(path, json).with_context(|| format!("report: write {}", path.display()))
}

/// Human-readable summary of one run: ranked words, hourly counts, the
/// sentiment sample and where each output went.
pub fn render_text(report: &Report) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ({})", report.video_id, report.url);
    if report.outcome == Outcome::NoComments {
        let _ = writeln!(out, "No comments found; nothing to analyze.");
        return out;
    }
    let _ = writeln!(
        out,
        "{} comments over {} page(s), {} tokens ({} distinct)",
        report.comment_count, report.pages, report.token_count, report.distinct_tokens
    );

    if !report.top_words.is_empty() {
        let _ = writeln!(out, "\nTop {} words", report.top_words.len());
        let rows: Vec<Vec<String>> = report
            .top_words
            .iter()
            .enumerate()
            .map(|(i, entry)| vec![(i + 1).to_string(), entry.token.clone(), entry.count.to_string()])
            .collect();
        out.push_str(&table(&["#", "word", "count"], &rows));
    }

    if !report.hourly.is_empty() {
        let _ = writeln!(out, "\nComments by hour (UTC)");
        let peak = report.hourly.iter().map(|h| h.count).max().unwrap_or(1).max(1);
        let rows: Vec<Vec<String>> = report
            .hourly
            .iter()
            .map(|h| {
                let bar = (h.count as usize * BAR_WIDTH).div_ceil(peak as usize);
                vec![format!("{:02}", h.hour), h.count.to_string(), "#".repeat(bar)]
            })
            .collect();
        out.push_str(&table(&["hour", "comments", ""], &rows));
    }

    if let Some(results) = report.sentiment.as_ref().filter(|r| !r.is_empty()) {
        let _ = writeln!(out, "\nSentiment (first {} comments)", results.len());
        let rows: Vec<Vec<String>> = results
            .iter()
            .map(|r| {
                vec![
                    truncate(&r.comment, COMMENT_WIDTH),
                    r.label.clone(),
                    format!("{:.3}", r.score),
                ]
            })
            .collect();
        out.push_str(&table(&["comment", "label", "score"], &rows));
    }

    let _ = writeln!(out, "\nOutputs");
    for section in &report.sections {
        let line = match &section.status {
            SectionStatus::Written { path } => format!("wrote {}", path.display()),
            SectionStatus::Done => "done".to_string(),
            SectionStatus::Skipped { reason } => format!("skipped ({reason})"),
            SectionStatus::Failed { error } => format!("FAILED: {error}"),
        };
        let _ = writeln!(out, "  {:<10} {}", section.name, line);
    }
    for warning in &report.warnings {
        let _ = writeln!(out, "  warning: {warning}");
    }
    out
}

/// Left-aligned columns padded by display width so Hangul lines up.
fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.width()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.width());
            }
        }
    }

    let mut out = String::new();
    let header: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    push_row(&mut out, &header, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_row(&mut out, &rule, &widths);
    for row in rows {
        push_row(&mut out, row, &widths);
    }
    out
}

fn push_row(out: &mut String, cells: &[String], widths: &[usize]) {
    let mut line = String::from(" ");
    for (cell, width) in cells.iter().zip(widths) {
        line.push(' ');
        line.push_str(cell);
        line.push_str(&" ".repeat(width.saturating_sub(cell.width())));
        line.push(' ');
    }
    out.push_str(line.trim_end());
    out.push('\n');
}

fn truncate(text: &str, width: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let lines = textwrap::wrap(&flat, width);
    match lines.as_slice() {
        [] => String::new(),
        [only] => only.to_string(),
        [first, ..] => format!("{first}…"),
    }
}
