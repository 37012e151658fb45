use super::{escape_html, sorted, stale_flag, total_line, RenderContext, Report, ReportRenderer};
use crate::scan::BranchRecord;

const HEADERS: [&str; 3] = ["org", "repo", "branch"];
const STALE_HEADER: &str = "stale";
const COLUMN_GAP: &str = "  ";

/// Space-padded columns sized to the longest value
#[derive(Debug, Clone, Copy, Default)]
pub struct TabularRenderer;

/// Widths of the org, repo and branch columns: max(header length, longest value)
pub fn column_widths(records: &[BranchRecord]) -> [usize; 3] {
    let mut widths = HEADERS.map(|header| header.chars().count());

    for record in records {
        let values = [&record.organization, &record.repository, &record.branch];
        for (width, value) in widths.iter_mut().zip(values) {
            *width = (*width).max(value.chars().count());
        }
    }

    widths
}

impl TabularRenderer {
    fn table(records: &[BranchRecord]) -> String {
        let widths = column_widths(records);
        let with_staleness = records.iter().any(|record| record.is_stale.is_some());

        let row = |cells: [&str; 3], stale: Option<&str>| {
            let mut line = cells
                .iter()
                .zip(widths)
                .map(|(cell, width)| pad(cell, width))
                .collect::<Vec<_>>()
                .join(COLUMN_GAP);
            if let Some(stale) = stale {
                line.push_str(COLUMN_GAP);
                line.push_str(&pad(stale, STALE_HEADER.len()));
            }
            // no trailing padding after the last column
            line.trim_end().to_string()
        };

        let dashes = widths.map(|width| "-".repeat(width));
        let stale_dashes = "-".repeat(STALE_HEADER.len());
        let mut lines = vec![
            row(HEADERS, with_staleness.then_some(STALE_HEADER)),
            row(
                [dashes[0].as_str(), dashes[1].as_str(), dashes[2].as_str()],
                with_staleness.then_some(stale_dashes.as_str()),
            ),
        ];

        for record in sorted(records) {
            let stale = with_staleness.then(|| record.is_stale.map(stale_flag).unwrap_or("-"));
            lines.push(row(
                [
                    record.organization.as_str(),
                    record.repository.as_str(),
                    record.branch.as_str(),
                ],
                stale,
            ));
        }

        lines.join("\n")
    }
}

impl ReportRenderer for TabularRenderer {
    fn render(&self, records: &[BranchRecord], repo_count: usize, ctx: &RenderContext) -> Report {
        let subject = ctx.subject();

        if records.is_empty() {
            let (text_body, html_body) = ctx.empty_bodies(repo_count);
            return Report {
                subject,
                text_body,
                html_body: Some(html_body),
            };
        }

        let table = Self::table(records);
        let text_body = format!(
            "{}\n\n{}\n\n{}",
            ctx.found_heading(),
            table,
            total_line(repo_count)
        );
        let html_body = format!(
            "<p>{}</p>\n<pre>{}</pre>\n<p>{}</p>",
            escape_html(&ctx.found_heading()),
            escape_html(&table),
            total_line(repo_count)
        );

        Report {
            subject,
            text_body,
            html_body: Some(html_body),
        }
    }
}

fn pad(value: &str, width: usize) -> String {
    format!("{:<width$}", value, width = width)
}
