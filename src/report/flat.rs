use super::{sorted, total_line, RenderContext, Report, ReportRenderer};
use crate::scan::BranchRecord;

/// One line per branch, plain text only
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatRenderer;

impl ReportRenderer for FlatRenderer {
    fn render(&self, records: &[BranchRecord], repo_count: usize, ctx: &RenderContext) -> Report {
        let text_body = if records.is_empty() {
            ctx.empty_bodies(repo_count).0
        } else {
            let lines: Vec<String> = sorted(records)
                .into_iter()
                .map(|record| {
                    format!(
                        "Org: {}, Repo: {}, Branch: {}",
                        record.organization, record.repository, record.branch
                    )
                })
                .collect();
            format!("{}\n\n{}", lines.join("\n"), total_line(repo_count))
        };

        Report {
            subject: ctx.subject(),
            text_body,
            html_body: None,
        }
    }
}
