use super::{escape_html, sorted, stale_flag, total_line, RenderContext, Report, ReportRenderer};
use crate::scan::BranchRecord;

const INDENT: &str = "    ";

/// Organization headings with indented repositories and branches
#[derive(Debug, Clone, Copy, Default)]
pub struct HierarchicalRenderer;

impl ReportRenderer for HierarchicalRenderer {
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

        let mut text_lines = Vec::new();
        let mut html_lines = vec![r#"<div style="font-family: Arial, sans-serif;">"#.to_string()];
        let mut current_org: Option<&str> = None;
        let mut current_repo: Option<&str> = None;

        for record in sorted(records) {
            if current_org != Some(record.organization.as_str()) {
                current_org = Some(record.organization.as_str());
                current_repo = None;
                text_lines.push(record.organization.clone());
                html_lines.push(format!("<h3>{}</h3>", escape_html(&record.organization)));
            }

            if current_repo != Some(record.repository.as_str()) {
                current_repo = Some(record.repository.as_str());
                text_lines.push(format!("{}{}", INDENT, record.repository));
                html_lines.push(format!(
                    r#"<p style="margin-left: 20px;">{}</p>"#,
                    escape_html(&record.repository)
                ));
            }

            let entry = branch_entry(record);
            text_lines.push(format!("{}{}{}", INDENT, INDENT, entry));
            html_lines.push(format!(
                r#"<p style="margin-left: 40px;">{}</p>"#,
                escape_html(&entry)
            ));
        }

        html_lines.push(format!("<p>{}</p>", total_line(repo_count)));
        html_lines.push("</div>".to_string());

        let text_body = format!(
            "{}\n\n{}\n\n{}",
            ctx.found_heading(),
            text_lines.join("\n"),
            total_line(repo_count)
        );
        let html_body = format!(
            "<p>{}</p>\n{}",
            escape_html(&ctx.found_heading()),
            html_lines.join("\n")
        );

        Report {
            subject,
            text_body,
            html_body: Some(html_body),
        }
    }
}

/// `dev, Y` with staleness, bare branch name without
fn branch_entry(record: &BranchRecord) -> String {
    match record.is_stale {
        Some(is_stale) => format!("{}, {}", record.branch, stale_flag(is_stale)),
        None => record.branch.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn test_text_outline() {
        let report = HierarchicalRenderer.render(&shuffled_records(), 200, &ctx());

        let expected = "\
Non-main branches found as of 2025-07-02T15:58:00:

a
    r1
        dev, Y
    r2
        dev, N
        main-ish, Y
z
    r1
        dev, Y
    r2
        main-ish, N

Total repositories processed: 200";
        assert_eq!(report.text_body, expected);
    }

    #[test]
    fn test_html_outline() {
        let records = vec![
            record("myorg1", "repo1", "feature/<x>", Some(false)),
            record("myorg1", "repo1", "dev", Some(true)),
        ];
        let html = HierarchicalRenderer
            .render(&records, 2, &ctx())
            .html_body
            .expect("html body");

        let expected = r#"<p>Non-main branches found as of 2025-07-02T15:58:00:</p>
<div style="font-family: Arial, sans-serif;">
<h3>myorg1</h3>
<p style="margin-left: 20px;">repo1</p>
<p style="margin-left: 40px;">dev, Y</p>
<p style="margin-left: 40px;">feature/&lt;x&gt;, N</p>
<p>Total repositories processed: 2</p>
</div>"#;
        assert_eq!(html, expected);
    }

    #[test]
    fn test_without_staleness() {
        let records = vec![record("acme", "api", "dev", None)];
        let report = HierarchicalRenderer.render(&records, 1, &ctx());

        assert!(report.text_body.contains("\n        dev\n"));
        assert!(!report.text_body.contains("dev,"));
    }

    #[test]
    fn test_empty_has_html_variant() {
        let report = HierarchicalRenderer.render(&[], 5, &ctx());
        let html = report.html_body.expect("html body");
        assert!(html.contains("No non-main branches found"));
        assert!(html.contains("Total repositories processed: 5"));
    }
}
