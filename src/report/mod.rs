//! Report rendering
//!
//! A scan result is rendered into an email [`Report`] by one of three
//! interchangeable [`ReportRenderer`]s, selected through [`ReportFormat`].

mod flat;
mod hierarchical;
mod tabular;

pub use flat::FlatRenderer;
pub use hierarchical::HierarchicalRenderer;
pub use tabular::{column_widths, TabularRenderer};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scan::BranchRecord;

/// Rendered email content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub subject: String,
    pub text_body: String,
    pub html_body: Option<String>,
}

/// Selectable rendering strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Organization / repository / branch outline, plain text and HTML
    #[default]
    Hierarchical,
    /// Aligned columns, one row per branch
    Tabular,
    /// One `Org: .., Repo: .., Branch: ..` line per branch
    Flat,
}

impl ReportFormat {
    pub fn renderer(self) -> Box<dyn ReportRenderer> {
        match self {
            Self::Hierarchical => Box::new(HierarchicalRenderer),
            Self::Tabular => Box::new(TabularRenderer),
            Self::Flat => Box::new(FlatRenderer),
        }
    }
}

/// Values shared by every renderer for a single run
#[derive(Debug, Clone)]
pub struct RenderContext {
    /// Name of the excluded branch, used in headings
    pub primary_branch: String,
    pub now: DateTime<Utc>,
}

impl RenderContext {
    pub fn new(primary_branch: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            primary_branch: primary_branch.into(),
            now,
        }
    }

    /// e.g. `GitHub Non-Main Branches Report - Wednesday, July 02, 2025`
    pub fn subject(&self) -> String {
        format!(
            "GitHub Non-{} Branches Report - {}",
            capitalize(&self.primary_branch),
            self.now.format("%A, %B %d, %Y")
        )
    }

    pub fn timestamp(&self) -> String {
        self.now.format("%Y-%m-%dT%H:%M:%S").to_string()
    }

    /// `Non-main branches found as of <ts>:`
    pub fn found_heading(&self) -> String {
        format!(
            "Non-{} branches found as of {}:",
            self.primary_branch,
            self.timestamp()
        )
    }

    /// `No non-main branches found as of <ts>.`
    pub fn none_found(&self) -> String {
        format!(
            "No non-{} branches found as of {}.",
            self.primary_branch,
            self.timestamp()
        )
    }

    /// Plain-text and HTML bodies used when the scan found nothing
    fn empty_bodies(&self, repo_count: usize) -> (String, String) {
        let text = format!("{}\n\n{}", self.none_found(), total_line(repo_count));
        let html = format!(
            "<p>{}</p><p>{}</p>",
            escape_html(&self.none_found()),
            total_line(repo_count)
        );
        (text, html)
    }
}

/// Renders branch records into email content
pub trait ReportRenderer {
    fn render(&self, records: &[BranchRecord], repo_count: usize, ctx: &RenderContext) -> Report;
}

pub(crate) fn total_line(repo_count: usize) -> String {
    format!("Total repositories processed: {}", repo_count)
}

/// Records ordered by (organization, repository, branch)
pub(crate) fn sorted(records: &[BranchRecord]) -> Vec<&BranchRecord> {
    let mut sorted: Vec<&BranchRecord> = records.iter().collect();
    sorted.sort();
    sorted
}

pub(crate) fn stale_flag(is_stale: bool) -> &'static str {
    if is_stale {
        "Y"
    } else {
        "N"
    }
}

pub(crate) fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::TimeZone;

    pub fn ctx() -> RenderContext {
        RenderContext::new("main", Utc.with_ymd_and_hms(2025, 7, 2, 15, 58, 0).unwrap())
    }

    pub fn record(org: &str, repo: &str, branch: &str, is_stale: Option<bool>) -> BranchRecord {
        BranchRecord {
            organization: org.to_string(),
            repository: repo.to_string(),
            branch: branch.to_string(),
            is_stale,
        }
    }

    /// Unordered input spanning two orgs, two repos and two branches each
    pub fn shuffled_records() -> Vec<BranchRecord> {
        vec![
            record("z", "r2", "main-ish", Some(false)),
            record("z", "r1", "dev", Some(true)),
            record("a", "r2", "main-ish", Some(true)),
            record("a", "r2", "dev", Some(false)),
            record("a", "r1", "dev", Some(true)),
        ]
    }
}
