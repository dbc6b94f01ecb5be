use crate::config::TableConfig;
use crate::types::Organization;
use serde::Serialize;
use std::fmt::Write;

const NOT_SPECIFIED: &str = "Not specified";
const NO_SUMMARY: &str = "No summary available";

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn or_fallback<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

/// Escaped anchor for http(s) URLs; anything else is shown as plain text.
fn website_html(url: &str) -> String {
    if url.is_empty() {
        return escape_html(NOT_SPECIFIED);
    }
    let lower = url.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        let url = escape_html(url);
        format!(r#"<a href="{url}" target="_blank" rel="noopener noreferrer">{url}</a>"#)
    } else {
        escape_html(url)
    }
}

pub fn render_detail_panel<'a>(orgs: impl IntoIterator<Item = &'a Organization>) -> String {
    let orgs: Vec<&Organization> = orgs.into_iter().collect();
    let mut html = String::new();

    let noun = if orgs.len() == 1 { "organization" } else { "organizations" };
    let _ = write!(html, r#"<div class="detail-header">{} {} at this location</div>"#, orgs.len(), noun);

    for org in orgs {
        let _ = write!(
            html,
            concat!(
                r#"<div class="org-card">"#,
                r#"<h3 class="org-name">{name}</h3>"#,
                r#"<span class="org-type">{org_type}</span>"#,
                r#"<dl>"#,
                r#"<dt>Category</dt><dd>{category}</dd>"#,
                r#"<dt>Headquarter</dt><dd>{headquarter}</dd>"#,
                r#"<dt>Website</dt><dd>{website}</dd>"#,
                r#"</dl>"#,
                r#"<p class="org-summary">{summary}</p>"#,
                r#"</div>"#
            ),
            name = escape_html(&org.name),
            org_type = escape_html(org.display_type()),
            category = escape_html(or_fallback(&org.category, NOT_SPECIFIED)),
            headquarter = escape_html(or_fallback(&org.headquarter, NOT_SPECIFIED)),
            website = website_html(&org.website_url),
            summary = escape_html(or_fallback(&org.summary, NO_SUMMARY)),
        );
    }
    html
}

/// Rows to show for a filtered set, truncated once it exceeds the row limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableView {
    pub rows: Vec<usize>,
    pub total: usize,
    pub remaining: usize,
}

impl TableView {
    pub fn build(indices: &[usize], limits: &TableConfig) -> Self {
        let total = indices.len();
        let shown = if total > limits.row_limit { limits.truncated_rows.min(total) } else { total };
        TableView {
            rows: indices[..shown].to_vec(),
            total,
            remaining: total - shown,
        }
    }

    pub fn is_truncated(&self) -> bool {
        self.remaining > 0
    }

    pub fn to_html(&self, records: &[Organization]) -> String {
        let mut html = String::from(
            "<table class=\"org-table\"><thead><tr>\
             <th>Name</th><th>Type</th><th>Category</th><th>Headquarter</th><th>Website</th>\
             </tr></thead><tbody>",
        );

        if self.total == 0 {
            html.push_str(r#"<tr class="empty-row"><td colspan="5">No organizations match the current filters</td></tr>"#);
        }

        for org in self.rows.iter().filter_map(|&i| records.get(i)) {
            let _ = write!(
                html,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape_html(&org.name),
                escape_html(org.display_type()),
                escape_html(or_fallback(&org.category, "-")),
                escape_html(or_fallback(&org.headquarter, "-")),
                website_html(&org.website_url),
            );
        }

        if self.is_truncated() {
            let _ = write!(
                html,
                r#"<tr class="more-row"><td colspan="5">Showing first {} of {}. {} more organizations, refine filters to see them</td></tr>"#,
                self.rows.len(),
                self.total,
                self.remaining
            );
        }

        html.push_str("</tbody></table>");
        html
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::org;

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(
            escape_html(r#"<script>alert("x") & 'y'</script>"#),
            "&lt;script&gt;alert(&quot;x&quot;) &amp; &#39;y&#39;&lt;/script&gt;"
        );
        assert_eq!(escape_html("Zürich"), "Zürich");
    }

    #[test]
    fn large_sets_are_truncated_with_a_summary_row() {
        let records: Vec<Organization> = (0..1200).map(|i| org(&format!("Org {i}"), "Startup", "", None)).collect();
        let indices: Vec<usize> = (0..records.len()).collect();
        let view = TableView::build(&indices, &TableConfig::default());

        assert_eq!(view.rows.len(), 500);
        assert_eq!(view.remaining, 700);

        let html = view.to_html(&records);
        assert_eq!(html.matches("<tr><td>").count(), 500);
        assert_eq!(html.matches("more-row").count(), 1);
        assert!(html.contains("700 more organizations"));
    }

    #[test]
    fn sets_at_the_limit_render_fully() {
        let indices: Vec<usize> = (0..1000).collect();
        let view = TableView::build(&indices, &TableConfig::default());
        assert_eq!(view.rows.len(), 1000);
        assert!(!view.is_truncated());
    }

    #[test]
    fn table_rows_are_escaped_with_fallbacks() {
        let mut evil = org("<b>Acme</b>", "Startup", "", None);
        evil.website_url = "javascript:alert(1)".to_string();
        let records = vec![evil];
        let html = TableView::build(&[0], &TableConfig::default()).to_html(&records);

        assert!(html.contains("&lt;b&gt;Acme&lt;/b&gt;"));
        assert!(!html.contains("<b>"));
        assert!(!html.contains("href=\"javascript"));
        assert!(html.contains("<td>-</td>"));
    }

    #[test]
    fn empty_table_says_so() {
        let html = TableView::build(&[], &TableConfig::default()).to_html(&[]);
        assert!(html.contains("No organizations match"));
    }

    #[test]
    fn detail_cards_fill_missing_fields() {
        let mut acme = org("Acme & Co", "Accelerator", "", None);
        acme.website_url = "https://acme.io/?a=1&b=2".to_string();
        let html = render_detail_panel([&acme]);

        assert!(html.contains("1 organization at this location"));
        assert!(html.contains("Acme &amp; Co"));
        assert!(html.contains("<dd>Not specified</dd>"));
        assert!(html.contains("No summary available"));
        assert!(html.contains(r#"href="https://acme.io/?a=1&amp;b=2""#));
    }

    #[test]
    fn detail_panel_counts_every_card() {
        let records = vec![org("A", "Startup", "", None), org("B", "", "", None)];
        let html = render_detail_panel(&records);
        assert!(html.contains("2 organizations at this location"));
        assert_eq!(html.matches("org-card").count(), 2);
        assert_eq!(html.matches(">Startup</span>").count(), 2);
    }
}
