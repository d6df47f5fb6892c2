// src/fetch/links.rs

use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// A link to one published report, as found on the listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentLink {
    /// Visible anchor text, e.g. "IV Issuances by Post and Visa Class - March 2021".
    pub label: String,
    pub target: Url,
}

/// Select every anchor whose `href` contains `link_prefix` and resolve it
/// against `base`. Links are returned in page order, first occurrence wins.
pub fn discover_links(markup: &str, base: &Url, link_prefix: &str) -> Vec<DocumentLink> {
    let selector = Selector::parse("a[href]").expect("CSS selector for anchors should be valid");
    let doc = Html::parse_document(markup);

    let mut seen = HashSet::new();
    doc.select(&selector)
        .filter_map(|e| {
            let href = e.value().attr("href")?;
            if !href.contains(link_prefix) {
                return None;
            }
            let target = base.join(href).ok()?;
            let label = e.text().collect::<Vec<_>>().join(" ");
            let label = label.split_whitespace().collect::<Vec<_>>().join(" ");
            Some(DocumentLink { label, target })
        })
        .filter(|link| seen.insert(link.target.clone()))
        .collect()
}

/// Links whose label carries `marker`.
pub fn with_marker<'a>(
    links: &'a [DocumentLink],
    marker: &'a str,
) -> impl Iterator<Item = &'a DocumentLink> + 'a {
    links.iter().filter(move |l| l.label.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <a href="/content/dam/visas/Statistics/Immigrant-Statistics/MonthlyIVIssuances/MARCH%202021%20-%20IV%20Issuances%20by%20Post%20and%20Visa%20Class.pdf">
            March 2021 - IV Issuances by Post and Visa Class</a>
          <a href="/content/dam/visas/Statistics/Immigrant-Statistics/MonthlyIVIssuances/MARCH%202021%20-%20IV%20Issuances%20by%20FSC%20and%20Visa%20Class.pdf">March 2021 - IV Issuances by FSC and Visa Class</a>
          <a href="/content/dam/visas/Statistics/Immigrant-Statistics/MonthlyIVIssuances/MARCH%202021%20-%20IV%20Issuances%20by%20FSC%20and%20Visa%20Class.pdf">duplicate</a>
          <a href="/content/travel/en/legal.html">Legal</a>
          <a>no href</a>
        </body></html>"#;

    const PREFIX: &str = "/content/dam/visas/Statistics/Immigrant-Statistics/MonthlyIVIssuances/";

    #[test]
    fn test_discover_links_filters_prefix_and_resolves() {
        let base = Url::parse("https://travel.state.gov/content/travel/en/monthly.html").unwrap();
        let links = discover_links(PAGE, &base, PREFIX);

        assert_eq!(links.len(), 2);
        assert_eq!(links[0].label, "March 2021 - IV Issuances by Post and Visa Class");
        assert_eq!(links[0].target.host_str(), Some("travel.state.gov"));
        assert!(links[0].target.path().starts_with(PREFIX));
        assert_eq!(links[1].label, "March 2021 - IV Issuances by FSC and Visa Class");
    }

    #[test]
    fn test_with_marker_partitions_by_label() {
        let base = Url::parse("https://travel.state.gov/").unwrap();
        let links = discover_links(PAGE, &base, PREFIX);

        let by_post: Vec<_> = with_marker(&links, "IV Issuances by Post and Visa Class").collect();
        let by_fsc: Vec<_> = with_marker(&links, "IV Issuances by FSC ").collect();
        assert_eq!(by_post.len(), 1);
        assert_eq!(by_fsc.len(), 1);
        assert_ne!(by_post[0], by_fsc[0]);
    }
}
