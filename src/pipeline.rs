// src/pipeline.rs

use anyhow::Result;
use futures::{stream::FuturesUnordered, StreamExt};
use std::{collections::BTreeMap, path::PathBuf, sync::Arc, time::Instant};
use tracing::{error, info, instrument, warn};

use crate::config::{Category, Config};
use crate::error::DocumentError;
use crate::extract::{ExtractionMode, TableExtractor};
use crate::fetch::{discover_links, links::with_marker, DocumentLink, LinkSource};
use crate::history::{already_present, OutputNamespace};
use crate::process::{reconcile, tag, tag_period};

/// Per-category counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryStats {
    pub discovered: usize,
    pub skipped_present: usize,
    pub skipped_unparseable: usize,
    pub written: usize,
    pub failed: usize,
    /// Periods on disk after the run.
    pub stored: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub categories: BTreeMap<Category, CategoryStats>,
}

impl RunSummary {
    pub fn written(&self) -> usize {
        self.categories.values().map(|s| s.written).sum()
    }

    pub fn failed(&self) -> usize {
        self.categories.values().map(|s| s.failed).sum()
    }
}

/// A document that passed the freshness filter.
struct Job {
    category: Category,
    link: DocumentLink,
    namespace: OutputNamespace,
    expects_repeated_header: bool,
}

/// Drives one listing page through discovery, freshness filtering and
/// per-document processing.
pub struct Pipeline<E> {
    config: Config,
    extractor: Arc<E>,
}

impl<E> Pipeline<E>
where
    E: TableExtractor + Send + Sync + 'static,
{
    pub fn new(config: Config, extractor: Arc<E>) -> Self {
        Self { config, extractor }
    }

    /// Process every new document on the listing page.
    ///
    /// Only listing and namespace setup errors are returned; a failing
    /// document is logged, counted, and the run carries on.
    #[instrument(level = "info", skip_all, fields(listing = %self.config.source_url))]
    pub async fn run<S: LinkSource>(&self, source: &S) -> Result<RunSummary> {
        // 1) fetch the listing page once, keep anchors under the prefix
        let listing = self.config.source_url()?;
        let markup = source.fetch_markup(&listing).await?;
        let links = discover_links(&markup, &listing, &self.config.link_prefix);
        info!(links = links.len(), "discovered documents");

        // 2) classify by marker and drop periods already on disk
        let mut summary = RunSummary::default();
        let mut jobs = Vec::new();
        let mut namespaces = Vec::with_capacity(self.config.categories.len());
        for cat in &self.config.categories {
            let namespace = self.config.namespace(cat);
            namespace.ensure()?;
            namespaces.push((cat.category, namespace.clone()));
            let stats = summary.categories.entry(cat.category).or_default();

            for link in with_marker(&links, &cat.marker) {
                stats.discovered += 1;
                match already_present(&link.label, &namespace) {
                    Ok(true) => stats.skipped_present += 1,
                    Ok(false) => jobs.push(Job {
                        category: cat.category,
                        link: link.clone(),
                        namespace: namespace.clone(),
                        expects_repeated_header: cat.expects_repeated_header,
                    }),
                    Err(e) => {
                        warn!(label = %link.label, error = %e, "skipping link");
                        stats.skipped_unparseable += 1;
                    }
                }
            }
        }

        if jobs.is_empty() {
            info!("no new documents");
        } else {
            info!(documents = jobs.len(), "documents to process");
        }

        // 3) process on the blocking pool, at most `concurrency` in flight
        let mut tasks = FuturesUnordered::new();
        for job in jobs {
            let extractor = Arc::clone(&self.extractor);
            let mode = self.config.extraction;
            tasks.push(async move {
                let Job {
                    category,
                    link,
                    namespace,
                    expects_repeated_header,
                } = job;
                let label = link.label.clone();
                let res = tokio::task::spawn_blocking(move || {
                    process_document(
                        extractor.as_ref(),
                        &link,
                        &mode,
                        expects_repeated_header,
                        &namespace,
                    )
                })
                .await
                .unwrap_or_else(|e| {
                    Err(DocumentError::Join {
                        label: label.clone(),
                        message: e.to_string(),
                    })
                });
                (category, label, res)
            });

            // throttle concurrency
            if tasks.len() >= self.config.concurrency {
                if let Some(done) = tasks.next().await {
                    record(&mut summary, done);
                }
            }
        }
        while let Some(done) = tasks.next().await {
            record(&mut summary, done);
        }

        // 4) report, with what each namespace now holds
        for (category, namespace) in &namespaces {
            let stats = summary.categories.entry(*category).or_default();
            match namespace.periods() {
                Ok(periods) => stats.stored = periods.len(),
                Err(e) => warn!(%category, error = %e, "cannot list stored periods"),
            }
        }
        for (category, stats) in &summary.categories {
            info!(
                %category,
                discovered = stats.discovered,
                skipped_present = stats.skipped_present,
                skipped_unparseable = stats.skipped_unparseable,
                written = stats.written,
                failed = stats.failed,
                stored = stats.stored,
                "category done"
            );
        }
        Ok(summary)
    }
}

fn record(
    summary: &mut RunSummary,
    (category, label, res): (Category, String, Result<PathBuf, DocumentError>),
) {
    let stats = summary.categories.entry(category).or_default();
    match res {
        Ok(path) => {
            info!(%label, path = %path.display(), "written");
            stats.written += 1;
        }
        Err(e) => {
            error!(%label, stage = e.stage(), "document failed: {}", e);
            stats.failed += 1;
        }
    }
}

/// Extract, reconcile, tag and persist one document.
#[instrument(level = "info", skip_all, fields(label = %link.label))]
pub fn process_document<E>(
    extractor: &E,
    link: &DocumentLink,
    mode: &ExtractionMode,
    expects_repeated_header: bool,
    namespace: &OutputNamespace,
) -> Result<PathBuf, DocumentError>
where
    E: TableExtractor + ?Sized,
{
    let start = Instant::now();
    let label = || link.label.clone();

    // 1) per-page grids
    let pages = extractor
        .extract(&link.target, mode)
        .map_err(|error| DocumentError::Extract {
            label: label(),
            error,
        })?;

    // 2) one table, one header
    let table = reconcile(&pages, expects_repeated_header).map_err(|source| {
        DocumentError::Reconcile {
            label: label(),
            source,
        }
    })?;

    // 3) period from the label, counts to integers
    let period = tag_period(&link.label)?;
    let tagged = tag(table, period).map_err(|source| DocumentError::Normalize {
        label: label(),
        source,
    })?;

    // 4) persist under {year}_{month}
    let path = namespace
        .write(&tagged)
        .map_err(|error| DocumentError::Store {
            label: label(),
            error,
        })?;

    info!(
        %period,
        rows = tagged.num_rows,
        elapsed = ?start.elapsed(),
        "processed document"
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CategoryConfig;
    use crate::extract::RawPage;
    use anyhow::anyhow;
    use std::collections::HashMap;
    use tempfile::tempdir;
    use url::Url;

    const LISTING: &str = r#"
        <html><body>
        <a href="/reports/post-2021-03.pdf">Issuances by Post and Visa Class - March 2021</a>
        <a href="/reports/post-2021-04.pdf">Issuances by Post and Visa Class - April 2021</a>
        <a href="/reports/post-archive.pdf">Issuances by Post and Visa Class - Archive</a>
        <a href="/reports/nat-2021-05.pdf">Issuances by Nationality - May 2021</a>
        <a href="/reports/nat-2021-06.pdf">Issuances by Nationality - June 2021</a>
        <a href="/elsewhere/post-2021-03.pdf">Issuances by Post and Visa Class - March 2021</a>
        </body></html>
    "#;

    struct StaticSource(&'static str);

    impl LinkSource for StaticSource {
        async fn fetch_markup(&self, _url: &Url) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    /// Serves canned pages by document URL; unknown URLs fail.
    struct CannedExtractor(HashMap<String, Vec<RawPage>>);

    impl TableExtractor for CannedExtractor {
        fn extract(&self, document: &Url, _mode: &ExtractionMode) -> Result<Vec<RawPage>> {
            self.0
                .get(document.as_str())
                .cloned()
                .ok_or_else(|| anyhow!("404 for {}", document))
        }
    }

    fn canned() -> CannedExtractor {
        let mut docs = HashMap::new();
        docs.insert(
            "https://example.org/reports/post-2021-03.pdf".to_string(),
            vec![
                RawPage::from_strings(vec![
                    vec!["Post", "Visa Class", "Issuances"],
                    vec!["Abidjan", "IR1", "12"],
                ]),
                RawPage::from_strings(vec![
                    vec!["Post", "Visa Class", "Issuances"],
                    vec!["Accra", "CR1", "1,003"],
                ]),
            ],
        );
        docs.insert(
            "https://example.org/reports/post-2021-04.pdf".to_string(),
            vec![RawPage::from_strings(vec![
                vec!["Post", "Visa Class", "Issuances"],
                vec!["Abidjan", "IR1", "N/A"],
            ])],
        );
        docs.insert(
            "https://example.org/reports/nat-2021-05.pdf".to_string(),
            vec![
                RawPage::from_strings(vec![
                    vec!["Nationality", "Visa Class", "Issuance"],
                    vec!["Albania", "B1/B2", "1,200"],
                ]),
                RawPage::from_strings(vec![vec!["Zambia", "F1", "3"]]),
            ],
        );
        docs.insert(
            "https://example.org/reports/post-headers-only.pdf".to_string(),
            vec![
                RawPage::from_strings(vec![vec!["Post", "Visa Class", "Issuances"]]),
                RawPage::from_strings(vec![vec!["Post", "Visa Class", "Issuances"]]),
            ],
        );
        CannedExtractor(docs)
    }

    fn config(root: &std::path::Path) -> Config {
        Config {
            source_url: "https://example.org/stats/issuances.html".into(),
            link_prefix: "/reports/".into(),
            output_root: root.to_path_buf(),
            concurrency: 2,
            extraction: ExtractionMode::default(),
            categories: vec![
                CategoryConfig {
                    category: Category::ByPost,
                    marker: "by Post and Visa Class".into(),
                    namespace: "post".into(),
                    expects_repeated_header: true,
                },
                CategoryConfig {
                    category: Category::ByOrigin,
                    marker: "by Nationality".into(),
                    namespace: "origin".into(),
                    expects_repeated_header: false,
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_run_isolates_failures_and_skips_on_rerun() -> Result<()> {
        let tmp = tempdir()?;
        let pipeline = Pipeline::new(config(tmp.path()), Arc::new(canned()));
        let source = StaticSource(LISTING);

        // first run: one good and one bad document per category
        let summary = pipeline.run(&source).await?;
        assert_eq!(
            summary.categories[&Category::ByPost],
            CategoryStats {
                discovered: 3,
                skipped_present: 0,
                skipped_unparseable: 1,
                written: 1,
                failed: 1,
                stored: 1,
            }
        );
        assert_eq!(
            summary.categories[&Category::ByOrigin],
            CategoryStats {
                discovered: 2,
                written: 1,
                failed: 1,
                stored: 1,
                ..Default::default()
            }
        );
        assert!(tmp.path().join("post").join("2021_3.parquet").is_file());
        assert!(tmp.path().join("origin").join("2021_5.parquet").is_file());
        assert!(!tmp.path().join("post").join("2021_4.parquet").exists());

        // second run: written periods are skipped, failures retried
        let summary = pipeline.run(&source).await?;
        let post = summary.categories[&Category::ByPost];
        assert_eq!(post.skipped_present, 1);
        assert_eq!(post.written, 0);
        assert_eq!(post.failed, 1);
        let origin = summary.categories[&Category::ByOrigin];
        assert_eq!(origin.skipped_present, 1);
        assert_eq!(origin.failed, 1);
        assert_eq!(origin.stored, 1);
        assert_eq!(summary.written(), 0);
        assert_eq!(summary.failed(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_run_with_no_matching_links() -> Result<()> {
        let tmp = tempdir()?;
        let pipeline = Pipeline::new(config(tmp.path()), Arc::new(canned()));
        let summary = pipeline.run(&StaticSource("<html></html>")).await?;
        assert_eq!(summary.written(), 0);
        assert_eq!(summary.categories[&Category::ByPost], CategoryStats::default());
        // namespaces exist even when nothing was written
        assert!(tmp.path().join("origin").is_dir());
        Ok(())
    }

    #[test]
    fn test_process_document_reports_stage() -> Result<()> {
        let tmp = tempdir()?;
        let ns = OutputNamespace::new(tmp.path());
        let extractor = canned();
        let link = |href: &str, label: &str| DocumentLink {
            label: label.into(),
            target: Url::parse(href).unwrap(),
        };

        let path = process_document(
            &extractor,
            &link(
                "https://example.org/reports/nat-2021-05.pdf",
                "Issuances by Nationality - May 2021",
            ),
            &ExtractionMode::default(),
            false,
            &ns,
        )?;
        assert_eq!(path, tmp.path().join("2021_5.parquet"));

        let err = process_document(
            &extractor,
            &link(
                "https://example.org/reports/missing.pdf",
                "Issuances by Nationality - June 2021",
            ),
            &ExtractionMode::default(),
            false,
            &ns,
        )
        .unwrap_err();
        assert_eq!(err.stage(), "extract");

        let err = process_document(
            &extractor,
            &link(
                "https://example.org/reports/post-2021-04.pdf",
                "Issuances by Post and Visa Class - April 2021",
            ),
            &ExtractionMode::default(),
            true,
            &ns,
        )
        .unwrap_err();
        assert_eq!(err.stage(), "normalize");

        // a document with no data rows is not stored, so it is retried later
        let label = "Issuances by Post and Visa Class - July 2021";
        let err = process_document(
            &extractor,
            &link("https://example.org/reports/post-headers-only.pdf", label),
            &ExtractionMode::default(),
            true,
            &ns,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DocumentError::Reconcile {
                source: crate::process::ReconcileError::NoRows,
                ..
            }
        ));
        assert!(!already_present(label, &ns)?);
        Ok(())
    }
}
