// src/extract/tabula.rs

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, instrument};
use url::Url;

use super::{Cell, ExtractionMode, RawPage, TableExtractor};
use crate::fetch::pdf::download_to_temp;

/// Extracts tables by running the `tabula-java` command line in JSON mode.
#[derive(Debug, Clone)]
pub struct TabulaExtractor {
    pub java: PathBuf,
    pub jar: PathBuf,
}

impl TabulaExtractor {
    pub fn new(java: impl Into<PathBuf>, jar: impl Into<PathBuf>) -> Self {
        Self {
            java: java.into(),
            jar: jar.into(),
        }
    }

    /// `JAVA` and `TABULA_JAR` override the defaults `java` and `tabula.jar`.
    pub fn from_env() -> Self {
        let java = std::env::var_os("JAVA").unwrap_or_else(|| "java".into());
        let jar = std::env::var_os("TABULA_JAR").unwrap_or_else(|| "tabula.jar".into());
        Self::new(java, jar)
    }

    fn command(&self, mode: &ExtractionMode) -> Command {
        let mut cmd = Command::new(&self.java);
        cmd.arg("-jar")
            .arg(&self.jar)
            .args(["--pages", "all", "--format", "JSON"]);
        if mode.lattice {
            cmd.arg("--lattice");
        }
        if mode.stream {
            cmd.arg("--stream");
        }
        cmd
    }
}

impl TableExtractor for TabulaExtractor {
    #[instrument(level = "debug", skip_all, fields(document = %document))]
    fn extract(&self, document: &Url, mode: &ExtractionMode) -> Result<Vec<RawPage>> {
        // 1) fetch the PDF to a temp file; it is removed when `pdf` drops
        let client = reqwest::blocking::Client::new();
        let pdf = download_to_temp(&client, document)?;

        // 2) run tabula over every page
        let output = self
            .command(mode)
            .arg(pdf.path())
            .output()
            .with_context(|| format!("running {} -jar {}", self.java.display(), self.jar.display()))?;
        if !output.status.success() {
            bail!(
                "tabula exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        // 3) one RawPage per extracted table, in document order
        let pages = pages_from_json(&output.stdout)?;
        debug!(pages = pages.len(), "tabula extraction done");
        Ok(pages)
    }
}

/// Tabula's JSON output: a list of tables.
#[derive(Deserialize, Debug)]
#[serde(transparent)]
pub struct JsonTableSet(pub Vec<JsonTable>);

#[derive(Deserialize, Debug)]
pub struct JsonTable {
    pub data: Vec<Vec<JsonCell>>,
}

#[derive(Deserialize, Debug)]
pub struct JsonCell {
    #[serde(default)]
    pub text: String,
}

/// Parse tabula's JSON into raw pages. Every cell is text; typing is left to
/// the count normalizer.
pub fn pages_from_json(bytes: &[u8]) -> Result<Vec<RawPage>> {
    let JsonTableSet(tables) =
        serde_json::from_slice(bytes).context("parsing tabula JSON output")?;
    Ok(tables
        .into_iter()
        .map(|table| {
            RawPage::new(
                table
                    .data
                    .into_iter()
                    .map(|row| row.iter().map(|c| Cell::from_text(&c.text)).collect())
                    .collect(),
            )
        })
        .collect())
}
