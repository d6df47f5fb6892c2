// src/config.rs

use anyhow::{bail, ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt, fs, path::Path, path::PathBuf};
use url::Url;

use crate::extract::ExtractionMode;
use crate::history::OutputNamespace;

const IV_SOURCE: &str = "https://travel.state.gov/content/travel/en/legal/visa-law0/visa-statistics/immigrant-visa-statistics/monthly-immigrant-visa-issuances.html";
const NIV_SOURCE: &str = "https://travel.state.gov/content/travel/en/legal/visa-law0/visa-statistics/nonimmigrant-visa-statistics/monthly-nonimmigrant-visa-issuances.html";
const IV_PREFIX: &str = "/content/dam/visas/Statistics/Immigrant-Statistics/MonthlyIVIssuances/";
const NIV_PREFIX: &str =
    "/content/dam/visas/Statistics/Non-Immigrant-Statistics/MonthlyNIVIssuances/";

/// Which breakdown a report carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// By consular post and visa class.
    ByPost,
    /// By place of birth (IV) or nationality (NIV).
    ByOrigin,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Category::ByPost => "by-post",
            Category::ByOrigin => "by-origin",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub category: Category,
    /// Phrase a link label must contain to belong to this category.
    pub marker: String,
    /// Output directory, relative to `output_root` unless absolute.
    pub namespace: PathBuf,
    #[serde(default)]
    pub expects_repeated_header: bool,
}

/// One listing page and the report categories published on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub source_url: String,
    /// Only anchors whose `href` contains this are considered.
    pub link_prefix: String,
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub extraction: ExtractionMode,
    pub categories: Vec<CategoryConfig>,
}

fn default_output_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_concurrency() -> usize {
    3
}

impl Config {
    /// Monthly immigrant visa issuances.
    pub fn immigrant() -> Self {
        Self {
            source_url: IV_SOURCE.to_string(),
            link_prefix: IV_PREFIX.to_string(),
            output_root: default_output_root(),
            concurrency: default_concurrency(),
            extraction: ExtractionMode::default(),
            categories: vec![
                CategoryConfig {
                    category: Category::ByPost,
                    marker: "IV Issuances by Post and Visa Class".to_string(),
                    namespace: PathBuf::from("visa_post_data"),
                    expects_repeated_header: true,
                },
                CategoryConfig {
                    category: Category::ByOrigin,
                    marker: "IV Issuances by FSC ".to_string(),
                    namespace: PathBuf::from("place_of_birth_data"),
                    expects_repeated_header: true,
                },
            ],
        }
    }

    /// Monthly non-immigrant visa issuances. These reports print the header
    /// on the first page only.
    pub fn nonimmigrant() -> Self {
        Self {
            source_url: NIV_SOURCE.to_string(),
            link_prefix: NIV_PREFIX.to_string(),
            output_root: default_output_root(),
            concurrency: default_concurrency(),
            extraction: ExtractionMode::default(),
            categories: vec![
                CategoryConfig {
                    category: Category::ByPost,
                    marker: "NIV Issuances by Post and Visa Class".to_string(),
                    namespace: PathBuf::from("niv_visa_post_data"),
                    expects_repeated_header: false,
                },
                CategoryConfig {
                    category: Category::ByOrigin,
                    marker: "NIV Issuances by Nationality ".to_string(),
                    namespace: PathBuf::from("niv_place_of_birth_data"),
                    expects_repeated_header: false,
                },
            ],
        }
    }

    /// Look up a built-in preset by name (`iv` or `niv`).
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "iv" => Some(Self::immigrant()),
            "niv" => Some(Self::nonimmigrant()),
            _ => None,
        }
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(text).context("parsing YAML config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("loading config {}", path.display()))
    }

    pub fn source_url(&self) -> Result<Url> {
        Url::parse(&self.source_url).with_context(|| format!("invalid source_url {:?}", self.source_url))
    }

    pub fn namespace(&self, category: &CategoryConfig) -> OutputNamespace {
        OutputNamespace::new(self.output_root.join(&category.namespace))
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.concurrency > 0, "concurrency must be at least 1");
        ensure!(!self.link_prefix.is_empty(), "link_prefix must not be empty");
        ensure!(!self.categories.is_empty(), "no categories configured");
        self.source_url()?;

        let mut seen = HashSet::new();
        let mut dirs = HashSet::new();
        for c in &self.categories {
            if c.marker.trim().is_empty() {
                bail!("category {} has an empty marker", c.category);
            }
            if !seen.insert(c.category) {
                bail!("category {} configured twice", c.category);
            }
            if !dirs.insert(&c.namespace) {
                bail!("namespace {} shared by several categories", c.namespace.display());
            }
        }
        Ok(())
    }
}
