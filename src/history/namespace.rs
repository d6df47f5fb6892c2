use anyhow::{Context, Result};
use glob::glob;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::{
    collections::BTreeSet,
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

use crate::process::{Period, TaggedTable};
use crate::schema::to_record_batch;

/// Output directory for one report category. Holds one
/// `{year}_{month}.parquet` per processed period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputNamespace {
    dir: PathBuf,
}

impl OutputNamespace {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the namespace directory if needed.
    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating namespace directory {:?}", &self.dir))
    }

    /// Where `period` is (or would be) stored. Used for both writes and lookups.
    pub fn artifact_path(&self, period: Period) -> PathBuf {
        self.dir.join(format!("{}.parquet", period.identifier()))
    }

    pub fn contains(&self, period: Period) -> bool {
        self.artifact_path(period).is_file()
    }

    /// Periods already stored, by scanning `*_*.parquet` file names.
    pub fn periods(&self) -> Result<BTreeSet<Period>> {
        let mut set = BTreeSet::new();
        let pattern = format!("{}/*_*.parquet", self.dir.display());
        for entry in glob(&pattern)? {
            let path = match entry {
                Ok(p) => p,
                Err(e) => {
                    warn!("cannot read glob entry: {:?}", e);
                    continue;
                }
            };
            if let Some(period) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(Period::from_identifier)
            {
                set.insert(period);
            }
        }
        Ok(set)
    }

    /// Write `table` as Snappy-compressed Parquet under its period, via a
    /// temp file renamed into place.
    pub fn write(&self, table: &TaggedTable) -> Result<PathBuf> {
        self.ensure()?;
        let final_path = self.artifact_path(table.period);
        let tmp_path = final_path.with_extension("parquet.tmp");

        let batch = to_record_batch(table)?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();

        let file = File::create(&tmp_path)
            .with_context(|| format!("could not create `{}`", tmp_path.display()))?;
        let written = (|| -> Result<()> {
            let mut writer =
                ArrowWriter::try_new(BufWriter::new(file), batch.schema(), Some(props))
                    .context("creating ArrowWriter")?;
            writer.write(&batch).context("writing record batch")?;
            writer.close().context("closing ArrowWriter")?;
            fs::rename(&tmp_path, &final_path).with_context(|| {
                format!(
                    "renaming `{}` → `{}`",
                    tmp_path.display(),
                    final_path.display()
                )
            })
        })();
        if let Err(e) = written {
            if let Err(rm) = fs::remove_file(&tmp_path) {
                warn!(path = %tmp_path.display(), error = %rm, "cannot remove partial file");
            }
            return Err(e);
        }

        debug!(path = %final_path.display(), rows = table.num_rows, "wrote period");
        Ok(final_path)
    }
}
