// src/history/mod.rs

pub mod namespace;

pub use namespace::OutputNamespace;

use tracing::info;

use crate::process::{tag_period, PeriodError};

/// True when the period named by `label` already has an artifact in `ns`.
///
/// A label with no recognizable period is an error, never "absent": the
/// caller decides whether to skip it.
pub fn already_present(label: &str, ns: &OutputNamespace) -> Result<bool, PeriodError> {
    let period = tag_period(label)?;
    let present = ns.contains(period);
    if present {
        info!(%label, %period, dir = %ns.dir().display(), "already processed, skipping");
    }
    Ok(present)
}
