use anyhow::{Context, Result};
use reqwest::Client;
use std::{env, path::Path, sync::Arc, time::Instant};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};
use visascraper::{config::Config, extract::TabulaExtractor, fetch::HttpSource, pipeline::Pipeline};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) pick configs: `iv`, `niv`, a YAML path, or both presets ──
    let configs = match env::args().nth(1) {
        None => vec![Config::immigrant(), Config::nonimmigrant()],
        Some(arg) => match Config::preset(&arg) {
            Some(preset) => vec![preset],
            None => vec![Config::load(Path::new(&arg))?],
        },
    };

    // ─── 3) shared clients ───────────────────────────────────────────
    let source = HttpSource::new(Client::new());
    let extractor = Arc::new(TabulaExtractor::from_env());

    // ─── 4) run each listing page ────────────────────────────────────
    let mut failed = 0;
    for config in configs {
        config.validate()?;
        let url = config.source_url.clone();
        let start = Instant::now();
        let pipeline = Pipeline::new(config, Arc::clone(&extractor));
        let summary = pipeline
            .run(&source)
            .await
            .with_context(|| format!("run for {}", url))?;
        info!(
            source = %url,
            written = summary.written(),
            failed = summary.failed(),
            elapsed = ?start.elapsed(),
            "source done"
        );
        failed += summary.failed();
    }

    if failed > 0 {
        error!("{} documents failed; see log above", failed);
    }
    info!("all done");
    Ok(())
}
