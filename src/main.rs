use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::SystemTime;

use cassette::{
    create_state, Config, CoverArtStore, MetadataPipeline, MetadataReader, NowPlayingView,
    PathSource, PayloadProcessor,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting cassette metadata reader");

    let config = Config::load().context("Failed to load configuration")?;

    // Create shared state
    let state = create_state();

    let covers = CoverArtStore::new(&config.cover_art_dir);
    if let Err(e) = covers.ensure_dir() {
        // Saving retries the directory, so keep going
        log::warn!("Cover art directory unavailable: {}", e);
    }

    let pipeline = MetadataPipeline::new(
        config.field_table(),
        PayloadProcessor::new(state.clone(), covers),
        config.max_frame_bytes,
    );
    let source = Arc::new(PathSource::new(&config.pipe_path));
    let reader = MetadataReader::spawn(source, pipeline, config.reader_timing())
        .context("Failed to spawn metadata reader thread")?;

    // Setup signal handler for Ctrl+C (SIGINT) and SIGTERM
    let shutdown = reader.cancel_token();
    ctrlc::set_handler(move || {
        log::info!("Received interrupt signal (Ctrl+C), shutting down...");
        shutdown.cancel();
    })
    .context("Failed to set Ctrl+C handler")?;

    let options = config.view_options();
    let cancel = reader.cancel_token();
    let mut ticker = tokio::time::interval(config.refresh_interval());
    let mut shown: Option<NowPlayingView> = None;

    while !cancel.is_cancelled() {
        ticker.tick().await;

        let view = NowPlayingView::resolve(&state.snapshot(), SystemTime::now(), &options);
        if shown.as_ref() != Some(&view) {
            println!(
                "{}",
                serde_json::to_string(&view).context("Failed to serialize view")?
            );
            shown = Some(view);
        }
    }

    if !reader.stop() {
        log::warn!("Exiting with metadata reader still blocked");
    }

    Ok(())
}
