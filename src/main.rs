use clap::Parser;
use scratch_harvest::core::engine::install_signal_handlers;
use scratch_harvest::core::fetcher::build_http_client;
use scratch_harvest::core::id_source::SourceSpec;
use scratch_harvest::core::session::SessionLayout;
use scratch_harvest::core::ConfigProvider;
use scratch_harvest::utils::{logger, validation::Validate};
use scratch_harvest::{
    CliConfig, DownloadEngine, HarvestError, LocalStorage, ScratchClient, SessionRecorder,
};
use std::path::Path;

fn fail(e: &HarvestError) -> ! {
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
    std::process::exit(e.exit_code().max(1));
}

async fn run(config: CliConfig) -> Result<(), HarvestError> {
    let toml = config.load_toml()?;
    let source = config.source_spec()?;

    let layout = SessionLayout::new(Path::new(config.output_dir()), chrono::Local::now());
    layout.create()?;
    logger::init_cli_logger(config.verbose, config.json_logs, Some(layout.log_path().as_path()))?;

    tracing::info!("Starting scratch-harvest session {}", layout.session);
    tracing::debug!("CLI config: {:?}", config);

    let download_client =
        build_http_client(config.request_timeout(), &toml.network.user_agent, None)?;
    let explore_proxy = config.explore_proxy(&toml);
    if let (SourceSpec::Explore(_), Some(proxy)) = (&source, &explore_proxy) {
        tracing::info!("Explore requests go through {}", proxy);
    }
    let explore_client = build_http_client(
        config.request_timeout(),
        &toml.network.user_agent,
        explore_proxy.as_deref(),
    )?;

    let mut ids = source.build(explore_client, &toml.endpoints.explore_url)?;

    let recorder = SessionRecorder::new(LocalStorage::new(&layout.session_dir), layout.clone());
    recorder.init().await?;

    let fetcher = ScratchClient::new(download_client, toml.endpoints.clone());
    let engine = DownloadEngine::new(fetcher, recorder, &config);
    install_signal_handlers(engine.stop_handle());

    let summary = engine.run(ids.as_mut()).await?;

    tracing::info!(
        "Session {} finished: {} downloaded, {} failed",
        summary.session,
        summary.downloaded,
        summary.failed
    );
    println!("{}", summary);
    Ok(())
}

#[tokio::main]
async fn main() {
    let config = CliConfig::parse();

    if let Err(e) = config.validate() {
        fail(&e);
    }

    if let Err(e) = run(config).await {
        tracing::error!(
            "❌ Session failed: {} (Severity: {:?})",
            e,
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
        fail(&e);
    }
}
