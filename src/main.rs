use anyhow::Context;
use clap::Parser;
use mdgate::{
    config::{CliArgs, Settings},
    fetch::HttpFetcher,
    markdown::ComrakConverter,
    render::Pipeline,
    server, telemetry,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    telemetry::init(&args.log_level).context("failed to install tracing subscriber")?;

    let settings = Settings::from_cli(&args).context("invalid configuration")?;
    let fetcher = HttpFetcher::new(&settings.fetch)?;
    let converter = ComrakConverter::new(&settings.extensions, settings.unsafe_html);

    let addr = settings.listen;
    info!(%addr, root = %settings.document_root.display(), "listening");

    let pipeline = Pipeline::new(Arc::new(settings), Arc::new(fetcher), Arc::new(converter));
    axum::Server::bind(&addr)
        .serve(server::router(Arc::new(pipeline)).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
