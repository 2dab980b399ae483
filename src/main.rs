use anyhow::Context;
use clap::Parser;
use market_scraper::{
    api::{self, AppState},
    config::{Config, FetcherKind},
    fetchers::{HttpFetcher, WebDriverFetcher},
    telemetry, Extractor, PageFetcher, SnapshotStore, UpdateLoop,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing("market_scraper=info,tower_http=info");

    let cfg = Config::parse();

    let extractor = Extractor::new(&cfg.row_selector)?.with_max_rows(cfg.max_rows);

    let fetcher: Arc<dyn PageFetcher> = match cfg.fetcher {
        FetcherKind::Webdriver => Arc::new(
            WebDriverFetcher::new(&cfg.webdriver_url, extractor.clone())?
                .with_render_timeout(cfg.render_timeout())
                .with_page_load_timeout(cfg.page_load_timeout()),
        ),
        FetcherKind::Http => Arc::new(HttpFetcher::new(extractor.clone())?),
    };

    let store = Arc::new(SnapshotStore::new(&cfg.output).with_backup(cfg.backup_path()));
    if store.exists() {
        tracing::info!(output = %cfg.output.display(), "Serving existing snapshot until the first scrape");
    } else {
        tracing::info!(output = %cfg.output.display(), "No snapshot yet, /latest answers 503 until the first scrape");
    }

    let updater = UpdateLoop::new(fetcher, extractor, store.clone(), &cfg.target_url)
        .with_interval(cfg.interval())
        .with_retry_delay(cfg.retry_delay());
    let metrics = updater.metrics();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let loop_handle = updater.spawn(shutdown_rx.clone());

    let app = api::app(AppState::new(store, metrics, cfg.stale_after()));
    let addr = cfg.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!(%addr, output = %cfg.output.display(), "API server listening");

    let mut server_shutdown = shutdown_rx;
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = server_shutdown.wait_for(|stop| *stop).await;
    });

    tokio::spawn(async move {
        match shutdown_signal().await {
            Ok(()) => {
                tracing::info!("Shutdown signal received");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                // Keep the sender alive so the server and loop run on.
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
                drop(shutdown_tx);
            }
        }
    });

    server.await?;
    loop_handle.await?;
    tracing::info!("Exiting");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result,
            _ = terminate.recv() => Ok(()),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
