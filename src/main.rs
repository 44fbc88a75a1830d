use clap::Parser;
use scrape_rss::utils::error::ErrorSeverity;
use scrape_rss::utils::monitor::ResourceMonitor;
use scrape_rss::utils::{logger, validation::Validate};
use scrape_rss::{
    create_router, router_factory, serve_bare, AppState, Arbiter, CliConfig, FeedCache, RunMode,
    ScrapeError, Settings,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 載入設定：預設值 < TOML < 命令列
    let settings = match cli.resolve() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    logger::init_logger(settings.logging.format, settings.logging.verbose);
    tracing::info!("Starting scrape-rss {}", env!("CARGO_PKG_VERSION"));
    tracing::debug!("Resolved settings: {:?}", settings);

    if let Err(e) = settings.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if let Err(e) = run(settings).await {
        tracing::error!(
            "❌ Server failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

async fn run(settings: Settings) -> scrape_rss::Result<()> {
    let addr = settings.server.socket_addr()?;
    let cache = Arc::new(FeedCache::new(
        settings.cache.ttl(),
        settings.cache.max_entries,
    ));
    let monitor = Arc::new(ResourceMonitor::new(settings.logging.monitor));
    if monitor.is_enabled() {
        tracing::info!("🔍 System monitoring enabled");
    }

    let listener = std::net::TcpListener::bind(addr).map_err(|e| ScrapeError::ServerError {
        message: format!("cannot bind {}: {}", addr, e),
    })?;

    match settings.server.mode {
        RunMode::Managed => {
            let arbiter = Arbiter::new(
                settings.workers.clone(),
                router_factory(settings.clone(), cache),
            )
            .with_monitor(monitor);
            let report = arbiter.run(listener, shutdown_signal()).await?;
            tracing::info!(
                "✅ Served {} request(s), {} worker(s) recycled",
                report.requests,
                report.recycled
            );
        }
        RunMode::Bare => {
            listener.set_nonblocking(true)?;
            let listener = tokio::net::TcpListener::from_std(listener)?;
            let state = AppState::from_settings(&settings, cache)?;
            serve_bare(listener, create_router(Arc::new(state)), shutdown_signal()).await?;
            monitor.log_stats("shutdown");
        }
    }

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}
