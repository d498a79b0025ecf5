//! coachdesk server binary

use anyhow::Context;
use office_server::api::receipts;
use office_server::store::{DocumentStore, MemoryStore, SqliteStore};
use office_server::{create_router, logging, AppState, Config};
use receipt::{ReceiptFonts, ReceiptRenderer};
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let _ = dotenv::dotenv();

    let config = Config::from_env().context("invalid configuration")?;
    logging::init(config.log_format)?;

    info!(
        environment = config.environment.as_str(),
        allowed = config.allowed_emails.len(),
        "starting coachdesk"
    );
    if config.is_development() {
        warn!("development mode: the access gate allows every request");
    }

    let store: Arc<dyn DocumentStore> = match &config.database_url {
        Some(url) => {
            let store = SqliteStore::connect(url)
                .await
                .with_context(|| format!("failed to open database {url}"))?;
            Arc::new(store)
        }
        None => {
            warn!("DATABASE_URL not set, records are kept in memory and lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let renderer = load_renderer(&config)?;
    let http_addr = config.http_addr;
    let state = AppState::new(config, store, renderer);
    let claimed = receipts::claim_existing_numbers(&state.receipts())
        .await
        .context("failed to claim stored receipt numbers")?;
    info!(claimed, "receipt numbers claimed");
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(http_addr)
        .await
        .with_context(|| format!("failed to bind {http_addr}"))?;
    info!(%http_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutdown complete");
    Ok(())
}

fn load_renderer(config: &Config) -> anyhow::Result<Option<ReceiptRenderer>> {
    let Some(regular_path) = &config.font_regular else {
        warn!("FONT_REGULAR not set, receipt PDF and preview are disabled");
        return Ok(None);
    };

    let regular = std::fs::read(regular_path)
        .with_context(|| format!("failed to read font {}", regular_path.display()))?;
    let bold = config
        .font_bold
        .as_ref()
        .map(|path| {
            std::fs::read(path).with_context(|| format!("failed to read font {}", path.display()))
        })
        .transpose()?;

    let fonts = ReceiptFonts::load(regular, bold).context("failed to load receipt fonts")?;
    info!(bold = fonts.has_bold(), "receipt fonts loaded");
    Ok(Some(ReceiptRenderer::new(&fonts)))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
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
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
