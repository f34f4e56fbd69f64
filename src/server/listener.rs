use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{Instrument, info, info_span};

use crate::config::Config;
use crate::http::connection::{SessionSettings, serve_connection};
use crate::http::path::PathResolver;

/// Builds the shared session settings from the configuration.
pub fn session_settings(cfg: &Config) -> anyhow::Result<SessionSettings> {
    let resolver = PathResolver::new(&cfg.static_files.root).map_err(|e| {
        anyhow::anyhow!(
            "Invalid document root {}: {}",
            cfg.static_files.root.display(),
            e
        )
    })?;

    Ok(SessionSettings::new(resolver)
        .with_idle_timeout(cfg.static_files.idle_timeout())
        .with_max_header_bytes(cfg.static_files.max_header_bytes))
}

pub async fn run(cfg: &Config) -> anyhow::Result<()> {
    let settings = Arc::new(session_settings(cfg)?);
    let listener = TcpListener::bind(&cfg.server.listen_addr).await?;
    info!(
        addr = %listener.local_addr()?,
        root = %settings.resolver.root().display(),
        workers = cfg.server.workers,
        "Listening"
    );

    serve(listener, settings, cfg.server.workers).await
}

/// Accepts connections forever, servicing at most `workers` at a time.
///
/// Connections beyond that wait for a free worker; accepting never does.
pub async fn serve(
    listener: TcpListener,
    settings: Arc<SessionSettings>,
    workers: usize,
) -> anyhow::Result<()> {
    let pool = Arc::new(Semaphore::new(workers));

    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::error!(error = %e, "Failed to accept connection");
                tokio::time::sleep(Duration::from_millis(100)).await;
                continue;
            }
        };
        info!("Accepted connection from {}", peer);

        let pool = pool.clone();
        let settings = settings.clone();
        tokio::spawn(
            async move {
                let Ok(_permit) = pool.acquire_owned().await else {
                    return;
                };
                tracing::debug!("Servicing connection");
                serve_connection(socket, settings).await;
                tracing::debug!("Completed connection");
            }
            .instrument(info_span!("conn", %peer)),
        );
    }
}
