use static_httpd::config::Config;
use static_httpd::server;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let mut cfg = Config::load()?;

    // Optional port argument, e.g. `static-httpd 8081`.
    if let Some(arg) = std::env::args().nth(1) {
        let port: u16 = arg
            .parse()
            .map_err(|_| anyhow::anyhow!("Argument {arg} must be a port number"))?;
        cfg.set_port(port);
    }

    tokio::select! {
        res = server::listener::run(&cfg) => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
