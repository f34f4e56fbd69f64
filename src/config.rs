use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::http::connection::DEFAULT_MAX_HEADER_BYTES;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub static_files: StaticFilesConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Number of connections serviced in parallel.
    pub workers: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    /// Document root. Nothing outside it is ever served.
    pub root: PathBuf,
    /// Idle read timeout before a client negotiates its own; 0 disables it.
    pub idle_timeout_secs: u64,
    pub max_header_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            workers: 10,
        }
    }
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("public"),
            idle_timeout_secs: 30,
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
        }
    }
}

impl StaticFilesConfig {
    pub fn idle_timeout(&self) -> Option<Duration> {
        match self.idle_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

impl Config {
    /// Loads the configuration.
    ///
    /// Starts from the YAML file named by `HTTPD_CONFIG`, or the defaults when
    /// it is unset, then applies the `LISTEN`, `HTTPD_ROOT` and
    /// `HTTPD_WORKERS` environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var_os("HTTPD_CONFIG") {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };

        if let Ok(listen_addr) = std::env::var("LISTEN") {
            cfg.server.listen_addr = listen_addr;
        }
        if let Some(root) = std::env::var_os("HTTPD_ROOT") {
            cfg.static_files.root = PathBuf::from(root);
        }
        if let Ok(workers) = std::env::var("HTTPD_WORKERS") {
            cfg.server.workers = workers
                .parse()
                .with_context(|| format!("HTTPD_WORKERS must be a number, got {workers:?}"))?;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_yaml_str(content: &str) -> anyhow::Result<Self> {
        let cfg: Config = serde_yaml::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Replaces the port of the listen address, keeping the host.
    pub fn set_port(&mut self, port: u16) {
        let host = match self.server.listen_addr.rsplit_once(':') {
            Some((host, _)) => host,
            None => self.server.listen_addr.as_str(),
        };
        self.server.listen_addr = format!("{host}:{port}");
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.workers == 0 {
            anyhow::bail!("server.workers must be at least 1");
        }
        if self.static_files.max_header_bytes < 64 {
            anyhow::bail!("static_files.max_header_bytes must be at least 64");
        }
        Ok(())
    }
}
