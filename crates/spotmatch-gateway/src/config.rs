//! Command line and configuration file loading.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use spotmatch_types::AppConfig;

#[derive(Debug, Parser)]
#[command(name = "spotmatch", version, about = "SpotMatch matching engine node")]
pub struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "SPOTMATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the listen address from the configuration.
    #[arg(long)]
    pub listen: Option<std::net::SocketAddr>,
}

impl Cli {
    pub fn load_config(&self) -> anyhow::Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => load(path)?,
            None => AppConfig::default(),
        };
        if let Some(listen) = self.listen {
            config.server.listen_addr = listen;
        }
        Ok(config)
    }
}

pub fn load(path: &Path) -> anyhow::Result<AppConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    parse(&raw).with_context(|| format!("parsing config {}", path.display()))
}

pub fn parse(raw: &str) -> anyhow::Result<AppConfig> {
    Ok(toml::from_str(raw)?)
}
