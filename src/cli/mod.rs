// CLI module for swcache
// Author: kelexine (https://github.com/kelexine)

use clap::Parser;
use std::path::PathBuf;

/// swcache - versioned offline cache controller and caching proxy
#[derive(Parser, Debug)]
#[command(name = "swcache", version, about, long_about = None)]
pub struct Args {
    /// Config file (default: ~/.swcache/config.toml, optional)
    #[arg(long, short, env = "SWCACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the listen port
    #[arg(long, short)]
    pub port: Option<u16>,

    /// Install and activate the configured generation, then exit
    #[arg(long)]
    pub install_only: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,
}
