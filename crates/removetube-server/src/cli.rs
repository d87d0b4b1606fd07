//! Command-line interface

use clap::Parser;
use removetube_classifiers::Backend;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "removetube-server")]
#[command(about = "RemoveTube topic classification server", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "removetube.yaml")]
    pub config: String,

    /// Listen address
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Listen port
    #[arg(short = 'P', long, env = "PORT")]
    pub port: Option<u16>,

    /// Semantic backend: embedding, zero-shot or api
    #[arg(short, long)]
    pub backend: Option<Backend>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
