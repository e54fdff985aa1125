use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "hydrorisk")]
#[command(author = "Hydrorisk Team")]
#[command(version)]
#[command(about = "Dam-failure risk scoring service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config directory (default.toml plus per-environment overrides)
    #[arg(short, long, default_value = "config", env = "HYDRORISK_CONFIG_DIR")]
    pub config: PathBuf,

    /// Model manifest, overrides `model.manifest_path`
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API
    Serve,
    /// Score one feature set read as JSON
    Predict {
        /// JSON file with the 13 input fields, `-` for stdin
        #[arg(short, long, default_value = "-")]
        input: String,
    },
    /// Print the model manifest and expected column order
    Inspect,
}
