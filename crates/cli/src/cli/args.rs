pub use clap::Parser;

use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "robokit")]
#[command(about = "Robot identities, encrypted trade chat and attachments")]
pub struct Args {
    /// Coordinator URL (defaults to the configured coordinator)
    #[arg(long, global = true)]
    pub remote: Option<Url>,

    /// Path to the robokit state directory (defaults to ~/.robokit)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: crate::Command,
}
