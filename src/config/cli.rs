use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "module-di")]
#[command(about = "Declare modules, bootstrap them and report what was resolved")]
pub struct CliConfig {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Fail on the first resolution error instead of substituting null
    #[arg(long)]
    pub strict: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    /// Print the bootstrap report as JSON
    #[arg(long)]
    pub json: bool,

    /// Language configured on the greeting provider
    #[arg(long, default_value = "en")]
    pub lang: String,
}
