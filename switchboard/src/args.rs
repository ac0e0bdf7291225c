use std::path::PathBuf;

use clap::Parser;

/// Switchboard LLM client
#[derive(Debug, Parser)]
#[command(name = "switchboard", about = "Stream a completion from any configured model")]
pub struct Args {
    /// Path to configuration file [default: switchboard.toml if present]
    #[arg(short, long, env = "SWITCHBOARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Model identifier
    #[arg(short, long, env = "SWITCHBOARD_MODEL")]
    pub model: String,

    /// System prompt override
    #[arg(long)]
    pub system: Option<String>,

    /// Buffer the whole reply instead of streaming it
    #[arg(long)]
    pub no_stream: bool,

    /// Continue a paused response
    #[arg(long, value_name = "RESPONSE_ID", conflicts_with = "prompt")]
    pub resume: Option<String>,

    /// Approve a pending tool call
    #[arg(long, value_name = "ID", requires = "resume")]
    pub approve: Vec<String>,

    /// Deny a pending tool call
    #[arg(long, value_name = "ID", requires = "resume")]
    pub deny: Vec<String>,

    /// User message
    #[arg(required_unless_present = "resume")]
    pub prompt: Option<String>,
}
