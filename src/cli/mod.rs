use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::platform::PlatformKind;

#[derive(Parser)]
#[command(name = "llmstack")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Options shared by commands that read a stack declaration
#[derive(Args, Debug, Clone)]
pub struct StackArgs {
    /// Path to the stack config (TOML)
    #[arg(short, long, env = "LLMSTACK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the deployment target
    #[arg(long, value_enum)]
    pub platform: Option<PlatformKind>,

    /// Override the region
    #[arg(long)]
    pub region: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the resources a stack would provision, as JSON
    Plan {
        #[command(flatten)]
        stack: StackArgs,
    },

    /// Provision the stack, writing one manifest per resource
    Apply {
        #[command(flatten)]
        stack: StackArgs,

        /// Directory receiving the resource manifests
        #[arg(short, long, default_value = "manifests")]
        out: PathBuf,

        /// Skip pulling the model into the model server
        #[arg(long)]
        no_preload: bool,
    },

    /// Ask a running model server to pull a model
    Preload {
        /// Base URL of the model server
        #[arg(long)]
        url: String,

        /// Model identifier
        #[arg(long, default_value = crate::constants::defaults::MODEL)]
        model: String,

        /// Number of attempts before giving up
        #[arg(long, default_value_t = 5)]
        attempts: u32,

        /// Seconds to wait between attempts
        #[arg(long, default_value_t = 5)]
        delay_secs: u64,
    },

    /// Show version information
    Version,
}
