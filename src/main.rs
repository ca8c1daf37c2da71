//! camrt - probe the camera runtime lifecycle
//!
//! This is the binary entry point. All logic lives in the library.

use std::path::PathBuf;

use clap::Parser;

use camera_runtime::RunOptions;
use camrt_app::config::ExecutorKind;
use camrt_core::LensFacing;

/// camrt - configure, initialize and shut down the camera runtime once
#[derive(Parser, Debug)]
#[command(name = "camrt")]
#[command(about = "Probe the camera runtime lifecycle", long_about = None)]
struct Args {
    /// Project directory containing .camrt/config.toml
    #[arg(value_name = "PATH")]
    path: Option<PathBuf>,

    /// Executor for provider resolution and teardown (default, direct, thread, tokio)
    #[arg(long)]
    executor: Option<ExecutorKind>,

    /// Emit NDJSON events instead of text
    #[arg(long)]
    json: bool,

    /// Report whether a camera with this lens facing is available
    #[arg(long, value_name = "FACING")]
    select: Option<LensFacing>,

    /// Write a default .camrt/config.toml if missing
    #[arg(long)]
    init: bool,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    // Get base path from args or use current directory
    let project_path = args
        .path
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let options = RunOptions {
        executor: args.executor,
        json: args.json,
        select: args.select,
        init_config: args.init,
    };

    camera_runtime::run(&project_path, options).await?;
    Ok(())
}
