//! Inference gateway.
//!
//! A reverse proxy in front of a pool of model-serving backends.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────┐
//!                     │                 INFERENCE GATEWAY                    │
//!                     │                                                      │
//!   Client Request    │  ┌───────────────┐  ┌──────────┐  ┌────────────┐     │
//!   ──────────────────┼─▶│ observability │─▶│ identity │─▶│ rate limit │──┐  │
//!                     │  └───────────────┘  └──────────┘  └────────────┘  │  │
//!                     │                                                   ▼  │
//!                     │                  ┌──────────────┐   ┌────────────┐   │
//!                     │                  │ admin routes │   │  proxy /   │   │
//!                     │                  └──────────────┘   └─────┬──────┘   │
//!                     │                                           ▼          │
//!                     │  ┌──────────┐  probes  ┌──────────────────────────┐  │
//!                     │  │  health  │─────────▶│  server pool (rotation)  │──┼──▶ Backends
//!                     │  │  prober  │          └──────────────────────────┘  │
//!                     │  └──────────┘                                        │
//!                     │  ┌────────────────────────────────────────────────┐  │
//!                     │  │ config store · logging · metrics · lifecycle   │  │
//!                     │  └────────────────────────────────────────────────┘  │
//!                     └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use inference_gateway::lifecycle::startup::{self, StartupOptions};

#[derive(Parser)]
#[command(name = "inference-gateway")]
#[command(about = "Reverse proxy gateway for inference backends", long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "gateway.toml")]
    config: PathBuf,

    /// Reload the configuration when the file changes
    #[arg(short, long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    startup::run(StartupOptions {
        config_path: args.config,
        watch: args.watch,
    })
    .await?;

    Ok(())
}
