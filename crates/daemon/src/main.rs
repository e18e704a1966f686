// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! fleetops daemon entry point. Reads configuration from the environment,
//! wires up the task execution plane, and keeps it running until signalled
//! to stop. Submitting work happens out of band (the library this binary
//! depends on exposes `TaskQueue::submit` directly); this process exists to
//! host the dispatch loop and the warm pool.

use fleetops_daemon::{init_logging, App};
use fleetops_engine::Settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let settings = Settings::from_env();
    let github_token = std::env::var("FLEETOPS_GITHUB_TOKEN")
        .map_err(|_| "FLEETOPS_GITHUB_TOKEN must be set")?;

    let app = App::build(settings, github_token).await?;
    tracing::info!("fleetops daemon started");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    app.shutdown().await;

    Ok(())
}
