use anyhow::{Context, Result};
use std::path::PathBuf;

use metar_core::{App, Config, EntityState};
use metar_weather::MetarPlatform;

fn log_states(states: &[EntityState]) {
    for state in states {
        match serde_json::to_string(state) {
            Ok(json) => tracing::info!(target: "metar_daemon::state", "{}", json),
            Err(e) => tracing::warn!("Failed to serialize state of {}: {}", state.unique_id, e),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    metar_core::init()?;

    // Optional explicit config path, otherwise the per-user default
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let (config, _validation) =
        Config::load_validated(config_path.as_deref()).context("Failed to load configuration")?;

    let mut app = App::new(config);
    app.register_platform(Box::new(MetarPlatform));
    app.initialize()
        .await
        .map_err(|e| anyhow::anyhow!("{} ({})", e, e.user_message()))?;

    tracing::info!("METAR sensors started with {} entities", app.registry().len());
    log_states(&app.states());

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    app.run(shutdown, log_states)
        .await
        .map_err(|e| anyhow::anyhow!("{} ({})", e, e.user_message()))?;

    app.shutdown();
    Ok(())
}
