//! homedeck library
//!
//! Wires the crates together: configuration, logging, the host connection,
//! the cloud client and the dispatcher.

use std::path::PathBuf;
use std::sync::Arc;

use homedeck_app::{load_config, Engine, PluginConfig, PluginContext, CONFIG_FILENAME};
use homedeck_cloud::{SmartHomeApi, YandexClient};
use homedeck_core::logging;
use homedeck_core::prelude::*;
use homedeck_host::{HostClient, LaunchArgs};

pub use homedeck_app as app;
pub use homedeck_cloud as cloud;
pub use homedeck_core as core;
pub use homedeck_host as host;

/// Run the plugin with the production cloud client.
///
/// Returns only on failure; losing the host connection is
/// [`Error::ConnectionClosed`].
pub async fn run(args: LaunchArgs) -> Result<()> {
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILENAME));
    let (config, problem) = load_config(&config_path);

    logging::init(&config.logging.directory, Some(&config.logging.filter))?;
    if let Some(problem) = problem {
        warn!("{}, using defaults", problem);
    }
    info!("Host language: {:?}", args.language());

    let api = YandexClient::new(&config.api.base_url, config.api.timeout())
        .context("Failed to build the cloud client")?;
    match serve(&args, &config, api).await {
        Err(e) if e.is_fatal() => {
            info!("Plugin stopping ({}), the host will restart it", e);
            Err(e)
        }
        other => other,
    }
}

/// Connect to the host and dispatch frames until the connection ends.
pub async fn serve<A>(args: &LaunchArgs, config: &PluginConfig, api: A) -> Result<()>
where
    A: SmartHomeApi + Send + Sync + 'static,
{
    let client = HostClient::connect(args.port, &args.plugin_uuid, &args.register_event)
        .await
        .with_context(|| format!("Failed to connect to the host on port {}", args.port))?;
    let (sender, mut events) = client.into_parts();

    let ctx = PluginContext::new(sender, Arc::new(api), config.polling.interval());
    let engine = Engine::new(ctx);
    engine.run(&mut events).await
}
