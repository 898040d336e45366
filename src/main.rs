// Entrypoint for the coupon assigner.
// - Keeps `main` small: load config, build the API client and session, and
//   hand them to the UI loop.
// - Diagnostics go to stderr through `tracing`; set RUST_LOG=debug to see them.

use coupon_assigner::{session::Session, ui::main_menu, ApiClient, AppConfig};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    // Falls back to built-in defaults when no config.json is found.
    let config = AppConfig::load()?;
    tracing::info!(base_url = %config.api.base_url, "Configuration loaded");

    let api = ApiClient::new(&config.api)?;
    let (session, events) = Session::new(api, config.features.clone());

    // Blocks until the operator exits.
    main_menu(&config, session, events)?;
    Ok(())
}
