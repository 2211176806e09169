// src/main.rs
use basket_table::api;
use basket_table::config::AppConfig;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    if let Err(err) = dotenvy::dotenv() {
        if !matches!(err, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            warn!(error = %err, "could not load .env");
        }
    }

    let app_config = AppConfig::from_env();
    let api_config = app_config.api.clone();
    let engine_config = app_config.engine.clone();

    info!("basket table service starting");
    if let Err(err) = api::start_api_server(api_config, engine_config).await {
        error!(error = %err, "basket table service stopped");
        std::process::exit(1);
    }
}
