pub mod agent;
pub mod config;
mod error;
mod logging;
pub mod runtime;
pub mod services;

pub use error::AppError;

pub fn run_api() -> Result<(), AppError> {
    logging::init()?;

    let config = config::ApiConfig::from_env()?;

    tracing::info!(
        http_bind = %config.http_bind,
        db_path = %config.db_path,
        rate_per_kwh = config.payment.rate_per_kwh,
        currency = %config.payment.currency,
        network = %config.payment.network,
        "api bootstrap initialized"
    );

    runtime::run_api(config)
}

pub fn run_agent() -> Result<(), AppError> {
    logging::init()?;

    let config = config::AgentConfig::from_env()?;

    tracing::info!(
        api_url = %config.api_url,
        poll_interval_ms = config.poll_interval_ms,
        charge_kwh = config.charge_kwh,
        station_id = config.station_id.as_deref().unwrap_or("auto"),
        "agent bootstrap initialized"
    );

    runtime::run_agent(config)
}
