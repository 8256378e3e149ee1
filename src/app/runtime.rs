use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Utc;

use crate::adapters::api::{ApiState, configure_routes};
use crate::adapters::backend_client::HttpChargingBackend;
use crate::adapters::db::{open_connection, run_migrations};
use crate::app::agent::{ChargingFlow, start_progress_poller};
use crate::app::config::{AgentConfig, ApiConfig};
use crate::app::error::AppError;
use crate::app::services::{ChargingService, SqliteLedgerService};
use crate::domain::catalog::{cheapest_available, default_stations};
use crate::domain::session_progress::{Clock, TimestampMs};
use crate::domain::stepper::Step;

#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> TimestampMs {
        TimestampMs(Utc::now().timestamp_millis())
    }
}

pub fn run_api(config: ApiConfig) -> Result<(), AppError> {
    if let Some(parent) = std::path::Path::new(&config.db_path).parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(AppError::database_init)?;
    }

    let mut connection = open_connection(&config.db_path).map_err(AppError::database_init)?;
    run_migrations(&mut connection).map_err(AppError::database_init)?;

    let ledger = SqliteLedgerService::new(Arc::new(Mutex::new(connection)));
    let api_state = ApiState {
        charging: ChargingService::new(
            default_stations(),
            config.payment.clone(),
            ledger,
            Arc::new(SystemClock),
        ),
    };

    tracing::info!(bind = %config.http_bind, "http server starting");

    actix_web::rt::System::new()
        .block_on(async move {
            HttpServer::new(move || {
                App::new()
                    .wrap(Cors::permissive())
                    .wrap(Logger::default())
                    .app_data(web::Data::new(api_state.clone()))
                    .configure(configure_routes)
            })
            .bind(&config.http_bind)?
            .run()
            .await
        })
        .map_err(AppError::runtime)
}

/// Walks the whole stepper once: discover, select, start, pay, then poll
/// until the backend reports the session finished.
pub fn run_agent(config: AgentConfig) -> Result<(), AppError> {
    let backend = HttpChargingBackend::new(&config.api_url).map_err(AppError::runtime)?;
    let mut flow = ChargingFlow::new(backend, SystemClock);

    let stations = flow.discover().map_err(AppError::runtime)?;
    let station_id = match config.station_id.as_deref() {
        Some(id) => id.to_string(),
        None => cheapest_available(stations)
            .map(|station| station.id.clone())
            .ok_or_else(|| AppError::runtime("no available charging station"))?,
    };

    flow.select_station(&station_id)
        .map_err(AppError::runtime)?;
    flow.start_session(config.charge_kwh, config.wallet_address.as_deref())
        .map_err(AppError::runtime)?;

    if flow.stepper().step() == Step::Payment {
        flow.pay().map_err(AppError::runtime)?;
    }

    let flow = Arc::new(Mutex::new(flow));
    let stop_flag = Arc::new(AtomicBool::new(false));
    let poller_handle = start_progress_poller(
        Arc::clone(&flow),
        Duration::from_millis(config.poll_interval_ms),
        Arc::clone(&stop_flag),
    );

    let join_result = poller_handle.join();
    stop_flag.store(true, Ordering::Relaxed);
    if join_result.is_err() {
        return Err(AppError::runtime("poller thread panicked"));
    }

    let mut flow = flow
        .lock()
        .map_err(|_| AppError::runtime("charging flow lock poisoned"))?;

    if let Some(session) = flow.stepper().session() {
        tracing::info!(
            session_id = %session.id,
            status = session.status.as_str(),
            kwh_delivered = session.kwh_delivered,
            amount = session.current_amount,
            "charging flow finished"
        );
    }

    match flow.payments() {
        Ok(payments) => tracing::info!(count = payments.len(), "payment history loaded"),
        Err(error) => tracing::warn!(error = %error, "failed to load payment history"),
    }

    Ok(())
}
