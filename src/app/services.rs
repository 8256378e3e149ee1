use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use thiserror::Error;
use uuid::Uuid;

use crate::adapters::db;
use crate::adapters::db::DbError;
use crate::app::config::PaymentSettings;
use crate::domain::catalog::cheapest_available;
use crate::domain::chat::{FALLBACK_REPLY, local_reply};
use crate::domain::models::{
    AgentLogEntry, ChargingRecommendation, ChargingSession, PaymentProof, PaymentRecord,
    PaymentRequest, SessionAdvice, SessionStatus, Station, VerificationOutcome, WalletInfo,
};
use crate::domain::payment_proof::{SimulatedVerification, verify_simulated};
use crate::domain::session_progress::{self, Clock, ProgressEvent, TimestampMs};

pub const DEFAULT_WALLET_ADDRESS: &str = "0x1234567890123456789012345678901234567890";
pub const RECOMMENDED_CHARGE_KWH: f64 = 10.0;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Station not found")]
    StationNotFound,
    #[error("Station not available")]
    StationUnavailable,
    #[error("Station is already charging another session")]
    StationBusy,
    #[error("charge amount must be a positive number of kWh")]
    InvalidAmount,
    #[error("No active session")]
    NoActiveSession,
    #[error("No active session with that ID found")]
    SessionMismatch,
    #[error("session is not awaiting payment")]
    PaymentNotExpected,
    #[error("session lock poisoned")]
    SessionLockPoisoned,
    #[error("database lock poisoned")]
    DbLockPoisoned,
    #[error("database operation failed: {0}")]
    Database(#[from] DbError),
}

pub trait LedgerQueryHandler {
    fn list_payments(&self) -> Result<Vec<PaymentRecord>, ServiceError>;
    fn list_agent_logs(&self) -> Result<Vec<AgentLogEntry>, ServiceError>;
    fn has_payment(&self, tx_hash: &str) -> Result<bool, ServiceError>;
}

pub trait LedgerCommandHandler {
    fn record_payment(&self, payment: &PaymentRecord) -> Result<i64, ServiceError>;
    fn record_agent_log(&self, entry: &AgentLogEntry) -> Result<i64, ServiceError>;
}

#[derive(Clone)]
pub struct SqliteLedgerService {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteLedgerService {
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    fn with_connection<T>(
        &self,
        op: impl FnOnce(&Connection) -> Result<T, DbError>,
    ) -> Result<T, ServiceError> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| ServiceError::DbLockPoisoned)?;
        op(&connection).map_err(ServiceError::from)
    }
}

impl LedgerQueryHandler for SqliteLedgerService {
    fn list_payments(&self) -> Result<Vec<PaymentRecord>, ServiceError> {
        self.with_connection(db::list_payments)
    }

    fn list_agent_logs(&self) -> Result<Vec<AgentLogEntry>, ServiceError> {
        self.with_connection(db::list_agent_logs)
    }

    fn has_payment(&self, tx_hash: &str) -> Result<bool, ServiceError> {
        self.with_connection(|connection| db::payment_exists(connection, tx_hash))
    }
}

impl LedgerCommandHandler for SqliteLedgerService {
    fn record_payment(&self, payment: &PaymentRecord) -> Result<i64, ServiceError> {
        self.with_connection(|connection| db::insert_payment(connection, payment))
    }

    fn record_agent_log(&self, entry: &AgentLogEntry) -> Result<i64, ServiceError> {
        self.with_connection(|connection| db::insert_agent_log(connection, entry))
    }
}

#[derive(Debug, Clone)]
pub struct StartSessionCommand {
    pub station_id: String,
    pub kwh: f64,
    pub wallet_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentReply {
    pub response: String,
    pub session_id: String,
}

type SharedClock = Arc<dyn Clock + Send + Sync>;

/// The mock charging backend: a fixed station catalog, one active session
/// slot and the payment/activity ledger.
#[derive(Clone)]
pub struct ChargingService {
    stations: Arc<Vec<Station>>,
    payment: PaymentSettings,
    active_session: Arc<Mutex<Option<ChargingSession>>>,
    ledger: SqliteLedgerService,
    clock: SharedClock,
}

impl ChargingService {
    pub fn new(
        stations: Vec<Station>,
        payment: PaymentSettings,
        ledger: SqliteLedgerService,
        clock: SharedClock,
    ) -> Self {
        Self {
            stations: Arc::new(stations),
            payment,
            active_session: Arc::new(Mutex::new(None)),
            ledger,
            clock,
        }
    }

    pub fn stations(&self) -> Vec<Station> {
        self.stations.as_ref().clone()
    }

    pub fn start_session(
        &self,
        command: &StartSessionCommand,
    ) -> Result<ChargingSession, ServiceError> {
        let station = self
            .stations
            .iter()
            .find(|station| station.id == command.station_id)
            .ok_or(ServiceError::StationNotFound)?;

        if !station.available {
            return Err(ServiceError::StationUnavailable);
        }
        if !command.kwh.is_finite() || command.kwh <= 0.0 {
            return Err(ServiceError::InvalidAmount);
        }

        let now = self.clock.now();
        let session = {
            let mut active = self.lock_session()?;
            if let Some(current) = active.as_ref()
                && current.station_id == station.id
                && current.status == SessionStatus::Charging
            {
                return Err(ServiceError::StationBusy);
            }

            let session = ChargingSession {
                id: format!("session-{}", short_id()),
                station_id: station.id.clone(),
                station_name: station.name.clone(),
                status: SessionStatus::AwaitingPayment,
                price: station.rate_kwh,
                start_time: now.to_iso8601(),
                charging_start_time: None,
                end_time: None,
                kwh_delivered: 0.0,
                kwh_total: command.kwh,
                time_elapsed: 0,
                current_amount: 0.0,
                payment: Some(self.payment_request(command.kwh)),
            };
            self.log_activity(
                now,
                "session_start",
                format!("Started charging session at {}", station.name),
            )?;
            *active = Some(session.clone());
            session
        };

        tracing::info!(
            session_id = %session.id,
            station_id = %station.id,
            kwh_total = session.kwh_total,
            wallet_address = command.wallet_address.as_deref().unwrap_or("-"),
            "charging session created"
        );

        Ok(session)
    }

    /// Returns the active session after advancing its simulated progress.
    pub fn current_session(&self) -> Result<ChargingSession, ServiceError> {
        let (session, event) = {
            let mut active = self.lock_session()?;
            let session = active.as_mut().ok_or(ServiceError::NoActiveSession)?;
            let event = session_progress::advance(session, self.clock.as_ref());
            (session.clone(), event)
        };

        if event == Some(ProgressEvent::Completed) {
            tracing::info!(
                session_id = %session.id,
                kwh = session.kwh_delivered,
                amount = session.current_amount,
                "charging session completed"
            );
            self.log_activity(
                self.clock.now(),
                "session_complete",
                format!("Completed charging session at {}", session.station_name),
            )?;
        }

        Ok(session)
    }

    pub fn stop_session(&self) -> Result<ChargingSession, ServiceError> {
        let session = {
            let mut active = self.lock_session()?;
            let mut session = active.take().ok_or(ServiceError::NoActiveSession)?;
            session_progress::stop(&mut session, self.clock.as_ref());
            session
        };

        tracing::info!(session_id = %session.id, "charging session stopped");
        self.log_activity(
            self.clock.now(),
            "session_stop",
            format!("Completed charging session at {}", session.station_name),
        )?;

        Ok(session)
    }

    /// The slot only moves to `charging` once the payment row is stored, so a
    /// failed write leaves the session awaiting payment.
    pub fn verify_payment(
        &self,
        session_id: &str,
        proof: &PaymentProof,
    ) -> Result<VerificationOutcome, ServiceError> {
        let now = self.clock.now();
        let mut active = self.lock_session()?;
        let current = active
            .as_ref()
            .filter(|session| session.id == session_id)
            .ok_or(ServiceError::SessionMismatch)?;

        if current.status != SessionStatus::AwaitingPayment {
            return Err(ServiceError::PaymentNotExpected);
        }

        let tx_hash = match verify_simulated(proof) {
            SimulatedVerification::Verified { tx_hash } => tx_hash,
            SimulatedVerification::Rejected { reason } => {
                tracing::warn!(session_id, reason = %reason, "payment proof rejected");
                return Ok(rejected(current, reason));
            }
        };
        if self.ledger.has_payment(&tx_hash)? {
            tracing::warn!(
                session_id,
                tx_hash = %tx_hash,
                "payment proof reuses a recorded transaction"
            );
            return Ok(rejected(
                current,
                format!("Transaction {tx_hash} has already been recorded"),
            ));
        }

        let mut session = current.clone();
        let (amount, currency) = match session.payment.as_mut() {
            Some(request) => {
                request.tx_hash = Some(tx_hash.clone());
                (request.amount, request.currency.clone())
            }
            None => (proof.amount, self.payment.currency.clone()),
        };
        session_progress::begin_charging(&mut session, self.clock.as_ref());

        let record = PaymentRecord {
            amount,
            currency,
            timestamp: now.unix_seconds(),
            tx_hash,
            session_id: session.id.clone(),
        };
        self.ledger.record_payment(&record)?;
        *active = Some(session.clone());
        drop(active);

        tracing::info!(
            session_id,
            tx_hash = %record.tx_hash,
            network = %self.payment.network,
            "simulated payment verified"
        );
        if let Err(error) = self.log_activity(
            now,
            "payment_verified",
            format!("Payment verified successfully: {}", record.tx_hash),
        ) {
            tracing::warn!(session_id, error = %error, "failed to log payment verification");
        }

        Ok(VerificationOutcome {
            verified: true,
            tx_hash: Some(record.tx_hash),
            session,
            error: None,
        })
    }

    /// Canned recommendation: the cheapest available station by crypto rate.
    pub fn recommendation(&self) -> Result<ChargingRecommendation, ServiceError> {
        let recommendation = match cheapest_available(&self.stations) {
            Some(station) => ChargingRecommendation {
                action: "charge".to_string(),
                station_id: Some(station.id.clone()),
                station_name: Some(station.name.clone()),
                recommended_kwh: RECOMMENDED_CHARGE_KWH,
                estimated_cost: Some(round_cents(RECOMMENDED_CHARGE_KWH * station.rate_crypto)),
                reasoning: format!(
                    "{} has the lowest rate among available stations at {} {} per kWh.",
                    station.name, station.rate_crypto, self.payment.currency
                ),
            },
            None => ChargingRecommendation {
                action: "wait".to_string(),
                station_id: None,
                station_name: None,
                recommended_kwh: RECOMMENDED_CHARGE_KWH,
                estimated_cost: None,
                reasoning: "No charging station is available right now.".to_string(),
            },
        };

        self.log_activity(
            self.clock.now(),
            "charging_recommendation",
            format!(
                "Agent recommended: {} at {}",
                recommendation.action,
                recommendation.station_id.as_deref().unwrap_or("none")
            ),
        )?;

        Ok(recommendation)
    }

    /// Reads the active session without advancing it.
    pub fn monitor_session(&self) -> Result<SessionAdvice, ServiceError> {
        let session = {
            let active = self.lock_session()?;
            active.clone().ok_or(ServiceError::NoActiveSession)?
        };

        let advice = SessionAdvice {
            advice: session_advice(&session),
            session_id: session.id,
            status: session.status,
            kwh_delivered: session.kwh_delivered,
            kwh_total: session.kwh_total,
            current_amount: session.current_amount,
        };

        self.log_activity(
            self.clock.now(),
            "session_monitoring",
            format!("Agent advice: {}", advice.advice),
        )?;

        Ok(advice)
    }

    pub fn payments(&self) -> Result<Vec<PaymentRecord>, ServiceError> {
        self.ledger.list_payments()
    }

    pub fn agent_logs(&self) -> Result<Vec<AgentLogEntry>, ServiceError> {
        self.ledger.list_agent_logs()
    }

    pub fn wallet_info(&self, wallet_address: Option<&str>) -> WalletInfo {
        let address = wallet_address
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_WALLET_ADDRESS);

        let mut balance = BTreeMap::new();
        balance.insert(self.payment.currency.clone(), "100.00".to_string());
        balance.insert("ETH".to_string(), "0.5".to_string());

        WalletInfo {
            address: address.to_string(),
            network: self.payment.network.clone(),
            balance,
            supports_x402: true,
            mode: "simulation".to_string(),
        }
    }

    pub fn agent_query(
        &self,
        prompt: &str,
        session_id: Option<&str>,
    ) -> Result<AgentReply, ServiceError> {
        let response = local_reply(prompt).unwrap_or(FALLBACK_REPLY).to_string();
        let session_id = session_id
            .map(ToString::to_string)
            .unwrap_or_else(|| format!("agent-{}", short_id()));

        self.log_activity(
            self.clock.now(),
            "agent_query",
            format!("User query: {prompt}"),
        )?;

        Ok(AgentReply {
            response,
            session_id,
        })
    }

    fn payment_request(&self, kwh: f64) -> PaymentRequest {
        let amount = round_cents(kwh * self.payment.rate_per_kwh);
        PaymentRequest {
            payment_id: format!("pay-{}", short_id()),
            amount,
            currency: self.payment.currency.clone(),
            recipient_address: self.payment.recipient.clone(),
            chain: self.payment.network.clone(),
            payment_url: format!(
                "https://wallet.coinbase.com/pay?amount={amount}&token={}&network={}",
                self.payment.currency, self.payment.network
            ),
            tx_hash: None,
        }
    }

    fn lock_session(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, Option<ChargingSession>>, ServiceError> {
        self.active_session
            .lock()
            .map_err(|_| ServiceError::SessionLockPoisoned)
    }

    fn log_activity(
        &self,
        at: TimestampMs,
        action: &str,
        details: String,
    ) -> Result<(), ServiceError> {
        self.ledger.record_agent_log(&AgentLogEntry {
            timestamp: at.to_iso8601(),
            action: action.to_string(),
            details,
        })?;
        Ok(())
    }
}

fn rejected(session: &ChargingSession, reason: String) -> VerificationOutcome {
    VerificationOutcome {
        verified: false,
        tx_hash: None,
        session: session.clone(),
        error: Some(reason),
    }
}

fn session_advice(session: &ChargingSession) -> String {
    match session.status {
        SessionStatus::AwaitingPayment => {
            "Payment is pending. Approve it in your wallet to start charging.".to_string()
        }
        SessionStatus::Charging => {
            let percent = if session.kwh_total > 0.0 {
                session.kwh_delivered / session.kwh_total * 100.0
            } else {
                0.0
            };
            let remaining = (session.kwh_total - session.kwh_delivered).max(0.0);
            format!("Charging is {percent:.0}% complete with {remaining:.2} kWh remaining.")
        }
        SessionStatus::Completed => {
            "Charging is complete. You can unplug your vehicle.".to_string()
        }
        SessionStatus::Error => {
            "The session stopped with an error. Start a new session to retry.".to_string()
        }
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn short_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}
