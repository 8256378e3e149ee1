use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};
use std::thread::JoinHandle;
use std::time::Duration;

use thiserror::Error;

use crate::adapters::backend_client::{BackendError, ChargingBackend};
use crate::domain::chat::local_reply;
use crate::domain::models::{ChargingSession, PaymentRecord, Station};
use crate::domain::payment_proof::fabricate_proof;
use crate::domain::session_progress::Clock;
use crate::domain::stepper::{SessionStepper, Step, StepperError};

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("{0}")]
    Backend(#[from] BackendError),
    #[error("{0}")]
    Stepper(#[from] StepperError),
    #[error("station {0} is not in the discovered list")]
    UnknownStation(String),
    #[error("no station selected")]
    NoStationSelected,
    #[error("no active session")]
    NoActiveSession,
    #[error("session {0} has no payment request")]
    MissingPaymentRequest(String),
    #[error("flow lock poisoned")]
    LockPoisoned,
}

/// Drives the stepper against a backend. Every failure lands on the
/// stepper's error banner and leaves the step where it was.
pub struct ChargingFlow<B, Cl> {
    backend: B,
    clock: Cl,
    stepper: SessionStepper,
    stations: Vec<Station>,
}

impl<B, Cl> ChargingFlow<B, Cl>
where
    B: ChargingBackend,
    Cl: Clock,
{
    pub fn new(backend: B, clock: Cl) -> Self {
        Self {
            backend,
            clock,
            stepper: SessionStepper::new(),
            stations: Vec::new(),
        }
    }

    pub fn stepper(&self) -> &SessionStepper {
        &self.stepper
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn discover(&mut self) -> Result<&[Station], FlowError> {
        let stations = self.backend.discover().map_err(|error| self.fail(error))?;
        tracing::info!(count = stations.len(), "stations discovered");
        self.stations = stations;
        Ok(&self.stations)
    }

    pub fn select_station(&mut self, station_id: &str) -> Result<(), FlowError> {
        let Some(station) = self
            .stations
            .iter()
            .find(|station| station.id == station_id)
            .cloned()
        else {
            return Err(self.fail(FlowError::UnknownStation(station_id.to_string())));
        };

        self.stepper.select_station(&station)?;
        tracing::info!(station_id, station = %station.name, "station selected");
        Ok(())
    }

    pub fn start_session(
        &mut self,
        kwh: f64,
        wallet_address: Option<&str>,
    ) -> Result<&ChargingSession, FlowError> {
        let step = self.stepper.step();
        if step != Step::Initiate {
            return Err(self.fail(StepperError::WrongStep { step }));
        }
        let station_id = match self.stepper.station() {
            Some(station) => station.id.clone(),
            None => return Err(self.fail(FlowError::NoStationSelected)),
        };

        let session = self
            .backend
            .start_session(&station_id, kwh, wallet_address)
            .map_err(|error| self.fail(error))?;

        tracing::info!(
            session_id = %session.id,
            status = session.status.as_str(),
            "charging session started"
        );
        self.stepper.session_started(session)?;
        self.stepper.session().ok_or(FlowError::NoActiveSession)
    }

    /// Fabricates a proof for the session's payment request and submits it.
    pub fn pay(&mut self) -> Result<(), FlowError> {
        let (session_id, request) = match self.stepper.session() {
            Some(session) => match session.payment.clone() {
                Some(request) => (session.id.clone(), request),
                None => {
                    let error = FlowError::MissingPaymentRequest(session.id.clone());
                    return Err(self.fail(error));
                }
            },
            None => return Err(self.fail(FlowError::NoActiveSession)),
        };

        let proof = fabricate_proof(&request, self.clock.now());
        let outcome = self
            .backend
            .verify_payment(&session_id, &proof)
            .map_err(|error| self.fail(error))?;

        let verified = outcome.verified;
        self.stepper.payment_settled(outcome)?;
        tracing::info!(
            session_id = %session_id,
            verified,
            tx_hash = self.stepper.payment_tx_hash().unwrap_or("-"),
            "payment submitted"
        );
        Ok(())
    }

    pub fn should_poll(&self) -> bool {
        self.stepper.should_poll()
    }

    pub fn poll_once(&mut self) -> Result<(), FlowError> {
        let session = self
            .backend
            .current_session()
            .map_err(|error| self.fail(error))?;

        tracing::info!(
            session_id = %session.id,
            status = session.status.as_str(),
            kwh_delivered = session.kwh_delivered,
            kwh_total = session.kwh_total,
            time_elapsed = session.time_elapsed,
            "session progress"
        );
        self.stepper.session_polled(session);
        Ok(())
    }

    pub fn payments(&mut self) -> Result<Vec<PaymentRecord>, FlowError> {
        self.backend.payments().map_err(|error| self.fail(error))
    }

    /// Canned answers first; only unknown questions reach the backend agent.
    pub fn chat(&mut self, input: &str) -> Result<String, FlowError> {
        if let Some(reply) = local_reply(input) {
            return Ok(reply.to_string());
        }

        let session_id = self.stepper.session().map(|session| session.id.clone());
        self.backend
            .agent_query(input, session_id.as_deref())
            .map_err(|error| self.fail(error))
    }

    pub fn reset(&mut self) {
        self.stepper.reset();
    }

    fn fail(&mut self, error: impl Into<FlowError>) -> FlowError {
        let error = error.into();
        tracing::warn!(error = %error, step = ?self.stepper.step(), "charging flow step failed");
        self.stepper.fail(error.to_string());
        error
    }
}

/// Polls on a fixed interval until the session leaves the pollable states
/// or `stop_flag` is raised.
pub fn start_progress_poller<B, Cl>(
    flow: Arc<Mutex<ChargingFlow<B, Cl>>>,
    poll_interval: Duration,
    stop_flag: Arc<AtomicBool>,
) -> JoinHandle<()>
where
    B: ChargingBackend,
    Cl: Clock + Send + 'static,
{
    std::thread::spawn(move || {
        while !stop_flag.load(Ordering::Relaxed) {
            {
                let Ok(mut flow) = flow.lock() else {
                    tracing::error!("charging flow lock poisoned, stopping poller");
                    return;
                };
                if !flow.should_poll() {
                    break;
                }
                if let Err(error) = flow.poll_once() {
                    tracing::warn!(error = %error, "poll cycle failed");
                }
                if !flow.should_poll() {
                    break;
                }
            }
            std::thread::sleep(poll_interval);
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use super::{ChargingFlow, FlowError, start_progress_poller};
    use crate::adapters::backend_client::{BackendError, ChargingBackend};
    use crate::app::config::PaymentSettings;
    use crate::app::services::{ChargingService, ServiceError, SqliteLedgerService, StartSessionCommand};
    use crate::domain::catalog::default_stations;
    use crate::domain::chat::WALLET_REPLY;
    use crate::domain::models::{
        ChargingSession, PaymentProof, PaymentRecord, SessionStatus, Station, VerificationOutcome,
    };
    use crate::domain::session_progress::{Clock, TimestampMs};
    use crate::domain::stepper::Step;
    use crate::test_support::open_test_connection;

    struct TestClock {
        now: AtomicI64,
    }

    impl TestClock {
        fn new() -> Self {
            Self {
                now: AtomicI64::new(1_700_000_000_000),
            }
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> TimestampMs {
            TimestampMs(self.now.fetch_add(1_000, Ordering::Relaxed))
        }
    }

    fn service_error(error: ServiceError) -> BackendError {
        BackendError::Status {
            status: 400,
            message: error.to_string(),
        }
    }

    /// Talks to the real service in-process instead of over HTTP.
    struct InProcessBackend {
        service: ChargingService,
        remote_queries: Arc<AtomicUsize>,
        fail_start: bool,
    }

    impl InProcessBackend {
        fn new(name: &str) -> Self {
            let connection = Arc::new(Mutex::new(open_test_connection(name)));
            Self {
                service: ChargingService::new(
                    default_stations(),
                    PaymentSettings {
                        rate_per_kwh: 0.25,
                        currency: "USDC".to_string(),
                        network: "Base-Sepolia".to_string(),
                        recipient: "0xrecipient".to_string(),
                    },
                    SqliteLedgerService::new(connection),
                    Arc::new(TestClock::new()),
                ),
                remote_queries: Arc::new(AtomicUsize::new(0)),
                fail_start: false,
            }
        }
    }

    impl ChargingBackend for InProcessBackend {
        fn discover(&self) -> Result<Vec<Station>, BackendError> {
            Ok(self.service.stations())
        }

        fn start_session(
            &self,
            station_id: &str,
            kwh: f64,
            wallet_address: Option<&str>,
        ) -> Result<ChargingSession, BackendError> {
            if self.fail_start {
                return Err(BackendError::Status {
                    status: 503,
                    message: "Service Unavailable".to_string(),
                });
            }
            self.service
                .start_session(&StartSessionCommand {
                    station_id: station_id.to_string(),
                    kwh,
                    wallet_address: wallet_address.map(ToString::to_string),
                })
                .map_err(service_error)
        }

        fn current_session(&self) -> Result<ChargingSession, BackendError> {
            self.service.current_session().map_err(service_error)
        }

        fn verify_payment(
            &self,
            session_id: &str,
            proof: &PaymentProof,
        ) -> Result<VerificationOutcome, BackendError> {
            self.service
                .verify_payment(session_id, proof)
                .map_err(service_error)
        }

        fn payments(&self) -> Result<Vec<PaymentRecord>, BackendError> {
            self.service.payments().map_err(service_error)
        }

        fn agent_query(
            &self,
            prompt: &str,
            session_id: Option<&str>,
        ) -> Result<String, BackendError> {
            self.remote_queries.fetch_add(1, Ordering::Relaxed);
            self.service
                .agent_query(prompt, session_id)
                .map(|reply| reply.response)
                .map_err(service_error)
        }
    }

    fn flow(name: &str) -> ChargingFlow<InProcessBackend, TestClock> {
        ChargingFlow::new(InProcessBackend::new(name), TestClock::new())
    }

    fn mg_road_id(flow: &ChargingFlow<InProcessBackend, TestClock>) -> String {
        flow.stations()
            .iter()
            .find(|station| station.name == "ChargeX MG Road" && station.available)
            .map(|station| station.id.clone())
            .expect("MG Road should be listed and available")
    }

    #[test]
    fn mg_road_session_reaches_payment_without_reload() {
        let mut flow = flow("flow-mg-road");
        flow.discover().expect("discover should succeed");
        let station_id = mg_road_id(&flow);

        flow.select_station(&station_id)
            .expect("station should be selectable");
        let session = flow
            .start_session(10.0, Some("0xwallet"))
            .expect("session should start");

        assert!(matches!(
            session.status,
            SessionStatus::AwaitingPayment | SessionStatus::Charging
        ));
        assert!(matches!(
            flow.stepper().step(),
            Step::Payment | Step::Charging
        ));
    }

    #[test]
    fn unavailable_station_is_not_selectable() {
        let mut flow = flow("flow-unavailable");
        flow.discover().expect("discover should succeed");

        assert!(flow.select_station("station-003").is_err());
        assert_eq!(flow.stepper().active_step(), 0);
        assert!(flow.stepper().error().is_some());
    }

    #[test]
    fn unknown_station_is_not_selectable() {
        let mut flow = flow("flow-unknown");
        flow.discover().expect("discover should succeed");

        assert!(matches!(
            flow.select_station("station-404"),
            Err(FlowError::UnknownStation(_))
        ));
        assert_eq!(flow.stepper().active_step(), 0);
    }

    #[test]
    fn failed_start_keeps_step_and_sets_error() {
        let mut backend = InProcessBackend::new("flow-failed-start");
        backend.fail_start = true;
        let mut flow = ChargingFlow::new(backend, TestClock::new());
        flow.discover().expect("discover should succeed");
        flow.select_station("station-001")
            .expect("station should be selectable");
        let before = flow.stepper().active_step();

        assert!(flow.start_session(10.0, None).is_err());

        assert_eq!(flow.stepper().active_step(), before);
        let error = flow.stepper().error().expect("error should be set");
        assert!(!error.is_empty());
        assert!(error.contains("503"));
    }

    #[test]
    fn full_flow_runs_to_completion() {
        let mut flow = flow("flow-full");
        flow.discover().expect("discover should succeed");
        flow.select_station("station-005")
            .expect("station should be selectable");
        flow.start_session(10.0, None)
            .expect("session should start");

        flow.pay().expect("payment should verify");
        assert_eq!(flow.stepper().step(), Step::Charging);
        assert!(flow.stepper().payment_tx_hash().is_some());

        let mut previous = flow
            .stepper()
            .session()
            .map(|session| session.kwh_delivered)
            .expect("session present");
        let mut polls = 0;
        while flow.should_poll() {
            flow.poll_once().expect("poll should succeed");
            let delivered = flow
                .stepper()
                .session()
                .map(|session| session.kwh_delivered)
                .expect("session present");
            assert!(delivered >= previous);
            previous = delivered;
            polls += 1;
            assert!(polls < 100, "session should complete");
        }

        assert_eq!(flow.stepper().step(), Step::Completed);
        let payments = flow.payments().expect("payments should load");
        assert_eq!(payments.len(), 1);
        assert_eq!(
            Some(payments[0].tx_hash.as_str()),
            flow.stepper().payment_tx_hash()
        );
    }

    #[test]
    fn reset_clears_everything_mid_flow() {
        let mut flow = flow("flow-reset");
        flow.discover().expect("discover should succeed");
        flow.select_station("station-005")
            .expect("station should be selectable");
        flow.start_session(10.0, None)
            .expect("session should start");
        flow.pay().expect("payment should verify");

        flow.reset();

        assert_eq!(flow.stepper().active_step(), 0);
        assert!(flow.stepper().session().is_none());
        assert!(flow.stepper().payment_tx_hash().is_none());
        assert!(flow.stepper().error().is_none());
    }

    #[test]
    fn wallet_chat_is_answered_locally() {
        let mut flow = flow("flow-chat-wallet");
        let remote_queries = Arc::clone(&flow.backend.remote_queries);

        let reply = flow.chat("how much is in my wallet?").expect("chat should answer");

        assert_eq!(reply, WALLET_REPLY);
        assert_eq!(remote_queries.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn unknown_chat_goes_to_backend() {
        let mut flow = flow("flow-chat-remote");
        let remote_queries = Arc::clone(&flow.backend.remote_queries);

        flow.chat("what's the weather like").expect("chat should answer");

        assert_eq!(remote_queries.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn poller_stops_when_session_completes() {
        let mut flow = flow("flow-poller");
        flow.discover().expect("discover should succeed");
        flow.select_station("station-005")
            .expect("station should be selectable");
        flow.start_session(10.0, None)
            .expect("session should start");
        flow.pay().expect("payment should verify");

        let flow = Arc::new(Mutex::new(flow));
        let stop_flag = Arc::new(AtomicBool::new(false));
        let handle = start_progress_poller(
            Arc::clone(&flow),
            Duration::from_millis(1),
            Arc::clone(&stop_flag),
        );
        handle.join().expect("poller should finish");

        let flow = flow.lock().expect("flow lock should be available");
        assert_eq!(flow.stepper().step(), Step::Completed);
        assert!(!flow.should_poll());
    }

    #[test]
    fn poller_honours_stop_flag() {
        let mut flow = flow("flow-poller-stop");
        flow.discover().expect("discover should succeed");
        flow.select_station("station-005")
            .expect("station should be selectable");
        flow.start_session(10.0, None)
            .expect("session should start");

        let flow = Arc::new(Mutex::new(flow));
        let stop_flag = Arc::new(AtomicBool::new(true));
        let handle = start_progress_poller(Arc::clone(&flow), Duration::from_millis(1), stop_flag);
        handle.join().expect("poller should finish");

        let flow = flow.lock().expect("flow lock should be available");
        assert_eq!(flow.stepper().step(), Step::Payment);
    }
}
