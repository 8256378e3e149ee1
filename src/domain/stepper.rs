use thiserror::Error;

use crate::domain::models::{ChargingSession, SessionStatus, Station, VerificationOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    FindStation,
    Initiate,
    Payment,
    Charging,
    Completed,
}

impl Step {
    pub fn index(self) -> usize {
        match self {
            Self::FindStation => 0,
            Self::Initiate => 1,
            Self::Payment => 2,
            Self::Charging => 3,
            Self::Completed => 4,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StepperError {
    #[error("station {0} is not available")]
    StationUnavailable(String),
    #[error("action not allowed in step {step:?}")]
    WrongStep { step: Step },
    #[error("session {0} reported an error")]
    SessionFailed(String),
    #[error("{0}")]
    PaymentRejected(String),
}

/// Client-side view of the charging flow. Every method either advances the
/// step or leaves it where it was; failures only touch the error banner.
#[derive(Debug, Clone)]
pub struct SessionStepper {
    step: Step,
    station: Option<Station>,
    session: Option<ChargingSession>,
    payment_tx_hash: Option<String>,
    error: Option<String>,
}

impl Default for SessionStepper {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStepper {
    pub fn new() -> Self {
        Self {
            step: Step::FindStation,
            station: None,
            session: None,
            payment_tx_hash: None,
            error: None,
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn active_step(&self) -> usize {
        self.step.index()
    }

    pub fn station(&self) -> Option<&Station> {
        self.station.as_ref()
    }

    pub fn session(&self) -> Option<&ChargingSession> {
        self.session.as_ref()
    }

    pub fn payment_tx_hash(&self) -> Option<&str> {
        self.payment_tx_hash.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn select_station(&mut self, station: &Station) -> Result<(), StepperError> {
        self.expect_step(&[Step::FindStation, Step::Initiate])?;

        if !station.available {
            return Err(self.fail_with(StepperError::StationUnavailable(station.id.clone())));
        }

        self.station = Some(station.clone());
        self.step = Step::Initiate;
        self.error = None;
        Ok(())
    }

    pub fn session_started(&mut self, session: ChargingSession) -> Result<(), StepperError> {
        self.expect_step(&[Step::Initiate])?;

        let next = match session.status {
            SessionStatus::AwaitingPayment => Step::Payment,
            SessionStatus::Charging => Step::Charging,
            SessionStatus::Completed => Step::Completed,
            SessionStatus::Error => {
                return Err(self.fail_with(StepperError::SessionFailed(session.id)));
            }
        };

        self.session = Some(session);
        self.step = next;
        self.error = None;
        Ok(())
    }

    pub fn payment_settled(&mut self, outcome: VerificationOutcome) -> Result<(), StepperError> {
        self.expect_step(&[Step::Payment])?;

        if !outcome.verified {
            let reason = outcome
                .error
                .filter(|message| !message.trim().is_empty())
                .unwrap_or_else(|| "payment verification failed".to_string());
            return Err(self.fail_with(StepperError::PaymentRejected(reason)));
        }

        self.payment_tx_hash = outcome.tx_hash;
        self.step = if outcome.session.status == SessionStatus::Completed {
            Step::Completed
        } else {
            Step::Charging
        };
        self.session = Some(outcome.session);
        self.error = None;
        Ok(())
    }

    /// Overwrites the local session with a polled one.
    pub fn session_polled(&mut self, session: ChargingSession) {
        match session.status {
            SessionStatus::Completed => self.step = Step::Completed,
            SessionStatus::Charging if self.step == Step::Payment => self.step = Step::Charging,
            SessionStatus::Error => {
                self.error = Some(StepperError::SessionFailed(session.id.clone()).to_string());
            }
            _ => {}
        }
        self.session = Some(session);
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.error = Some(if message.trim().is_empty() {
            "request failed".to_string()
        } else {
            message
        });
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn should_poll(&self) -> bool {
        self.session.as_ref().is_some_and(|session| {
            matches!(
                session.status,
                SessionStatus::Charging | SessionStatus::AwaitingPayment
            )
        })
    }

    fn expect_step(&mut self, allowed: &[Step]) -> Result<(), StepperError> {
        if allowed.contains(&self.step) {
            return Ok(());
        }
        Err(self.fail_with(StepperError::WrongStep { step: self.step }))
    }

    fn fail_with(&mut self, error: StepperError) -> StepperError {
        self.error = Some(error.to_string());
        error
    }
}
