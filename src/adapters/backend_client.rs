use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::adapters::api::{
    AgentQueryRequest, AgentQueryResponse, StartSessionRequest, VerifyPaymentRequest,
};
use crate::domain::models::{
    ChargingSession, PaymentProof, PaymentRecord, Station, VerificationOutcome,
};

const HTTP_TIMEOUT_SECONDS: u64 = 10;

/// The endpoints the charging flow talks to.
pub trait ChargingBackend: Send + 'static {
    fn discover(&self) -> Result<Vec<Station>, BackendError>;
    fn start_session(
        &self,
        station_id: &str,
        kwh: f64,
        wallet_address: Option<&str>,
    ) -> Result<ChargingSession, BackendError>;
    fn current_session(&self) -> Result<ChargingSession, BackendError>;
    fn verify_payment(
        &self,
        session_id: &str,
        proof: &PaymentProof,
    ) -> Result<VerificationOutcome, BackendError>;
    fn payments(&self) -> Result<Vec<PaymentRecord>, BackendError>;
    fn agent_query(&self, prompt: &str, session_id: Option<&str>) -> Result<String, BackendError>;
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server responded with {status}: {message}")]
    Status { status: u16, message: String },
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    detail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StationsBody {
    stations: Vec<Station>,
}

#[derive(Debug, Deserialize)]
struct PaymentsBody {
    payments: Vec<PaymentRecord>,
}

#[derive(Debug, Clone)]
pub struct HttpChargingBackend {
    base_url: String,
    client: Client,
}

impl HttpChargingBackend {
    pub fn new(base_url: &str) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECONDS))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        let response = self.client.get(self.url(path)).send()?;
        decode(response)
    }

    fn post<B: serde::Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, BackendError> {
        let response = self.client.post(self.url(path)).json(body).send()?;
        decode(response)
    }
}

fn decode<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let status = response.status();
    if status.is_success() {
        return response.json::<T>().map_err(BackendError::from);
    }

    let fallback = status
        .canonical_reason()
        .unwrap_or("unexpected status")
        .to_string();
    let message = match response.json::<ErrorBody>() {
        Ok(body) => body.error.or(body.detail).unwrap_or(fallback),
        Err(_) => fallback,
    };

    Err(BackendError::Status {
        status: status.as_u16(),
        message,
    })
}

impl ChargingBackend for HttpChargingBackend {
    fn discover(&self) -> Result<Vec<Station>, BackendError> {
        self.get::<StationsBody>("/api/discover")
            .map(|body| body.stations)
    }

    fn start_session(
        &self,
        station_id: &str,
        kwh: f64,
        wallet_address: Option<&str>,
    ) -> Result<ChargingSession, BackendError> {
        self.post(
            "/api/session/start",
            &StartSessionRequest {
                station_id: station_id.to_string(),
                amount: kwh,
                wallet_address: wallet_address.map(ToString::to_string),
            },
        )
    }

    fn current_session(&self) -> Result<ChargingSession, BackendError> {
        self.get("/api/session/current")
    }

    fn verify_payment(
        &self,
        session_id: &str,
        proof: &PaymentProof,
    ) -> Result<VerificationOutcome, BackendError> {
        self.post(
            "/api/payment/verify",
            &VerifyPaymentRequest {
                proof: proof.clone(),
                session_id: session_id.to_string(),
            },
        )
    }

    fn payments(&self) -> Result<Vec<PaymentRecord>, BackendError> {
        self.get::<PaymentsBody>("/api/payments")
            .map(|body| body.payments)
    }

    fn agent_query(&self, prompt: &str, session_id: Option<&str>) -> Result<String, BackendError> {
        self.post::<_, AgentQueryResponse>(
            "/api/agent/query",
            &AgentQueryRequest {
                prompt: prompt.to_string(),
                session_id: session_id.map(ToString::to_string),
            },
        )
        .map(|body| body.response)
    }
}
