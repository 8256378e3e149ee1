use actix_web::{HttpResponse, Responder, get, post, web};
use serde::{Deserialize, Serialize};

use crate::app::services::{ChargingService, ServiceError, StartSessionCommand};
use crate::domain::models::{AgentLogEntry, PaymentProof, PaymentRecord, Station};

const DEFAULT_CHARGE_KWH: f64 = 10.0;

#[derive(Clone)]
pub struct ApiState {
    pub charging: ChargingService,
}

#[derive(Debug, Serialize)]
pub struct DiscoverResponse {
    pub stations: Vec<Station>,
}

#[derive(Debug, Serialize)]
pub struct PaymentsResponse {
    pub payments: Vec<PaymentRecord>,
}

#[derive(Debug, Serialize)]
pub struct AgentLogsResponse {
    pub logs: Vec<AgentLogEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartSessionRequest {
    #[serde(rename = "stationId")]
    pub station_id: String,
    #[serde(default = "default_charge_kwh")]
    pub amount: f64,
    #[serde(default)]
    pub wallet_address: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyPaymentRequest {
    pub proof: PaymentProof,
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct WalletQuery {
    pub wallet_address: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AgentQueryRequest {
    pub prompt: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct AgentQueryResponse {
    pub response: String,
    pub session_id: String,
    pub success: bool,
}

fn default_charge_kwh() -> f64 {
    DEFAULT_CHARGE_KWH
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(discover_stations_endpoint)
        .service(list_payments_endpoint)
        .service(start_session_endpoint)
        .service(current_session_endpoint)
        .service(stop_session_endpoint)
        .service(verify_payment_endpoint)
        .service(wallet_info_endpoint)
        .service(agent_query_endpoint)
        .service(agent_logs_endpoint)
        .service(agent_recommendation_endpoint)
        .service(monitor_session_endpoint);
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

#[get("/api/discover")]
async fn discover_stations_endpoint(state: web::Data<ApiState>) -> impl Responder {
    HttpResponse::Ok().json(DiscoverResponse {
        stations: state.charging.stations(),
    })
}

#[get("/api/payments")]
async fn list_payments_endpoint(state: web::Data<ApiState>) -> impl Responder {
    match state.charging.payments() {
        Ok(payments) => HttpResponse::Ok().json(PaymentsResponse { payments }),
        Err(error) => service_error_response(error),
    }
}

#[post("/api/session/start")]
async fn start_session_endpoint(
    state: web::Data<ApiState>,
    body: web::Json<StartSessionRequest>,
) -> impl Responder {
    let body = body.into_inner();
    let command = StartSessionCommand {
        station_id: body.station_id,
        kwh: body.amount,
        wallet_address: body.wallet_address,
    };

    match state.charging.start_session(&command) {
        Ok(session) => HttpResponse::Ok().json(session),
        Err(error) => service_error_response(error),
    }
}

#[get("/api/session/current")]
async fn current_session_endpoint(state: web::Data<ApiState>) -> impl Responder {
    match state.charging.current_session() {
        Ok(session) => HttpResponse::Ok().json(session),
        Err(error) => service_error_response(error),
    }
}

#[post("/api/session/stop")]
async fn stop_session_endpoint(state: web::Data<ApiState>) -> impl Responder {
    match state.charging.stop_session() {
        Ok(session) => HttpResponse::Ok().json(session),
        Err(error) => service_error_response(error),
    }
}

#[post("/api/payment/verify")]
async fn verify_payment_endpoint(
    state: web::Data<ApiState>,
    body: web::Json<VerifyPaymentRequest>,
) -> impl Responder {
    match state
        .charging
        .verify_payment(&body.session_id, &body.proof)
    {
        Ok(outcome) => HttpResponse::Ok().json(outcome),
        Err(error) => service_error_response(error),
    }
}

#[get("/api/wallet/info")]
async fn wallet_info_endpoint(
    state: web::Data<ApiState>,
    query: web::Query<WalletQuery>,
) -> impl Responder {
    HttpResponse::Ok().json(state.charging.wallet_info(query.wallet_address.as_deref()))
}

#[post("/api/agent/query")]
async fn agent_query_endpoint(
    state: web::Data<ApiState>,
    body: web::Json<AgentQueryRequest>,
) -> impl Responder {
    match state
        .charging
        .agent_query(&body.prompt, body.session_id.as_deref())
    {
        Ok(reply) => HttpResponse::Ok().json(AgentQueryResponse {
            response: reply.response,
            session_id: reply.session_id,
            success: true,
        }),
        Err(error) => service_error_response(error),
    }
}

#[get("/api/agent/logs")]
async fn agent_logs_endpoint(state: web::Data<ApiState>) -> impl Responder {
    match state.charging.agent_logs() {
        Ok(logs) => HttpResponse::Ok().json(AgentLogsResponse { logs }),
        Err(error) => service_error_response(error),
    }
}

#[get("/api/agent/recommendation")]
async fn agent_recommendation_endpoint(state: web::Data<ApiState>) -> impl Responder {
    match state.charging.recommendation() {
        Ok(recommendation) => HttpResponse::Ok().json(recommendation),
        Err(error) => service_error_response(error),
    }
}

#[post("/api/agent/monitor-session")]
async fn monitor_session_endpoint(state: web::Data<ApiState>) -> impl Responder {
    match state.charging.monitor_session() {
        Ok(advice) => HttpResponse::Ok().json(advice),
        Err(error) => service_error_response(error),
    }
}

fn service_error_response(error: ServiceError) -> HttpResponse {
    let mut response = match error {
        ServiceError::StationNotFound
        | ServiceError::NoActiveSession
        | ServiceError::SessionMismatch => HttpResponse::NotFound(),
        ServiceError::StationUnavailable | ServiceError::InvalidAmount => {
            HttpResponse::BadRequest()
        }
        ServiceError::StationBusy | ServiceError::PaymentNotExpected => HttpResponse::Conflict(),
        ServiceError::SessionLockPoisoned
        | ServiceError::DbLockPoisoned
        | ServiceError::Database(_) => {
            tracing::error!(error = %error, "request failed");
            HttpResponse::InternalServerError()
        }
    };

    response.json(serde_json::json!({ "error": error.to_string() }))
}
