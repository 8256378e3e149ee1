use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: String,
    pub name: String,
    pub location: String,
    pub available: bool,
    pub rate_kwh: f64,
    pub rate_crypto: f64,
    pub power_kw: u32,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    AwaitingPayment,
    Charging,
    Completed,
    Error,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AwaitingPayment => "awaiting_payment",
            Self::Charging => "charging",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

/// Payment the backend asks for before it starts delivering energy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub payment_id: String,
    pub amount: f64,
    pub currency: String,
    pub recipient_address: String,
    pub chain: String,
    pub payment_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargingSession {
    pub id: String,
    #[serde(rename = "stationId")]
    pub station_id: String,
    #[serde(rename = "stationName", default)]
    pub station_name: String,
    pub status: SessionStatus,
    #[serde(default)]
    pub price: f64,
    #[serde(rename = "startTime", default)]
    pub start_time: String,
    #[serde(
        rename = "chargingStartTime",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub charging_start_time: Option<String>,
    #[serde(rename = "endTime", default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    pub kwh_delivered: f64,
    pub kwh_total: f64,
    pub time_elapsed: u64,
    #[serde(rename = "currentAmount", default)]
    pub current_amount: f64,
    #[serde(default)]
    pub payment: Option<PaymentRequest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub amount: f64,
    pub currency: String,
    pub timestamp: i64,
    pub tx_hash: String,
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentLogEntry {
    pub timestamp: String,
    pub action: String,
    pub details: String,
}

/// Placeholder payment proof fabricated by the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentProof {
    pub signature: String,
    pub tx_hash: String,
    pub amount: f64,
    pub currency: String,
    pub recipient: String,
    pub chain: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub verified: bool,
    #[serde(default)]
    pub tx_hash: Option<String>,
    pub session: ChargingSession,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletInfo {
    pub address: String,
    pub network: String,
    pub balance: std::collections::BTreeMap<String, String>,
    pub supports_x402: bool,
    pub mode: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargingRecommendation {
    pub action: String,
    pub station_id: Option<String>,
    pub station_name: Option<String>,
    pub recommended_kwh: f64,
    pub estimated_cost: Option<f64>,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionAdvice {
    pub session_id: String,
    pub status: SessionStatus,
    pub kwh_delivered: f64,
    pub kwh_total: f64,
    pub current_amount: f64,
    pub advice: String,
}
