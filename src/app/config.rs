use crate::app::AppError;

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentSettings {
    pub rate_per_kwh: f64,
    pub currency: String,
    pub network: String,
    pub recipient: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub http_bind: String,
    pub db_path: String,
    pub payment: PaymentSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub api_url: String,
    pub poll_interval_ms: u64,
    pub charge_kwh: f64,
    pub wallet_address: Option<String>,
    pub station_id: Option<String>,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, AppError> {
        load_dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let rate_per_kwh = parse_or_default(&lookup, "CHARGING_RATE_PER_KWH", 0.25_f64)?;
        if !rate_per_kwh.is_finite() || rate_per_kwh <= 0.0 {
            return Err(AppError::config("CHARGING_RATE_PER_KWH must be positive"));
        }

        Ok(Self {
            http_bind: string_or_default(&lookup, "HTTP_BIND", "0.0.0.0:8000"),
            db_path: string_or_default(&lookup, "DB_PATH", "./data/chargex.db"),
            payment: PaymentSettings {
                rate_per_kwh,
                currency: string_or_default(&lookup, "DEFAULT_CURRENCY", "USDC"),
                network: string_or_default(&lookup, "NETWORK_NAME", "Base-Sepolia"),
                recipient: string_or_default(
                    &lookup,
                    "PAYMENT_RECIPIENT",
                    "0x1234567890abcdef1234567890abcdef12345678",
                ),
            },
        })
    }
}

impl AgentConfig {
    pub fn from_env() -> Result<Self, AppError> {
        load_dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let charge_kwh = parse_or_default(&lookup, "CHARGE_KWH", 10.0_f64)?;
        if !charge_kwh.is_finite() || charge_kwh <= 0.0 {
            return Err(AppError::config("CHARGE_KWH must be positive"));
        }

        Ok(Self {
            api_url: string_or_default(&lookup, "API_URL", "http://localhost:8000")
                .trim_end_matches('/')
                .to_string(),
            poll_interval_ms: parse_or_default(&lookup, "POLL_INTERVAL_MS", 2000_u64)?,
            charge_kwh,
            wallet_address: optional_string(&lookup, "WALLET_ADDRESS"),
            station_id: optional_string(&lookup, "STATION_ID"),
        })
    }
}

fn load_dotenv() {
    if let Err(error) = dotenvy::dotenv()
        && !error.not_found()
    {
        tracing::warn!(error = %error, "failed to load .env file");
    }
}

fn optional_string<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn string_or_default<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    optional_string(lookup, key).unwrap_or_else(|| default.to_string())
}

fn parse_or_default<T, F>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr + Copy,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::config(format!("{key} must be a valid number"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::{AgentConfig, ApiConfig};

    #[test]
    fn api_applies_defaults() {
        let config = ApiConfig::from_lookup(|_| None).expect("config should be valid");

        assert_eq!(config.http_bind, "0.0.0.0:8000");
        assert_eq!(config.db_path, "./data/chargex.db");
        assert_eq!(config.payment.rate_per_kwh, 0.25);
        assert_eq!(config.payment.currency, "USDC");
        assert_eq!(config.payment.network, "Base-Sepolia");
        assert_eq!(
            config.payment.recipient,
            "0x1234567890abcdef1234567890abcdef12345678"
        );
    }

    #[test]
    fn api_rejects_invalid_rate() {
        let result = ApiConfig::from_lookup(|key| match key {
            "CHARGING_RATE_PER_KWH" => Some("cheap".to_string()),
            _ => None,
        });

        assert_eq!(
            result.unwrap_err().to_string(),
            "invalid configuration: CHARGING_RATE_PER_KWH must be a valid number"
        );
    }

    #[test]
    fn api_rejects_negative_rate() {
        let result = ApiConfig::from_lookup(|key| match key {
            "CHARGING_RATE_PER_KWH" => Some("-1".to_string()),
            _ => None,
        });

        assert!(result.is_err());
    }

    #[test]
    fn agent_applies_defaults() {
        let config = AgentConfig::from_lookup(|_| None).expect("config should be valid");

        assert_eq!(config.api_url, "http://localhost:8000");
        assert_eq!(config.poll_interval_ms, 2000);
        assert_eq!(config.charge_kwh, 10.0);
        assert_eq!(config.wallet_address, None);
        assert_eq!(config.station_id, None);
    }

    #[test]
    fn agent_trims_values_and_trailing_slash() {
        let config = AgentConfig::from_lookup(|key| match key {
            "API_URL" => Some(" http://127.0.0.1:9000/ ".to_string()),
            "STATION_ID" => Some(" station-005 ".to_string()),
            "WALLET_ADDRESS" => Some("   ".to_string()),
            _ => None,
        })
        .expect("config should be valid");

        assert_eq!(config.api_url, "http://127.0.0.1:9000");
        assert_eq!(config.station_id.as_deref(), Some("station-005"));
        assert_eq!(config.wallet_address, None);
    }

    #[test]
    fn agent_rejects_invalid_poll_interval() {
        let result = AgentConfig::from_lookup(|key| match key {
            "POLL_INTERVAL_MS" => Some("abc".to_string()),
            _ => None,
        });

        assert_eq!(
            result.unwrap_err().to_string(),
            "invalid configuration: POLL_INTERVAL_MS must be a valid number"
        );
    }
}
