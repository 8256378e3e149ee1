use chrono::{DateTime, SecondsFormat, Utc};

use crate::domain::models::{ChargingSession, SessionStatus};

/// Simulated seconds added per progress tick.
pub const TICK_SECONDS: u64 = 300;
/// A full session delivers `kwh_total` over this many simulated seconds.
pub const FULL_SESSION_SECONDS: u64 = 10_800;
/// Progress credited right after a payment is verified.
pub const INITIAL_PROGRESS_SECONDS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimestampMs(pub i64);

impl TimestampMs {
    pub fn unix_seconds(self) -> i64 {
        self.0.div_euclid(1000)
    }

    pub fn to_iso8601(self) -> String {
        let datetime = DateTime::<Utc>::from_timestamp_millis(self.0)
            .unwrap_or_else(|| DateTime::<Utc>::from(std::time::UNIX_EPOCH));
        datetime.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

pub trait Clock {
    fn now(&self) -> TimestampMs;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    Advanced,
    Completed,
}

pub fn current_amount(kwh_delivered: f64, price: f64) -> f64 {
    ((kwh_delivered * price) * 100.0).round() / 100.0
}

fn kwh_per_second(session: &ChargingSession) -> f64 {
    session.kwh_total / FULL_SESSION_SECONDS as f64
}

/// Moves a charging session forward by one tick. Sessions in any other
/// status are left alone.
pub fn advance<C: Clock + ?Sized>(
    session: &mut ChargingSession,
    clock: &C,
) -> Option<ProgressEvent> {
    if session.status != SessionStatus::Charging {
        return None;
    }

    session.time_elapsed += TICK_SECONDS;
    let delivered = session.kwh_delivered + kwh_per_second(session) * TICK_SECONDS as f64;
    session.kwh_delivered = delivered.max(session.kwh_delivered);

    if session.kwh_delivered >= session.kwh_total {
        session.kwh_delivered = session.kwh_total;
        session.time_elapsed = FULL_SESSION_SECONDS;
        session.status = SessionStatus::Completed;
        session.end_time = Some(clock.now().to_iso8601());
        session.current_amount = current_amount(session.kwh_delivered, session.price);
        return Some(ProgressEvent::Completed);
    }

    session.current_amount = current_amount(session.kwh_delivered, session.price);
    Some(ProgressEvent::Advanced)
}

/// Switches an awaiting session to charging and credits the initial minute.
pub fn begin_charging<C: Clock + ?Sized>(session: &mut ChargingSession, clock: &C) {
    session.status = SessionStatus::Charging;
    session.charging_start_time = Some(clock.now().to_iso8601());
    session.time_elapsed = INITIAL_PROGRESS_SECONDS;
    session.kwh_delivered = session.kwh_total * INITIAL_PROGRESS_SECONDS as f64
        / FULL_SESSION_SECONDS as f64;
    session.current_amount = current_amount(session.kwh_delivered, session.price);
}

pub fn stop<C: Clock + ?Sized>(session: &mut ChargingSession, clock: &C) {
    session.status = SessionStatus::Completed;
    session.end_time = Some(clock.now().to_iso8601());
}
