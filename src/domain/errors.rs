// Error taxonomy shared by the decoder, settings, actuator and receiver
use std::net::SocketAddr;
use thiserror::Error;

/// A datagram that is not a usable OutGauge packet. Per-packet and recoverable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedPacketError {
    #[error("expected {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },
    #[error("speed field is not a finite number")]
    NonFiniteSpeed,
}

/// A settings update that would make the mapping or the actuator target unusable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidConfigError {
    #[error("max_speed ({max}) must be greater than min_speed ({min})")]
    DegenerateSpeedRange { min: f64, max: f64 },
    #[error("speed bounds must be finite numbers")]
    NonFiniteSpeed,
    #[error("{field} ({value}) must be within 0..=100")]
    FanBoundOutOfRange { field: &'static str, value: u8 },
    #[error("min_fan ({min}) must not exceed max_fan ({max})")]
    InvertedFanRange { min: u8, max: u8 },
    #[error("rate_gain ({0}) must be within 0..=100")]
    RateGainOutOfRange(f64),
    #[error("smoothing_size must be at least 1")]
    EmptySmoothingWindow,
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
}

/// Failure talking to the remote fan. Drives the reconnection state machine.
#[derive(Debug, Error)]
pub enum ActuatorTransportError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("device answered {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("fan entity '{0}' not found on device")]
    EntityNotFound(String),
    #[error("no answer within {0} ms")]
    Timeout(u64),
}

/// The telemetry port could not be bound. Fatal at startup.
#[derive(Debug, Error)]
#[error("cannot bind telemetry socket on {addr}: {source}")]
pub struct SocketBindError {
    pub addr: SocketAddr,
    #[source]
    pub source: std::io::Error,
}
