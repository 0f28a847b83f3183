// Domain layer - Pure types and algorithms, no I/O
pub mod actuator;
pub mod errors;
pub mod live_state;
pub mod mapping;
pub mod smoothing;
pub mod telemetry;
