// Application layer - Stateful services and long-running loops
pub mod actuator_client;
pub mod actuator_worker;
pub mod control_loop;
pub mod fan_transport;
pub mod live_state_store;
pub mod settings_store;
pub mod telemetry_receiver;
