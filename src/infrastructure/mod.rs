// Infrastructure layer - Config loading and actuator transports
pub mod config;
pub mod esphome_rest;
pub mod home_assistant;
pub mod transport;
