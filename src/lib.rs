//! # Helios - PV surplus charge controller for KEBA wallboxes
//!
//! Helios talks to a KEBA charging station over its UDP interface and
//! continuously adjusts the charge current to the photovoltaic surplus
//! reported by an external estimator.
//!
//! ## Features
//!
//! - **Async runtime**: single-owner driver loop on Tokio
//! - **Typed protocol**: reports and broadcasts decode into closed enums
//! - **Surplus control law**: asymmetric ramp with per-mode current floors
//! - **Paced sending**: commands respect the station's input buffering
//! - **Metering**: optional Volkszaehler middleware reporting
//! - **Configuration**: YAML-based configuration with validation
//!
//! ## Architecture
//!
//! - `config`: Configuration management and validation
//! - `logging`: Structured logging and tracing
//! - `protocol`: UDP message codec
//! - `device`: Mirror of the station's reported state
//! - `controls`: Control law and controller modes
//! - `controller`: Charge controller state machine
//! - `timer`: Charging-since tracker
//! - `dispatcher`: Clamping, metering and paced sending of commands
//! - `transport`: UDP socket handling
//! - `metering`: Metering sink integration
//! - `driver`: Core driver loop and state publication

pub mod config;
pub mod controller;
pub mod controls;
pub mod device;
pub mod dispatcher;
pub mod driver;
pub mod error;
pub mod logging;
pub mod metering;
pub mod protocol;
pub mod timer;
pub mod transport;

// Re-export commonly used types
pub use config::Config;
pub use driver::{DriverHandle, KebaDriver};
pub use error::{HeliosError, Result};
