#![allow(async_fn_in_trait)]

//! Embedded marine telemetry gateway: reads boat instrument data off NMEA-0183
//! serial ports, keeps a freshness-indexed snapshot of it, and publishes a
//! periodic telemetry frame over a cellular modem's MQTT uplink, with SMS as
//! an out-of-band command channel.

pub mod boatdata;
pub mod bus;
pub mod collaborators;
pub mod command_parser;
pub mod config;
pub mod error;
pub mod gateway;
pub mod modem;
pub mod mqtt;
pub mod nmea;
pub mod orchestrator;
pub mod publisher;
pub mod serial;
pub mod settings;
pub mod timebase;

pub use config::GatewayConfig;
pub use error::{Error, Result};
pub use gateway::Gateway;
