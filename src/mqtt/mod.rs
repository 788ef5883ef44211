//! Minimal MQTT v3.1.1 client (C4), QoS 0 only.
//!
//! Grounded on `mqtt.h`/`mqtt.c`: the same packet type constants and status
//! enum, reimplemented as a small codec module (`packet.rs`) plus a client
//! that drives it over anything implementing [`crate::serial::ModemTransport`]
//! — here that's the modem engine's TCP read/write commands rather than a
//! raw socket, since the only network path available is through the AT
//! command set.

pub mod client;
pub mod packet;

pub use client::MqttClient;
pub use packet::Packet;

#[derive(Debug, Clone, PartialEq)]
pub enum MqttError {
    ConnectionRefused(u8),
    Timeout,
    UnexpectedResponse(String),
    Protocol(String),
}

impl std::fmt::Display for MqttError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MqttError::ConnectionRefused(code) => write!(f, "connection refused, code {code}"),
            MqttError::Timeout => write!(f, "timed out"),
            MqttError::UnexpectedResponse(s) => write!(f, "unexpected response: {s}"),
            MqttError::Protocol(s) => write!(f, "protocol error: {s}"),
        }
    }
}
