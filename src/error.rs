//! Crate-wide error type.
//!
//! Hand-rolled rather than built on a derive macro, in the same style as the
//! upstream client's `Error` enum: one variant per failure source, with
//! `From` impls wired up for the `?` operator at module boundaries.

use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// The modem engine's exchange timeout elapsed before a final result
    /// code (`OK`, `ERROR`, `+CME ERROR: ...`) arrived.
    Timeout,
    /// The modem replied with `ERROR` or a numbered `+CME ERROR`/`+CMS
    /// ERROR`.
    ModemError(String),
    /// A reply did not parse against the command's expected response
    /// grammar.
    UnexpectedResponse(String),
    /// The underlying serial transport returned an I/O error.
    Io(std::io::Error),
    /// A second command was attempted while one was already in flight.
    Busy,
    /// The MQTT connection dropped or a CONNACK carried a non-zero return
    /// code.
    Mqtt(crate::mqtt::MqttError),
    /// A malformed NMEA-0183 sentence (bad checksum, truncated fields).
    Nmea(crate::nmea::NmeaError),
    /// A settings blob failed to decode from flash.
    Settings(String),

    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Timeout => write!(f, "command timed out"),
            Error::ModemError(s) => write!(f, "modem error: {s}"),
            Error::UnexpectedResponse(s) => write!(f, "unexpected response: {s}"),
            Error::Io(e) => write!(f, "io error: {e}"),
            Error::Busy => write!(f, "modem engine busy"),
            Error::Mqtt(e) => write!(f, "mqtt error: {e}"),
            Error::Nmea(e) => write!(f, "nmea error: {e}"),
            Error::Settings(s) => write!(f, "settings error: {s}"),
            Error::Other(s) => write!(f, "{s}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<crate::mqtt::MqttError> for Error {
    fn from(e: crate::mqtt::MqttError) -> Self {
        Error::Mqtt(e)
    }
}

impl From<crate::nmea::NmeaError> for Error {
    fn from(e: crate::nmea::NmeaError) -> Self {
        Error::Nmea(e)
    }
}
