//! NMEA-0183 sentence framing, decode/encode and the transmit scheduler
//! (C5).
//!
//! Grounded on `nmea.h`/`nmea.c`: the same sentence checksum and framing
//! rules, the same `data_available` bitmask idea per sentence (here a
//! `bitflags`-free `u32` with named `const`s, matching the source's literal
//! `#define ..._PRESENT` constants), and the same fixed-capacity transmit
//! and receive registration tables, sized identically
//! (`NMEA_MAXIMUM_TRANSMIT_MESSAGE_DETAILS` = 16,
//! `NMEA_MAXIMUM_RECEIVE_MESSAGE_DETAILS` = 6).

pub mod decode;
pub mod encode;
pub mod scheduler;
pub mod sentence;
pub mod types;

pub use scheduler::{NmeaScheduler, TransmitSlot};
pub use sentence::{checksum, NmeaError};
pub use types::*;

/// Sentence payload bounds (`NMEA_MIN_MESSAGE_LENGTH` /
/// `NMEA_MAX_MESSAGE_LENGTH`).
pub const MIN_MESSAGE_LENGTH: usize = 9;
pub const MAX_MESSAGE_LENGTH: usize = 82;

pub const MAX_TRANSMIT_SLOTS: usize = 16;
pub const MAX_RECEIVE_SLOTS: usize = 6;
pub const NUMBER_OF_PORTS: usize = 2;
