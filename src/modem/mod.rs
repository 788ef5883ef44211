//! AT-command modem engine (C3).
//!
//! Mirrors the source firmware's `modem.c`/`modem.h`: a single in-flight
//! command at a time, enforced by [`engine::ModemEngine`]'s mutex, echo
//! consumption, URC interleaving, prompt-based writes for commands that
//! expect a `"> "` prompt before their payload, and length-prefixed binary
//! reads for TCP data. Built the way the upstream crate layers AT command
//! encode/decode (`command/` submodules with a `types` module per group)
//! over a generic client (`client.rs`'s `send_at`), but with our own
//! hand-rolled command/response pair instead of `atat`'s derive macros,
//! since this protocol's commands are closed-form enough not to need one.

pub mod command;
pub mod engine;
pub mod parser;
pub mod urc;

pub use command::{AtCommand, ModemStatus};
pub use engine::ModemEngine;
pub use urc::Urc;

/// Maximum payload accepted for a single TCP write or read chunk, per the
/// modem's buffering limits (`MODEM_MAX_TCP_WRITE_SIZE` /
/// `MODEM_MAX_TCP_READ_SIZE` in the source firmware).
pub const MAX_TCP_CHUNK: usize = 99;

/// How long to keep listening for more URC bytes after one starts arriving,
/// before treating the line as complete (`MODEM_URC_TIMEOUT_MS`).
pub const URC_SETTLE_MS: u64 = 25;
