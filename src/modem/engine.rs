//! The AT command engine: one exchange in flight at a time, an echo
//! consumed before the reply, URCs peeled off and forwarded rather than
//! mistaken for command data, and length-prefixed binary reads for TCP
//! payloads split into at most [`super::MAX_TCP_CHUNK`]-byte sections.
//!
//! Grounded on `modem.c`'s command loop: a caller queues one
//! `AtCommandPacket_t`, the task writes it, waits for the echo, then reads
//! lines until a terminal status arrives or the packet's `timeoutMs`
//! elapses — the whole exchange, prompt wait included, is bounded by one
//! timeout budget rather than a timeout per sub-step.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{debug, trace, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::{mpsc, Mutex};
use tokio::time::timeout;

use super::command::{AtCommand, ModemStatus};
use super::parser::{classify, Line, LineReader};
use super::urc::Urc;
use super::MAX_TCP_CHUNK;
use crate::error::{Error, Result};
use crate::serial::ModemTransport;

/// Result of one command exchange: the terminal status plus any `Data`
/// lines the command's own decoder needs, and raw bytes for commands that
/// read binary TCP payloads.
#[derive(Debug, Default)]
pub struct Exchange {
    pub status: Option<ModemStatus>,
    pub lines: Vec<String>,
    pub binary: Vec<u8>,
}

pub struct ModemEngine<T: ModemTransport> {
    inner: Mutex<Inner<T>>,
    urc_tx: mpsc::Sender<Urc>,
    /// Tracks the TCP-connected/PDP-activated state the engine owns
    /// alongside each exchange (§3): set both by recognized URCs arriving
    /// interleaved with command responses and by the state effects of
    /// specific commands below.
    tcp_connected: AtomicBool,
    pdp_activated: AtomicBool,
}

struct Inner<T: ModemTransport> {
    transport: T,
    reader: LineReader,
}

impl<T: ModemTransport> ModemEngine<T> {
    /// `urc_capacity` bounds the URC forwarding channel; a full channel
    /// drops the oldest-pending URC rather than block the command loop,
    /// since URCs are advisory (the orchestrator's own polling loops are
    /// the source of truth for state).
    pub fn new(transport: T, urc_capacity: usize) -> (Self, mpsc::Receiver<Urc>) {
        let (urc_tx, urc_rx) = mpsc::channel(urc_capacity);
        (
            ModemEngine {
                inner: Mutex::new(Inner {
                    transport,
                    reader: LineReader::new(),
                }),
                urc_tx,
                tcp_connected: AtomicBool::new(false),
                pdp_activated: AtomicBool::new(false),
            },
            urc_rx,
        )
    }

    pub fn tcp_connected(&self) -> bool {
        self.tcp_connected.load(Ordering::Acquire)
    }

    pub fn pdp_activated(&self) -> bool {
        self.pdp_activated.load(Ordering::Acquire)
    }

    /// Runs one command to completion. `payload` is the raw bytes written
    /// after the `"> "` prompt for commands where
    /// [`AtCommand::expects_prompt`] is true (TCP writes, SMS PDU sends);
    /// ignored otherwise.
    pub async fn command(
        &self,
        cmd: AtCommand,
        payload: Option<&[u8]>,
        timeout_duration: Duration,
    ) -> Result<Exchange> {
        let exchange = {
            let mut inner = self.inner.lock().await;
            let line = cmd.encode();
            trace!("modem tx: {line}");

            timeout(timeout_duration, async {
                inner.transport.write_all(line.as_bytes()).await?;
                inner.transport.write_all(b"\r\n").await?;

                wait_for_echo(&mut inner, &line).await?;

                if cmd.expects_prompt() {
                    wait_for_prompt(&mut inner).await?;
                    if let Some(data) = payload {
                        inner.transport.write_all(data).await?;
                    }
                }

                match &cmd {
                    AtCommand::TcpRead { len } => {
                        read_tcp_binary(&mut inner, *len, &self.urc_tx, &self.tcp_connected, &self.pdp_activated).await
                    }
                    _ => read_until_final(&mut inner, &line, &self.urc_tx, &self.tcp_connected, &self.pdp_activated).await,
                }
            })
            .await
            .map_err(|_| Error::Timeout)??
        };

        self.apply_command_outcome(&cmd, &exchange);

        if matches!(&cmd, AtCommand::OpenTcpConnection { .. })
            && exchange.status.map(ModemStatus::is_ok).unwrap_or(false)
            && !self.tcp_connected()
        {
            self.await_tcp_connected(timeout_duration).await?;
        }

        Ok(exchange)
    }

    /// Applies the command-outcome state effects spec §4.1 assigns to the
    /// engine: activating the PDP context on a successful `AT+CIICR`,
    /// deactivating it unconditionally on `AT+CIPSHUT` (the modem accepts
    /// the deactivation regardless of prior state), and clearing
    /// TCP-connected on a successful `AT+CIPCLOSE`. `AT+CIPSTART`'s own
    /// success effect is handled separately, since `CONNECT OK` is the real
    /// signal rather than the command's own final status.
    fn apply_command_outcome(&self, cmd: &AtCommand, exchange: &Exchange) {
        let ok = exchange.status.map(ModemStatus::is_ok).unwrap_or(false);
        match cmd {
            AtCommand::ActivateDataConnection if ok => {
                self.pdp_activated.store(true, Ordering::Release);
            }
            AtCommand::DeactivateDataConnection => {
                self.pdp_activated.store(false, Ordering::Release);
            }
            AtCommand::CloseTcpConnection if ok => {
                self.tcp_connected.store(false, Ordering::Release);
            }
            _ => {}
        }
    }

    /// Keeps reading lines past `AT+CIPSTART`'s own accepted status until
    /// the `CONNECT OK` URC sets `tcp_connected`, bounded by the same
    /// timeout budget as the command itself.
    async fn await_tcp_connected(&self, timeout_duration: Duration) -> Result<()> {
        let mut inner = self.inner.lock().await;
        timeout(timeout_duration, async {
            while !self.tcp_connected.load(Ordering::Acquire) {
                if let Some(line) = inner.reader.next_line() {
                    if let Some(urc) = Urc::parse(&line) {
                        apply_urc_effects(&urc, &self.tcp_connected, &self.pdp_activated);
                        let _ = self.urc_tx.try_send(urc);
                    }
                    continue;
                }
                fill_buffer(&mut inner).await?;
            }
            Ok(())
        })
        .await
        .map_err(|_| Error::Timeout)?
    }

    pub async fn reset_line_buffer(&self) {
        self.inner.lock().await.reader = LineReader::new();
    }
}

/// Applies the state effects a URC carries regardless of which command (if
/// any) is in flight when it arrives, matching spec §4.1's "State effects of
/// commands" table.
fn apply_urc_effects(urc: &Urc, tcp_connected: &AtomicBool, pdp_activated: &AtomicBool) {
    match urc {
        Urc::TcpConnected => tcp_connected.store(true, Ordering::Release),
        Urc::TcpClosed => tcp_connected.store(false, Ordering::Release),
        Urc::PdpDeactivated => pdp_activated.store(false, Ordering::Release),
        _ => {}
    }
}

async fn fill_buffer<T: ModemTransport>(inner: &mut Inner<T>) -> Result<()> {
    let mut chunk = [0u8; 256];
    let n = inner.transport.read(&mut chunk).await?;
    if n == 0 {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "modem transport closed",
        )));
    }
    inner.reader.feed(&chunk[..n]);
    Ok(())
}

async fn wait_for_echo<T: ModemTransport>(inner: &mut Inner<T>, sent: &str) -> Result<()> {
    loop {
        if let Some(line) = inner.reader.next_line() {
            if line == sent {
                return Ok(());
            }
            debug!("discarding stray line before echo: {line}");
            continue;
        }
        fill_buffer(inner).await?;
    }
}

async fn wait_for_prompt<T: ModemTransport>(inner: &mut Inner<T>) -> Result<()> {
    loop {
        if inner.reader.take_prompt() {
            return Ok(());
        }
        fill_buffer(inner).await?;
    }
}

async fn read_until_final<T: ModemTransport>(
    inner: &mut Inner<T>,
    sent: &str,
    urc_tx: &mpsc::Sender<Urc>,
    tcp_connected: &AtomicBool,
    pdp_activated: &AtomicBool,
) -> Result<Exchange> {
    let mut exchange = Exchange::default();
    loop {
        if let Some(line) = inner.reader.next_line() {
            match classify(&line, sent) {
                Line::Echo(_) => {}
                Line::Urc(urc) => {
                    apply_urc_effects(&urc, tcp_connected, pdp_activated);
                    let _ = urc_tx.try_send(urc);
                }
                Line::Final(status) => {
                    exchange.status = Some(status);
                    return Ok(exchange);
                }
                Line::Data(data) => exchange.lines.push(data),
            }
            continue;
        }
        fill_buffer(inner).await?;
    }
}

/// Reads a `+CIPRXGET: 2,<n>` binary reply: a header line announcing the
/// byte count, then exactly that many raw bytes (which may themselves
/// contain `\r\n`, so they cannot be read through the line reader), then the
/// trailing result line.
async fn read_tcp_binary<T: ModemTransport>(
    inner: &mut Inner<T>,
    requested: usize,
    urc_tx: &mpsc::Sender<Urc>,
    tcp_connected: &AtomicBool,
    pdp_activated: &AtomicBool,
) -> Result<Exchange> {
    if requested > MAX_TCP_CHUNK {
        warn!("tcp read of {requested} bytes exceeds max chunk {MAX_TCP_CHUNK}");
    }

    let mut exchange = Exchange::default();
    let announced_len = loop {
        if let Some(line) = inner.reader.next_line() {
            match classify(&line, "") {
                Line::Urc(urc) => {
                    apply_urc_effects(&urc, tcp_connected, pdp_activated);
                    let _ = urc_tx.try_send(urc);
                    continue;
                }
                Line::Final(status) => {
                    exchange.status = Some(status);
                    return Ok(exchange);
                }
                _ => {}
            }
            if let Some(rest) = line.strip_prefix("+CIPRXGET: 2,") {
                let len: usize = rest
                    .split(',')
                    .next()
                    .unwrap_or("0")
                    .trim()
                    .parse()
                    .map_err(|_| Error::UnexpectedResponse(line.clone()))?;
                break len;
            }
            continue;
        }
        fill_buffer(inner).await?;
    };

    while inner.reader_len() < announced_len {
        fill_buffer(inner).await?;
    }
    exchange.binary = inner.reader.take_bytes(announced_len);

    loop {
        if let Some(line) = inner.reader.next_line() {
            if let Line::Final(status) = classify(&line, "") {
                exchange.status = Some(status);
                return Ok(exchange);
            }
        } else {
            fill_buffer(inner).await?;
        }
    }
}

impl<T: ModemTransport> Inner<T> {
    fn reader_len(&self) -> usize {
        self.reader.buffered_len()
    }
}
