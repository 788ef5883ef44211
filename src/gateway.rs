//! Top-level wiring: assembles the modem engine, the MQTT client (riding on
//! top of the modem's TCP commands), the NMEA scheduler, the boat-data
//! snapshot and the publisher behind one [`Orchestrator`], and exposes a
//! single `run` entry point. The shape mirrors the upstream client's
//! `Client<C, CLK, N>`: one struct gathering every collaborator the rest of
//! the crate only sees through traits.

use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use tokio::sync::Mutex;

use crate::boatdata::{is_fresh, windows, BoatData};
use crate::collaborators::{MagneticModel, PressureSensor, SmsCodec, StatusLed};
use crate::config::GatewayConfig;
use crate::error::{Error, Result};
use crate::modem::command::{AtCommand, ModemStatus};
use crate::modem::engine::ModemEngine;
use crate::modem::MAX_TCP_CHUNK;
use crate::mqtt::client::{MqttClient, MqttEvent, MqttTransport};
use crate::mqtt::MqttError;
use crate::nmea::NmeaScheduler;
use crate::orchestrator::Orchestrator;
use crate::publisher::Publisher;
use crate::serial::ModemTransport;
use crate::settings::SettingsStore;
use crate::timebase::now_ms;

/// Fixed MQTT CONNECT parameters (spec §4.5): the client id is not
/// configurable, the keepalive is ten minutes, and a publish period past
/// five minutes closes the session between publishes rather than holding it
/// open idle.
const MQTT_CLIENT_ID: &str = "1234";
const MQTT_KEEPALIVE_S: u16 = 600;
const MQTT_IDLE_CLOSE_THRESHOLD_S: u32 = 300;

/// Adapts the modem engine's `AT+CIPSEND`/`AT+CIPRXGET` command pair to the
/// MQTT client's byte-oriented transport trait, so `MqttClient` never knows
/// it is riding over AT commands rather than a raw socket.
pub struct ModemMqttTransport<T: ModemTransport> {
    engine: Arc<ModemEngine<T>>,
    timeout: Duration,
}

impl<T: ModemTransport> ModemMqttTransport<T> {
    pub fn new(engine: Arc<ModemEngine<T>>, timeout: Duration) -> Self {
        ModemMqttTransport { engine, timeout }
    }
}

impl<T: ModemTransport> MqttTransport for ModemMqttTransport<T> {
    async fn send(&mut self, data: &[u8]) -> std::result::Result<(), MqttError> {
        for chunk in data.chunks(MAX_TCP_CHUNK) {
            let exchange = self
                .engine
                .command(AtCommand::TcpWrite { len: chunk.len() }, Some(chunk), self.timeout)
                .await
                .map_err(|e| MqttError::Protocol(e.to_string()))?;
            match exchange.status {
                Some(status) if status.is_ok() => {}
                other => {
                    return Err(MqttError::Protocol(format!("tcp write failed: {other:?}")));
                }
            }
        }
        Ok(())
    }

    async fn poll(&mut self) -> std::result::Result<Vec<u8>, MqttError> {
        let waiting = self
            .engine
            .command(AtCommand::GetTcpReadDataWaitingLength, None, self.timeout)
            .await
            .map_err(|e| MqttError::Protocol(e.to_string()))?;

        let available: usize = waiting
            .lines
            .first()
            .and_then(|l| l.strip_prefix("+CIPRXGET: 1,"))
            .and_then(|n| n.trim().parse().ok())
            .unwrap_or(0);

        if available == 0 {
            return Ok(Vec::new());
        }

        let want = available.min(MAX_TCP_CHUNK);
        let exchange = self
            .engine
            .command(AtCommand::TcpRead { len: want }, None, self.timeout)
            .await
            .map_err(|e| MqttError::Protocol(e.to_string()))?;
        Ok(exchange.binary)
    }
}

/// Every hardware collaborator this gateway can be built with, each
/// optional so a deployment missing a sensor still runs with its readings
/// simply never refreshed.
#[derive(Default)]
pub struct Collaborators {
    pub magnetic_model: Option<Arc<dyn MagneticModel>>,
    pub pressure_sensor: Option<Arc<dyn PressureSensor>>,
    pub status_led: Option<Arc<dyn StatusLed>>,
    pub sms_codec: Option<Arc<dyn SmsCodec>>,
}

pub struct Gateway<T: ModemTransport> {
    config: GatewayConfig,
    boat_data: Arc<BoatData>,
    modem: Arc<ModemEngine<T>>,
    mqtt: Mutex<MqttClient<ModemMqttTransport<T>>>,
    nmea_scheduler: Arc<Mutex<NmeaScheduler>>,
    publisher: Arc<Publisher>,
    collaborators: Collaborators,
    hashed_imei: u32,
}

impl<T: ModemTransport> Gateway<T> {
    pub fn new(
        config: GatewayConfig,
        transport: T,
        settings: Arc<dyn SettingsStore>,
        hashed_imei: u32,
        collaborators: Collaborators,
    ) -> (Self, tokio::sync::mpsc::Receiver<crate::modem::urc::Urc>) {
        let (engine, urc_rx) = ModemEngine::new(transport, 32);
        let engine = Arc::new(engine);
        let boat_data = Arc::new(BoatData::new());
        let mqtt_transport = ModemMqttTransport::new(engine.clone(), config.command_timeout);
        let mqtt = Mutex::new(MqttClient::new(mqtt_transport));
        let publisher = Arc::new(Publisher::new(boat_data.clone(), settings, hashed_imei));

        (
            Gateway {
                config,
                boat_data,
                modem: engine,
                mqtt,
                nmea_scheduler: Arc::new(Mutex::new(NmeaScheduler::new())),
                publisher,
                collaborators,
                hashed_imei,
            },
            urc_rx,
        )
    }

    pub fn boat_data(&self) -> &Arc<BoatData> {
        &self.boat_data
    }

    /// Brings the modem up: checks registration, activates the PDP context
    /// with the configured APN, opens the TCP socket to the broker, and
    /// completes the MQTT handshake. Grounded on `modem.c`'s bring-up
    /// sequence (`AT+CGATT` / `AT+CSTT` / `AT+CIICR` / `AT+CIPSTART`) and
    /// `main.c`'s call into `MqttConnect` once the socket is open.
    pub async fn connect(&self) -> Result<()> {
        self.modem.command(AtCommand::Hello, None, self.config.command_timeout).await?;
        self.ensure_tcp_and_mqtt().await?;
        info!("connected to broker {}:{}", self.config.broker_host, self.config.broker_port);
        Ok(())
    }

    /// Activates the PDP context with the configured APN if it isn't
    /// already up. Idempotent, so both initial bring-up and a later
    /// reconnect after an idle-close can call it unconditionally.
    async fn ensure_data_connection(&self) -> Result<()> {
        if self.modem.pdp_activated() {
            return Ok(());
        }
        let timeout = self.config.command_timeout;
        self.modem
            .command(
                AtCommand::ConfigureDataConnection {
                    apn: self.config.apn.name.clone(),
                    username: self.config.apn.username.clone().unwrap_or_default(),
                    password: self.config.apn.password.clone().unwrap_or_default(),
                },
                None,
                timeout,
            )
            .await?;
        self.modem.command(AtCommand::ActivateDataConnection, None, timeout).await?;
        Ok(())
    }

    /// Opens the TCP socket to the broker (if not already open) and
    /// completes the MQTT CONNECT handshake with the fixed client id and
    /// keepalive spec §4.5 mandates.
    async fn ensure_tcp_and_mqtt(&self) -> Result<()> {
        self.ensure_data_connection().await?;

        if !self.modem.tcp_connected() {
            let timeout = self.config.command_timeout;
            self.modem
                .command(
                    AtCommand::OpenTcpConnection {
                        host: self.config.broker_host.clone(),
                        port: self.config.broker_port,
                    },
                    None,
                    timeout,
                )
                .await?;
        }

        self.mqtt
            .lock()
            .await
            .connect(MQTT_CLIENT_ID, None, None, MQTT_KEEPALIVE_S)
            .await
            .map_err(Error::from)?;
        Ok(())
    }

    /// Closes the MQTT session and the underlying TCP socket, for the
    /// idle-close behavior between publishes when the reporting period is
    /// long (spec §4.5).
    async fn close_idle_mqtt(&self) -> Result<()> {
        self.mqtt.lock().await.disconnect().await.map_err(Error::from)?;
        self.modem
            .command(AtCommand::CloseTcpConnection, None, self.config.command_timeout)
            .await?;
        Ok(())
    }

    /// Composes and publishes one telemetry frame, querying signal strength
    /// fresh from the modem since `BoatData` has no slot for it.
    async fn publish_cycle(&self, period_s: u32) {
        let timeout = self.config.command_timeout;
        let signal_strength = match self.modem.command(AtCommand::SignalStrength, None, timeout).await {
            Ok(exchange) => exchange
                .lines
                .first()
                .and_then(|l| l.strip_prefix("+CSQ: "))
                .and_then(|l| l.split(',').next())
                .and_then(|v| v.trim().parse::<u8>().ok())
                .unwrap_or(99),
            Err(e) => {
                warn!("signal strength query failed: {e}");
                99
            }
        };

        let frame = self.publisher.compose_frame(signal_strength, now_ms(), period_s);
        let topic = self.publisher.topic();

        let ok = self
            .mqtt
            .lock()
            .await
            .publish(&topic, frame.as_bytes(), false)
            .await
            .is_ok();

        if self.publisher.note_publish_result(ok) {
            error!("publish failures exceeded threshold, restart required");
        } else if ok {
            if let Some(led) = &self.collaborators.status_led {
                led.flash(50);
            }
        }
    }

    /// Standalone publish loop, sourced from the publisher's own reporting
    /// interval rather than a fixed orchestrator tick (spec §4.5/§4.6): the
    /// period is whatever `PERIOD=...` last set it to, and publishing is
    /// skipped entirely while `START`/`STOP` has it disabled.
    async fn publish_loop(self: Arc<Self>) {
        loop {
            let period_s = self.publisher.reporting_interval_secs().max(1);

            if self.publisher.is_publishing_enabled() {
                let idle_close = period_s > MQTT_IDLE_CLOSE_THRESHOLD_S;
                if idle_close {
                    if let Err(e) = self.ensure_tcp_and_mqtt().await {
                        warn!("failed to reopen mqtt before publish: {e}");
                    }
                }

                self.publish_cycle(period_s).await;

                if idle_close {
                    if let Err(e) = self.close_idle_mqtt().await {
                        warn!("failed to close idle mqtt session: {e}");
                    }
                }
            }

            tokio::time::sleep(Duration::from_secs(period_s as u64)).await;
        }
    }

    async fn drain_mqtt_events(&self) {
        match self.mqtt.lock().await.poll().await {
            Ok(events) => {
                for event in events {
                    if let MqttEvent::Published { topic, payload } = event {
                        info!("mqtt message on {topic}: {} bytes", payload.len());
                    }
                }
            }
            Err(e) => warn!("mqtt poll failed: {e}"),
        }
    }

    /// Drains one pressure sample into the snapshot and, if the WMM
    /// calculation is stale and position and date are both fresh, recomputes
    /// magnetic variation (spec §4.6, 8 s tick).
    async fn wmm_tick(&self) {
        if let Some(pressure_sensor) = &self.collaborators.pressure_sensor {
            match pressure_sensor.read_hpa().await {
                Ok(hpa) => {
                    // TODO: also emit the CAN-side environmental PGN once an
                    // outbound N2K collaborator exists; only inbound
                    // `N2kBus::recv_frame` is defined today.
                    self.boat_data.pressure_hpa.set(hpa, now_ms());
                }
                Err(e) => warn!("pressure sensor read failed: {e}"),
            }
        }

        let Some(model) = &self.collaborators.magnetic_model else {
            return;
        };

        let t_ms = now_ms();
        if is_fresh(self.boat_data.wmm_calculated_at_ms(), t_ms, windows::WMM_VALIDITY_MS) {
            return;
        }

        let w = windows::POSITION_MOTION_WIND_HEADING_MS;
        let lat = self.boat_data.latitude_deg.fresh_value(t_ms, w);
        let lon = self.boat_data.longitude_deg.fresh_value(t_ms, w);
        let (_, date_observed_at_ms) = self.boat_data.date();

        let (Some(lat), Some(lon)) = (lat, lon) else {
            return;
        };
        if !is_fresh(date_observed_at_ms, t_ms, windows::DATE_MS) {
            return;
        }

        match model.variation_deg(lat, lon, 0.0) {
            Ok(variation) => {
                self.boat_data.magnetic_variation_deg.set(variation, t_ms);
                self.boat_data.mark_wmm_calculated(t_ms);
            }
            Err(e) => warn!("magnetic variation lookup failed: {e}"),
        }
    }

    /// Handles one `+CMTI` SMS-notification URC end-to-end (C8 phase 3):
    /// fetches the PDU by index, decodes it, records the sender, runs it
    /// through the command handler, sends the reply, clears the inbox, and
    /// restarts the process if the command asked for it (the publisher's
    /// sole recovery action, matching the firmware's `esp_restart()`).
    pub async fn handle_sms_notification(&self, index: u32) {
        let timeout = self.config.command_timeout;

        let exchange = match self.modem.command(AtCommand::SmsReceiveMessage { index }, None, timeout).await {
            Ok(exchange) if exchange.status.map(ModemStatus::is_ok).unwrap_or(false) => exchange,
            Ok(exchange) => {
                warn!("sms fetch {index} returned {:?}", exchange.status);
                return;
            }
            Err(e) => {
                warn!("failed to fetch sms pdu {index}: {e}");
                return;
            }
        };

        let Some(sms_codec) = &self.collaborators.sms_codec else {
            warn!("sms {index} received but no sms codec collaborator is configured");
            return;
        };

        let Some(pdu_line) = exchange.lines.last() else {
            warn!("sms fetch {index} returned no pdu line");
            return;
        };
        let Some(pdu) = hex_decode(pdu_line) else {
            warn!("sms fetch {index} returned a non-hex pdu line");
            return;
        };

        let (sender, body) = match sms_codec.decode_pdu(&pdu) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!("failed to decode sms pdu {index}: {e}");
                return;
            }
        };

        self.publisher.record_sms_sender(&sender);

        let mut reply_text = None;
        let outcome = self.publisher.handle_sms(&body, &mut |reply| reply_text = Some(reply));

        if let Some(reply_text) = reply_text {
            match sms_codec.encode_pdu(&sender, &reply_text) {
                Ok(reply_pdu) => {
                    let pdu_len = reply_pdu.len();
                    let hex = hex_encode(&reply_pdu);
                    if let Err(e) = self
                        .modem
                        .command(AtCommand::SmsSendMessage { pdu_len }, Some(hex.as_bytes()), timeout)
                        .await
                    {
                        warn!("failed to send sms reply to {sender}: {e}");
                    }
                }
                Err(e) => warn!("failed to encode sms reply to {sender}: {e}"),
            }
        }

        if let Err(e) = self.modem.command(AtCommand::SmsDeleteAllMessages, None, timeout).await {
            warn!("failed to delete sms after handling index {index}: {e}");
        }

        if outcome.reset_requested || outcome.restart_requested {
            error!(
                "sms requested a {}, restarting process",
                if outcome.reset_requested { "reset" } else { "restart" }
            );
            std::process::exit(1);
        }
    }

    /// Runs the gateway forever: the [`Orchestrator`]'s fast tick drains MQTT
    /// events and advances the NMEA transmit schedule, its 1 s clock tick
    /// flashes the status LED while publishing is enabled, its 8 s tick
    /// drains the pressure sensor and refreshes magnetic variation. The
    /// telemetry publish cycle runs on its own independent loop, sourced
    /// from the publisher's configured reporting interval rather than any
    /// fixed orchestrator tick.
    pub async fn run(self: Arc<Self>) {
        let orchestrator = Orchestrator::new(self.boat_data.clone(), self.nmea_scheduler.clone());
        let fast_self = self.clone();
        let clock_self = self.clone();
        let wmm_self = self.clone();
        let publish_self = self.clone();

        let orchestrator_loop = orchestrator.run(
            move |_due_slots| {
                let gw = fast_self.clone();
                tokio::spawn(async move {
                    gw.drain_mqtt_events().await;
                });
            },
            move || {
                if clock_self.publisher.is_publishing_enabled() {
                    if let Some(led) = &clock_self.collaborators.status_led {
                        led.flash(20);
                    }
                }
            },
            move || {
                let gw = wmm_self.clone();
                Box::pin(async move {
                    gw.wmm_tick().await;
                })
            },
        );

        tokio::join!(orchestrator_loop, publish_self.publish_loop());
    }

    pub fn hashed_imei(&self) -> u32 {
        self.hashed_imei
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

fn hex_decode(s: &str) -> Option<Vec<u8>> {
    let s = s.trim();
    if s.is_empty() || s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeLed(std::sync::atomic::AtomicU32);

    impl StatusLed for FakeLed {
        fn flash(&self, duration_ms: u32) {
            self.0.store(duration_ms, std::sync::atomic::Ordering::Relaxed);
        }
    }

    #[test]
    fn collaborators_default_to_none() {
        let c = Collaborators::default();
        assert!(c.magnetic_model.is_none());
        assert!(c.pressure_sensor.is_none());
        assert!(c.status_led.is_none());
        assert!(c.sms_codec.is_none());
    }

    #[test]
    fn hex_round_trips() {
        let bytes = vec![0x00, 0x1A, 0xFF, 0x05];
        assert_eq!(hex_decode(&hex_encode(&bytes)).unwrap(), bytes);
    }

    #[test]
    fn hex_decode_rejects_odd_length() {
        assert!(hex_decode("0A1").is_none());
    }
}
