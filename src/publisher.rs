//! Publish lifecycle (C8): brings up the PDP context, opens the MQTT
//! connection, and on each tick composes one CSV telemetry frame and
//! publishes it to `<hashed-imei>/all`, plus the SMS command handler that
//! answers `SETTINGS`/`CODE`/`START`/`STOP`/`RESET`/`RESTART`/`POS`/`DATA`
//! (and the settings-mutating `PERIOD=...`/`APN=...`/etc. property
//! commands).
//!
//! Grounded field-for-field on `publisher.c`'s main loop (signal strength,
//! then COG, temp, SOG, boat speed, log, trip, heading, depth, TWS, TWA,
//! AWS, AWA, latitude, longitude, pressure, period — in that order, each
//! field left empty rather than zero when stale) and its SMS command
//! `if/else` chain.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use log::{info, warn};

use crate::boatdata::{windows, BoatData};
use crate::command_parser::parse_properties;
use crate::settings::{hms_to_seconds, seconds_to_hms, Settings, SettingsStore};

/// After this many consecutive publish failures, the orchestrator should
/// restart the whole gateway rather than keep retrying in place, matching
/// `PUBLISHER_MAX_FAILED_COUNT`'s `esp_restart()`.
pub const MAX_FAILED_PUBLISH_COUNT: u32 = 10;

pub struct Publisher {
    boat_data: Arc<BoatData>,
    settings: Arc<dyn SettingsStore>,
    hashed_imei: u32,
    failed_count: AtomicU32,
    publishing_enabled: AtomicBool,
}

impl Publisher {
    pub fn new(boat_data: Arc<BoatData>, settings: Arc<dyn SettingsStore>, hashed_imei: u32) -> Self {
        Publisher {
            boat_data,
            settings,
            hashed_imei,
            failed_count: AtomicU32::new(0),
            publishing_enabled: AtomicBool::new(true),
        }
    }

    pub fn topic(&self) -> String {
        format!("{:08x}/all", self.hashed_imei)
    }

    /// Whether the publish loop should currently publish, toggled by the
    /// `START`/`STOP` SMS commands.
    pub fn is_publishing_enabled(&self) -> bool {
        self.publishing_enabled.load(Ordering::Relaxed)
    }

    /// Configured reporting interval in whole seconds, for the caller's
    /// standalone publish-loop timer.
    pub fn reporting_interval_secs(&self) -> u32 {
        match self.settings.load() {
            Ok(settings) => settings.reporting_interval.as_secs() as u32,
            Err(e) => {
                warn!("failed to load settings for reporting interval: {e}");
                60
            }
        }
    }

    /// Composes the single comma-separated telemetry frame. `signal_strength`
    /// is folded in by the caller since it comes from the modem's
    /// `AT+CSQ`, not the boat-data snapshot.
    pub fn compose_frame(&self, signal_strength: u8, t_ms: i64, period_s: u32) -> String {
        let bd = &self.boat_data;
        let mut fields: Vec<String> = vec![signal_strength.to_string()];

        fields.push(opt_int(bd.course_over_ground_deg.fresh_value(t_ms, windows::POSITION_MOTION_WIND_HEADING_MS).map(|v| v as f32)));
        fields.push(opt_f32(bd.seawater_temperature_c.fresh_value(t_ms, windows::POSITION_MOTION_WIND_HEADING_MS), 1));
        fields.push(opt_f32(bd.speed_over_ground_kts.fresh_value(t_ms, windows::POSITION_MOTION_WIND_HEADING_MS), 1));
        fields.push(opt_f32(bd.boat_speed_kts.fresh_value(t_ms, windows::POSITION_MOTION_WIND_HEADING_MS), 1));
        fields.push(opt_int(bd.total_distance_nm.fresh_value(t_ms, windows::TRIP_LOG_MS)));
        fields.push(opt_f32(bd.trip_nm.fresh_value(t_ms, windows::TRIP_LOG_MS), 1));
        fields.push(opt_int(bd.heading_true_deg.fresh_value(t_ms, windows::POSITION_MOTION_WIND_HEADING_MS)));
        fields.push(opt_f32(bd.depth_m.fresh_value(t_ms, windows::POSITION_MOTION_WIND_HEADING_MS), 1));
        fields.push(opt_f32(bd.true_wind_speed_kts.fresh_value(t_ms, windows::POSITION_MOTION_WIND_HEADING_MS), 1));
        fields.push(opt_f32(bd.true_wind_angle_deg.fresh_value(t_ms, windows::POSITION_MOTION_WIND_HEADING_MS), 1));
        fields.push(opt_f32(bd.apparent_wind_speed_kts.fresh_value(t_ms, windows::POSITION_MOTION_WIND_HEADING_MS), 1));
        fields.push(opt_f32(bd.apparent_wind_angle_deg.fresh_value(t_ms, windows::POSITION_MOTION_WIND_HEADING_MS), 1));
        fields.push(opt_f32(bd.latitude_deg.fresh_value(t_ms, windows::POSITION_MOTION_WIND_HEADING_MS), 4));
        fields.push(opt_f32(bd.longitude_deg.fresh_value(t_ms, windows::POSITION_MOTION_WIND_HEADING_MS), 4));
        fields.push(opt_f32(bd.pressure_hpa.fresh_value(t_ms, windows::PRESSURE_MS), 1));
        fields.push(period_s.to_string());

        fields.join(",")
    }

    pub fn note_publish_result(&self, ok: bool) -> bool {
        if ok {
            self.failed_count.store(0, Ordering::Relaxed);
            false
        } else {
            let count = self.failed_count.fetch_add(1, Ordering::Relaxed) + 1;
            warn!("publish failed ({count}/{MAX_FAILED_PUBLISH_COUNT})");
            count >= MAX_FAILED_PUBLISH_COUNT
        }
    }

    /// Records the phone number an inbound SMS command arrived from, so a
    /// future `admin_phone_number`-gated feature has somewhere to read it
    /// from. Persisted alongside the rest of `Settings` rather than held in
    /// memory, so it survives a restart.
    pub fn record_sms_sender(&self, phone_number: &str) {
        match self.settings.load() {
            Ok(mut settings) => {
                settings.admin_phone_number = Some(phone_number.to_string());
                if let Err(e) = self.settings.save(&settings) {
                    warn!("failed to persist sms sender: {e}");
                }
            }
            Err(e) => warn!("failed to load settings to record sms sender: {e}"),
        }
    }

    /// Handles one decoded SMS body, replying via `reply` (the caller's
    /// modem/SMS send path) and returning whether a restart was requested.
    pub fn handle_sms(&self, body: &str, reply: &mut dyn FnMut(String)) -> SmsOutcome {
        let mut outcome = SmsOutcome::default();
        let mut settings = match self.settings.load() {
            Ok(s) => s,
            Err(e) => {
                warn!("failed to load settings for sms command: {e}");
                return outcome;
            }
        };

        for (key, value) in parse_properties(body) {
            let value = value.unwrap_or_default();
            match key.as_str() {
                "SETTINGS" => {
                    reply(format!(
                        "APN={}\nUser={}\nPass={}\nBroker={}\nPort={}\nPeriod={}\n{}",
                        settings.apn_name,
                        settings.apn_username,
                        settings.apn_password,
                        settings.broker_host,
                        settings.broker_port,
                        seconds_to_hms(settings.reporting_interval.as_secs() as u32),
                        if self.is_publishing_enabled() { "Started" } else { "Stopped" },
                    ));
                }
                "CODE" => {
                    reply(format!("Code={:08X}", self.hashed_imei));
                }
                "START" => {
                    self.publishing_enabled.store(true, Ordering::Relaxed);
                    outcome.publishing_started = Some(true);
                    reply("Started".into());
                }
                "STOP" => {
                    self.publishing_enabled.store(false, Ordering::Relaxed);
                    outcome.publishing_started = Some(false);
                    reply("Stopped".into());
                }
                "RESET" => {
                    outcome.reset_requested = true;
                    reply("Reset - restarting".into());
                }
                "RESTART" => {
                    outcome.restart_requested = true;
                    reply("Restarting".into());
                }
                "POS" => {
                    reply(self.compose_position_reply());
                }
                "DATA" => {
                    reply(self.compose_data_reply());
                }
                "PERIOD" => {
                    if let Some(seconds) = hms_to_seconds(&value) {
                        if seconds >= 5 {
                            settings.reporting_interval = std::time::Duration::from_secs(seconds as u64);
                            outcome.settings_changed = true;
                        }
                    }
                }
                "APN" => {
                    settings.apn_name = value;
                    outcome.settings_changed = true;
                }
                "USER" => {
                    settings.apn_username = value;
                    outcome.settings_changed = true;
                }
                "PASS" => {
                    settings.apn_password = value;
                    outcome.settings_changed = true;
                }
                "BROKER" => {
                    settings.broker_host = value;
                    outcome.settings_changed = true;
                }
                "PORT" => {
                    if let Ok(port) = value.parse() {
                        settings.broker_port = port;
                        outcome.settings_changed = true;
                    }
                }
                _ => {
                    info!("unrecognized sms property: {key}");
                }
            }
        }

        if outcome.settings_changed {
            if let Err(e) = self.settings.save(&settings) {
                warn!("failed to persist settings after sms command: {e}");
            }
        }

        outcome
    }

    fn compose_position_reply(&self) -> String {
        let t_ms = crate::timebase::now_ms();
        let bd = &self.boat_data;
        match (
            bd.latitude_deg.fresh_value(t_ms, windows::POSITION_MOTION_WIND_HEADING_MS),
            bd.longitude_deg.fresh_value(t_ms, windows::POSITION_MOTION_WIND_HEADING_MS),
        ) {
            (Some(lat), Some(lon)) => format!("maps.google.com/maps?t=k&q=loc:{lat:.8}+{lon:.8}"),
            _ => "Position not available".to_string(),
        }
    }

    fn compose_data_reply(&self) -> String {
        let t_ms = crate::timebase::now_ms();
        let bd = &self.boat_data;
        let w = windows::POSITION_MOTION_WIND_HEADING_MS;
        let mut lines = Vec::new();
        lines.push(labeled(bd.depth_m.fresh_value(t_ms, w), "Depth", "m", 1));
        lines.push(labeled(bd.boat_speed_kts.fresh_value(t_ms, w), "Boatspeed", "kt", 1));
        lines.push(labeled_int(bd.heading_true_deg.fresh_value(t_ms, w), "Heading", "T"));
        lines.push(labeled(bd.trip_nm.fresh_value(t_ms, windows::TRIP_LOG_MS), "Trip", "Nm", 1));
        lines.push(labeled_int(bd.total_distance_nm.fresh_value(t_ms, windows::TRIP_LOG_MS), "Log", "Nm"));
        lines.push(labeled(bd.speed_over_ground_kts.fresh_value(t_ms, w), "SOG", "kt", 1));
        lines.push(labeled_int(
            bd.course_over_ground_deg.fresh_value(t_ms, w).map(|v| v as f32),
            "COG",
            "T",
        ));
        lines.push(labeled(bd.seawater_temperature_c.fresh_value(t_ms, w), "Temp", "C", 1));
        lines.push(labeled(bd.true_wind_speed_kts.fresh_value(t_ms, w), "TWS", "kt", 1));
        lines.push(labeled_no_unit(bd.true_wind_angle_deg.fresh_value(t_ms, w), "TWA", 1));
        lines.push(labeled(bd.apparent_wind_speed_kts.fresh_value(t_ms, w), "AWS", "kt", 1));
        lines.push(labeled_no_unit(bd.apparent_wind_angle_deg.fresh_value(t_ms, w), "AWA", 1));
        lines.join("\n")
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct SmsOutcome {
    pub publishing_started: Option<bool>,
    pub reset_requested: bool,
    pub restart_requested: bool,
    pub settings_changed: bool,
}

fn opt_f32(value: Option<f32>, decimals: usize) -> String {
    value.map(|v| format!("{v:.decimals$}")).unwrap_or_default()
}

fn opt_int(value: Option<f32>) -> String {
    value.map(|v| format!("{}", v as i64)).unwrap_or_default()
}

fn labeled(value: Option<f32>, label: &str, unit: &str, decimals: usize) -> String {
    match value {
        Some(v) => format!("{label}={v:.decimals$} {unit}", decimals = decimals),
        None => format!("{label}=?"),
    }
}

fn labeled_no_unit(value: Option<f32>, label: &str, decimals: usize) -> String {
    match value {
        Some(v) => format!("{label}={v:.decimals$}", decimals = decimals),
        None => format!("{label}=?"),
    }
}

fn labeled_int(value: Option<f32>, label: &str, unit: &str) -> String {
    match value {
        Some(v) => format!("{label}={} {unit}", v as i64),
        None => format!("{label}=?"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FakeStore(Mutex<Settings>);

    impl SettingsStore for FakeStore {
        fn load(&self) -> crate::error::Result<Settings> {
            Ok(self.0.lock().unwrap().clone())
        }
        fn save(&self, settings: &Settings) -> crate::error::Result<()> {
            *self.0.lock().unwrap() = settings.clone();
            Ok(())
        }
    }

    fn publisher() -> Publisher {
        Publisher::new(
            Arc::new(BoatData::new()),
            Arc::new(FakeStore(Mutex::new(Settings::default()))),
            0xDEADBEEF,
        )
    }

    #[test]
    fn composes_frame_with_empty_fields_for_stale_data() {
        let p = publisher();
        p.boat_data.depth_m.set(12.3, 1_000);
        let frame = p.compose_frame(22, 1_500, 60);
        // signal,cog,temp,sog,boatspeed,log,trip,heading,depth,tws,twa,aws,awa,lat,lon,pressure,period
        let parts: Vec<&str> = frame.split(',').collect();
        assert_eq!(parts.len(), 17);
        assert_eq!(parts[0], "22");
        assert_eq!(parts[8], "12.3");
        assert_eq!(parts[1], "");
        assert_eq!(parts.last().unwrap(), &"60");
    }

    #[test]
    fn start_stop_commands_report_outcome_and_reply() {
        let p = publisher();
        let mut replies = Vec::new();
        let outcome = p.handle_sms("START", &mut |s| replies.push(s));
        assert_eq!(outcome.publishing_started, Some(true));
        assert_eq!(replies, vec!["Started".to_string()]);
        assert!(p.is_publishing_enabled());

        let outcome = p.handle_sms("STOP", &mut |s| replies.push(s));
        assert_eq!(outcome.publishing_started, Some(false));
        assert!(!p.is_publishing_enabled());
    }

    #[test]
    fn topic_uses_lowercase_hex() {
        let p = publisher();
        assert_eq!(p.topic(), "deadbeef/all");
    }

    #[test]
    fn user_pass_commands_update_settings() {
        let p = publisher();
        let mut replies = Vec::new();
        let outcome = p.handle_sms("USER=alice\r\nPASS=secret", &mut |s| replies.push(s));
        assert!(outcome.settings_changed);
        let settings = p.settings.load().unwrap();
        assert_eq!(settings.apn_username, "alice");
        assert_eq!(settings.apn_password, "secret");
    }

    #[test]
    fn settings_reply_includes_user_pass_and_state() {
        let p = publisher();
        let mut replies = Vec::new();
        p.handle_sms("SETTINGS", &mut |s| replies.push(s));
        let reply = &replies[0];
        assert!(reply.contains("User="));
        assert!(reply.contains("Pass="));
        assert!(reply.ends_with("Started"));
    }

    #[test]
    fn period_command_rejects_too_short_interval() {
        let p = publisher();
        let mut replies = Vec::new();
        let outcome = p.handle_sms("PERIOD=2s", &mut |s| replies.push(s));
        assert!(!outcome.settings_changed);
    }

    #[test]
    fn period_command_accepts_valid_interval() {
        let p = publisher();
        let mut replies = Vec::new();
        let outcome = p.handle_sms("PERIOD=1m", &mut |s| replies.push(s));
        assert!(outcome.settings_changed);
        assert_eq!(p.settings.load().unwrap().reporting_interval.as_secs(), 60);
    }

    #[test]
    fn position_reply_falls_back_when_stale() {
        let p = publisher();
        let mut replies = Vec::new();
        p.handle_sms("POS", &mut |s| replies.push(s));
        assert_eq!(replies, vec!["Position not available".to_string()]);
    }

    #[test]
    fn failed_publish_count_triggers_restart_at_threshold() {
        let p = publisher();
        for _ in 0..MAX_FAILED_PUBLISH_COUNT - 1 {
            assert!(!p.note_publish_result(false));
        }
        assert!(p.note_publish_result(false));
    }
}
