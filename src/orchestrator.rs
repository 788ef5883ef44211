//! Top-level tick scheduler (C10): a 25 ms tick driving the modem engine's
//! URC drain and the NMEA transmit scheduler (matching
//! `MODEM_SERVER_LOOP_PERIOD_MS`), a 1 s tick decaying the GMT clock and
//! re-evaluating the transmit-enable decision table, and an 8 s tick running
//! the WMM/pressure refresh. Three independent `tokio::time::interval`s
//! rather than one fine-grained loop, so a slow WMM recomputation never
//! delays NMEA output. The MQTT publish cadence is not one of these ticks —
//! it runs on its own loop sourced from the configured reporting interval,
//! since it has nothing to do with any fixed schedule here.

use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::sync::Mutex;
use tokio::time::interval;

use crate::boatdata::{is_fresh, windows, BoatData};
use crate::nmea::{MessageType, NmeaScheduler};
use crate::timebase::now_ms;

pub const FAST_TICK: Duration = Duration::from_millis(25);
pub const CLOCK_TICK: Duration = Duration::from_secs(1);
pub const WMM_TICK: Duration = Duration::from_secs(8);

/// Output port NMEA transmissions go out on. The firmware wires several
/// serial ports; this gateway has one configured talker port.
pub const TRANSMIT_PORT: u8 = 0;

/// Nominal period for every transmit-enabled sentence before the
/// scheduler's own rate adaptation narrows or widens it. Not given by the
/// source firmware's NMEA rate tables (those only describe the
/// speed-up/slow-down permil factors, not a per-sentence nominal period);
/// chosen as a reasonable 1 Hz default for a deployment that hasn't tuned
/// it otherwise.
pub const DEFAULT_TRANSMIT_PERIOD_MS: u32 = 1_000;

/// Callbacks the orchestrator drives on each tick. Kept as boxed async
/// closures rather than a trait so [`Gateway`](crate::gateway::Gateway) can
/// assemble them from its already-constructed subsystems without a new
/// type per callback.
pub struct Orchestrator {
    boat_data: Arc<BoatData>,
    nmea_scheduler: Arc<Mutex<NmeaScheduler>>,
    transmit_enable: Mutex<TransmitEnableTable>,
}

impl Orchestrator {
    pub fn new(boat_data: Arc<BoatData>, nmea_scheduler: Arc<Mutex<NmeaScheduler>>) -> Self {
        Orchestrator {
            boat_data,
            nmea_scheduler,
            transmit_enable: Mutex::new(TransmitEnableTable::new()),
        }
    }

    /// Runs forever: `on_fast_tick` gets the slots currently due to
    /// transmit, `on_clock_tick` runs once a second alongside the GMT decay
    /// and the transmit-enable table's re-evaluation against current boat
    /// data, and `on_wmm_tick` runs every 8 s. Each callback gets its own
    /// error handling; a callback failure is logged and does not stop the
    /// loop (matching the firmware's tasks, which never exit on a single
    /// failed cycle).
    pub async fn run<F, C, W>(&self, mut on_fast_tick: F, mut on_clock_tick: C, mut on_wmm_tick: W)
    where
        F: FnMut(Vec<crate::nmea::TransmitSlot>),
        C: FnMut(),
        W: FnMut() -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>,
    {
        let mut fast = interval(FAST_TICK);
        let mut clock = interval(CLOCK_TICK);
        let mut wmm = interval(WMM_TICK);

        loop {
            tokio::select! {
                _ = fast.tick() => {
                    let t_ms = now_ms();
                    let due = self.nmea_scheduler.lock().await.due(t_ms);
                    if !due.is_empty() {
                        debug!("{} nmea slot(s) due", due.len());
                    }
                    on_fast_tick(due);
                }
                _ = clock.tick() => {
                    let t_ms = now_ms();
                    self.boat_data.decay_gmt_one_second(t_ms);
                    self.evaluate_transmit_enablement(t_ms).await;
                    on_clock_tick();
                }
                _ = wmm.tick() => {
                    on_wmm_tick().await;
                }
            }
        }
    }

    /// Re-evaluates which sentences should currently be transmitting,
    /// against whether their underlying boat-data fields are fresh. A
    /// sentence with no fresh source data is disabled rather than sent with
    /// stale or zeroed fields; it's re-enabled the moment its data starts
    /// arriving again.
    async fn evaluate_transmit_enablement(&self, t_ms: i64) {
        let bd = &self.boat_data;
        let w = windows::POSITION_MOTION_WIND_HEADING_MS;

        let position_fresh = bd.latitude_deg.is_fresh(t_ms, w) && bd.longitude_deg.is_fresh(t_ms, w);
        let decision: [(MessageType, bool); 11] = [
            (MessageType::Rmc, position_fresh),
            (MessageType::Dpt, bd.depth_m.is_fresh(t_ms, w)),
            (MessageType::Vhw, bd.boat_speed_kts.is_fresh(t_ms, w) || bd.heading_true_deg.is_fresh(t_ms, w)),
            (MessageType::Mtw, bd.seawater_temperature_c.is_fresh(t_ms, w)),
            (MessageType::Vlw, bd.trip_nm.is_fresh(t_ms, windows::TRIP_LOG_MS) || bd.total_distance_nm.is_fresh(t_ms, windows::TRIP_LOG_MS)),
            (MessageType::Hdt, bd.heading_true_deg.is_fresh(t_ms, w)),
            (MessageType::Hdm, bd.heading_true_deg.is_fresh(t_ms, w) && is_fresh(bd.magnetic_variation_deg.observed_at_ms(), t_ms, windows::WMM_VALIDITY_MS)),
            (MessageType::Mwv, bd.apparent_wind_speed_kts.is_fresh(t_ms, w) || bd.true_wind_speed_kts.is_fresh(t_ms, w)),
            (MessageType::Mwd, bd.wind_direction_true_deg.is_fresh(t_ms, w) || bd.wind_direction_magnetic_deg.is_fresh(t_ms, w)),
            (MessageType::Xdr, bd.pressure_hpa.is_fresh(t_ms, windows::PRESSURE_MS)),
            (MessageType::Mda, bd.pressure_hpa.is_fresh(t_ms, windows::PRESSURE_MS)),
        ];

        let mut table = self.transmit_enable.lock().await;
        let mut scheduler = self.nmea_scheduler.lock().await;
        for (message_type, should_enable) in decision {
            let was_enabled = table.is_enabled(message_type, TRANSMIT_PORT);
            if should_enable && !was_enabled {
                table.enable(message_type, TRANSMIT_PORT);
                scheduler.enable(message_type, TRANSMIT_PORT, DEFAULT_TRANSMIT_PERIOD_MS, t_ms);
            } else if !should_enable && was_enabled {
                table.disable(message_type, TRANSMIT_PORT);
                scheduler.disable(message_type, TRANSMIT_PORT);
            }
        }
    }
}

/// Tracks whether each of a small set of named subsystems is currently
/// enabled for transmit, the Rust analogue of the firmware's per-message
/// enable/disable calls driven by which instruments are actually wired up.
#[derive(Debug, Default)]
pub struct TransmitEnableTable {
    enabled: std::collections::HashSet<(crate::nmea::MessageType, u8)>,
}

impl TransmitEnableTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(&mut self, message_type: crate::nmea::MessageType, port: u8) {
        self.enabled.insert((message_type, port));
    }

    pub fn disable(&mut self, message_type: crate::nmea::MessageType, port: u8) {
        self.enabled.remove(&(message_type, port));
    }

    pub fn is_enabled(&self, message_type: crate::nmea::MessageType, port: u8) -> bool {
        self.enabled.contains(&(message_type, port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nmea::MessageType;

    #[test]
    fn transmit_enable_table_tracks_per_port_state() {
        let mut table = TransmitEnableTable::new();
        assert!(!table.is_enabled(MessageType::Gga, 0));
        table.enable(MessageType::Gga, 0);
        assert!(table.is_enabled(MessageType::Gga, 0));
        assert!(!table.is_enabled(MessageType::Gga, 1));
        table.disable(MessageType::Gga, 0);
        assert!(!table.is_enabled(MessageType::Gga, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn fast_tick_fires_before_wmm_tick() {
        let boat_data = Arc::new(BoatData::new());
        let scheduler = Arc::new(Mutex::new(NmeaScheduler::new()));
        let orchestrator = Orchestrator::new(boat_data, scheduler);

        let fast_count = Arc::new(std::sync::atomic::AtomicU32::new(0));
        let fc = fast_count.clone();

        let run = orchestrator.run(
            move |_due| {
                fc.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            },
            || {},
            || Box::pin(async {}),
        );

        let _ = tokio::time::timeout(Duration::from_millis(100), run).await;
        assert!(fast_count.load(std::sync::atomic::Ordering::Relaxed) > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn transmit_enablement_tracks_fresh_depth_data() {
        let boat_data = Arc::new(BoatData::new());
        let scheduler = Arc::new(Mutex::new(NmeaScheduler::new()));
        let orchestrator = Orchestrator::new(boat_data.clone(), scheduler.clone());

        orchestrator.evaluate_transmit_enablement(1_000).await;
        assert!(scheduler.lock().await.due(1_000).is_empty());

        boat_data.depth_m.set(12.0, 1_000);
        orchestrator.evaluate_transmit_enablement(1_000).await;
        let due = scheduler.lock().await.due(1_000);
        assert!(due.iter().any(|s| s.message_type == MessageType::Dpt));
    }
}
